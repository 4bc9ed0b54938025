use serde::{Deserialize, Serialize};

/// Identifier some front ends attach to unauthenticated requests.
pub const ANONYMOUS_ID: &str = "anonymous";

/// The identity associated with a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_ID)
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty() || self.id == ANONYMOUS_ID
    }
}

/// Per-call request metadata passed explicitly through the middleware chain.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    method: Option<String>,
    remote_addr: Option<String>,
    headers: Vec<(String, String)>,
    principal: Option<Principal>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let ctx = CallContext::new()
            .with_header("X-Forwarded-For", "203.0.113.5")
            .with_header("x-forwarded-for", "10.0.0.1");
        assert_eq!(ctx.header("x-forwarded-for"), Some("203.0.113.5"));
        assert_eq!(ctx.header("X-FORWARDED-FOR"), Some("203.0.113.5"));
        assert_eq!(ctx.header("proxy-client-ip"), None);
    }

    #[test]
    fn anonymous_sentinel() {
        assert!(Principal::anonymous().is_anonymous());
        assert!(Principal::new("").is_anonymous());
        assert!(!Principal::new("p1").is_anonymous());
    }
}
