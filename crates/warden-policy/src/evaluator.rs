// ============================================================================
// FILE: crates/warden-policy/src/evaluator.rs
// Authorization evaluator - pure function over granted sets and a descriptor
// ============================================================================

//! Policy evaluation.
//!
//! # Order of checks
//!
//! 1. Unauthenticated callers are denied before any set is looked at.
//! 2. Roles (only when the descriptor names roles):
//!    - ALL: first absent role in declaration order is reported, remaining
//!      roles are not probed.
//!    - ANY: first present role passes the dimension; none present reports
//!      `MissingRole(None)`.
//! 3. Permissions, same rules, only reached when the role dimension passed.
//! 4. Otherwise `Ok`.
//!
//! The evaluator takes no locks and performs no I/O.

use crate::authorities::Authorities;
use crate::decision::{Decision, DecisionReason};
use crate::descriptor::PolicyDescriptor;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Roles,
    Permissions,
}

/// A single membership test performed during evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub dimension: Dimension,
    pub code: String,
    pub granted: bool,
}

/// Record of the membership tests an evaluation performed, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationTrace {
    pub probes: Vec<Probe>,
}

impl EvaluationTrace {
    pub fn evaluated(&self, dimension: Dimension) -> bool {
        self.probes.iter().any(|p| p.dimension == dimension)
    }

    pub fn probe_count(&self, dimension: Dimension) -> usize {
        self.probes
            .iter()
            .filter(|p| p.dimension == dimension)
            .count()
    }
}

/// Evaluates `policy` against the granted sets.
pub fn evaluate(
    granted_roles: &BTreeSet<String>,
    granted_permissions: &BTreeSet<String>,
    policy: &PolicyDescriptor,
    authenticated: bool,
) -> Decision {
    evaluate_traced(granted_roles, granted_permissions, policy, authenticated).0
}

/// `None` means the caller is not authenticated.
pub fn evaluate_authorities(authorities: Option<&Authorities>, policy: &PolicyDescriptor) -> Decision {
    match authorities {
        Some(a) => evaluate(&a.roles, &a.permissions, policy, true),
        None => Decision::deny(DecisionReason::Unauthenticated),
    }
}

/// Like [`evaluate`], also returning the probes performed.
pub fn evaluate_traced(
    granted_roles: &BTreeSet<String>,
    granted_permissions: &BTreeSet<String>,
    policy: &PolicyDescriptor,
    authenticated: bool,
) -> (Decision, EvaluationTrace) {
    let mut trace = EvaluationTrace::default();

    if !authenticated {
        return (Decision::deny(DecisionReason::Unauthenticated), trace);
    }

    if let Err(missing) = check_dimension(
        Dimension::Roles,
        policy.required_roles(),
        granted_roles,
        policy.require_all_roles(),
        &mut trace,
    ) {
        return (Decision::deny(DecisionReason::MissingRole(missing)), trace);
    }

    if let Err(missing) = check_dimension(
        Dimension::Permissions,
        policy.required_permissions(),
        granted_permissions,
        policy.require_all_permissions(),
        &mut trace,
    ) {
        return (
            Decision::deny(DecisionReason::MissingPermission(missing)),
            trace,
        );
    }

    (Decision::allow(), trace)
}

/// `Err(Some(code))` under ALL, `Err(None)` under ANY.
fn check_dimension(
    dimension: Dimension,
    required: &[String],
    granted: &BTreeSet<String>,
    require_all: bool,
    trace: &mut EvaluationTrace,
) -> Result<(), Option<String>> {
    if required.is_empty() {
        return Ok(());
    }

    let mut probe = |code: &String| {
        let granted = granted.contains(code);
        trace.probes.push(Probe {
            dimension,
            code: code.clone(),
            granted,
        });
        granted
    };

    if require_all {
        for code in required {
            if !probe(code) {
                return Err(Some(code.clone()));
            }
        }
        Ok(())
    } else if required.iter().any(probe) {
        Ok(())
    } else {
        Err(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unauthenticated_denied_before_any_probe() {
        let policy = PolicyDescriptor::builder()
            .all_roles(["admin"])
            .build()
            .unwrap();
        let (decision, trace) = evaluate_traced(&set(&["admin"]), &set(&[]), &policy, false);
        assert_eq!(decision.reason, DecisionReason::Unauthenticated);
        assert!(trace.probes.is_empty());
    }

    #[test]
    fn all_roles_reports_first_missing() {
        let policy = PolicyDescriptor::builder()
            .all_roles(["A", "B"])
            .build()
            .unwrap();
        let d = evaluate(&set(&["A"]), &set(&[]), &policy, true);
        assert!(!d.allowed);
        assert_eq!(d.reason, DecisionReason::MissingRole(Some("B".into())));

        let d = evaluate(&set(&["A", "B"]), &set(&[]), &policy, true);
        assert!(d.allowed);
    }

    #[test]
    fn all_roles_fails_fast_in_declaration_order() {
        let policy = PolicyDescriptor::builder()
            .all_roles(["C", "A", "B"])
            .build()
            .unwrap();
        let (d, trace) = evaluate_traced(&set(&[]), &set(&[]), &policy, true);
        assert_eq!(d.reason, DecisionReason::MissingRole(Some("C".into())));
        assert_eq!(trace.probe_count(Dimension::Roles), 1);
    }

    #[test]
    fn any_role_single_match_passes() {
        let policy = PolicyDescriptor::builder()
            .any_role(["A", "B"])
            .build()
            .unwrap();
        assert!(evaluate(&set(&["B"]), &set(&[]), &policy, true).allowed);
    }

    #[test]
    fn any_role_none_matched_names_no_code() {
        let policy = PolicyDescriptor::builder()
            .any_role(["A", "B"])
            .all_permissions(["p"])
            .build()
            .unwrap();
        let (d, trace) = evaluate_traced(&set(&["Z"]), &set(&["p"]), &policy, true);
        assert_eq!(d.reason, DecisionReason::MissingRole(None));
        assert!(!trace.evaluated(Dimension::Permissions));
    }

    #[test]
    fn role_failure_under_all_skips_permissions() {
        let policy = PolicyDescriptor::builder()
            .all_roles(["A"])
            .all_permissions(["p"])
            .build()
            .unwrap();
        let (d, trace) = evaluate_traced(&set(&[]), &set(&[]), &policy, true);
        assert_eq!(d.reason, DecisionReason::MissingRole(Some("A".into())));
        assert!(trace.evaluated(Dimension::Roles));
        assert!(!trace.evaluated(Dimension::Permissions));
    }

    #[test]
    fn role_pass_proceeds_to_permissions() {
        let policy = PolicyDescriptor::builder()
            .any_role(["A", "B"])
            .all_permissions(["p", "q"])
            .build()
            .unwrap();
        let (d, trace) = evaluate_traced(&set(&["A"]), &set(&["p"]), &policy, true);
        assert_eq!(d.reason, DecisionReason::MissingPermission(Some("q".into())));
        assert_eq!(trace.probe_count(Dimension::Roles), 1);
        assert_eq!(trace.probe_count(Dimension::Permissions), 2);
    }

    #[test]
    fn any_permission_none_matched() {
        let policy = PolicyDescriptor::builder()
            .any_permission(["p", "q"])
            .build()
            .unwrap();
        let d = evaluate(&set(&[]), &set(&["r"]), &policy, true);
        assert_eq!(d.reason, DecisionReason::MissingPermission(None));
    }

    #[test]
    fn vacuous_role_dimension_ignores_combinator() {
        let policy = PolicyDescriptor::builder()
            .any_role(Vec::<String>::new())
            .all_permissions(["p"])
            .build()
            .unwrap();
        let (d, trace) = evaluate_traced(&set(&[]), &set(&["p"]), &policy, true);
        assert!(d.allowed);
        assert!(!trace.evaluated(Dimension::Roles));
    }

    #[test]
    fn evaluate_authorities_none_is_unauthenticated() {
        let d = evaluate_authorities(None, &PolicyDescriptor::default());
        assert_eq!(d.reason, DecisionReason::Unauthenticated);

        let a = Authorities::new();
        assert!(evaluate_authorities(Some(&a), &PolicyDescriptor::default()).allowed);
    }
}
