//! Exit codes of the `warden` binary. Part of the public contract.

pub const SUCCESS: i32 = 0;
pub const INTERNAL_ERROR: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;
pub const FORBIDDEN: i32 = 3;
pub const UNAUTHENTICATED: i32 = 4;
