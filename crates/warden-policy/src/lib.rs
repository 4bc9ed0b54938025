//! Role/permission policy model for Warden.
//!
//! A [`PolicyDescriptor`] is attached to a guarded operation at declaration
//! time. At call time the caller's granted [`Authorities`] are checked against
//! it by [`evaluate`], which yields a [`Decision`]. Denials surface to callers
//! as an [`AuthorizationError`].
//!
//! ```text
//!   granted roles ──┐
//!   granted perms ──┼──▶ evaluate() ──▶ Decision { allowed, reason }
//!   descriptor   ───┤                          │
//!   authenticated ──┘                          ▼
//!                                   Ok | Unauthenticated
//!                                      | MissingRole(code?)
//!                                      | MissingPermission(code?)
//! ```

pub mod authorities;
pub mod decision;
pub mod descriptor;
pub mod evaluator;

pub use authorities::Authorities;
pub use decision::{reason_codes, AuthorizationError, Decision, DecisionReason};
pub use descriptor::{DescriptorError, PolicyDescriptor, PolicyDescriptorBuilder};
pub use evaluator::{evaluate, evaluate_authorities, evaluate_traced, Dimension, EvaluationTrace, Probe};
