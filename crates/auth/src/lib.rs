//! Session liveness for the checkout boundary.
//!
//! Token issuance/verification crypto is out of scope (the HTTP layer owns
//! it); this crate owns the part the engine's concurrency discipline depends
//! on: a revocable session registry whose validation is performed **at the
//! point of use**. A credential revoked while a request is in flight must be
//! rejected even if it looked valid when the request was first accepted.

pub mod session;

pub use session::{AuthError, Session, SessionRegistry, SessionToken};
