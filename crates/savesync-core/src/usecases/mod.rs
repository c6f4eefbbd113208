//! Use cases (interactors) for SaveSync
//!
//! Use cases are thin coordinators that delegate business rules to domain
//! types and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`AuthenticateUseCase`] - Account linking, session restore, logout

pub mod authenticate;

pub use authenticate::{AuthenticateUseCase, SessionStatus};
