//! Domain entities
//!
//! This module contains the core domain types for SaveSync:
//! - Resources (catalog declarations and resolved watch roots)
//! - Remote commands delivered through the command relay
//! - Session credential and linked profile
//! - Domain-specific error types

pub mod command;
pub mod errors;
pub mod resource;
pub mod session;

pub use command::{CommandKind, RemoteCommand};
pub use errors::{CredentialRejected, DomainError};
pub use resource::{
    ResourceCategory, ResourceDefinition, ResourceId, WatchPattern, WatchRoot, WatchedResource,
};
pub use session::{Credential, LinkCode, LinkedSession, Profile, Verification};
