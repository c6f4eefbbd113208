//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! sync engine. Ports are interfaces that the engine depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ITransferGateway`] - Upload/download/delete of resource content
//! - [`ICommandChannel`] - Polling for remote commands and reporting completion
//! - [`IIdentityProvider`] - Account linking and credential verification
//! - [`ISessionStore`] - Local credential cache
//! - [`IFileEventSource`] - Filesystem change notifications

pub mod command_channel;
pub mod file_events;
pub mod identity;
pub mod session_store;
pub mod transfer_gateway;

pub use command_channel::ICommandChannel;
pub use file_events::{EventSubscription, FsEvent, FsEventKind, IFileEventSource, SubscriptionGuard};
pub use identity::IIdentityProvider;
pub use session_store::ISessionStore;
pub use transfer_gateway::{ITransferGateway, UploadFile};
