//! SaveSync Core - Domain types, configuration and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `ResourceId`, `WatchedResource`, `RemoteCommand`, `Credential`
//! - **Catalog** - Loading the games/apps resource declarations
//! - **Use cases** - `AuthenticateUseCase`
//! - **Port definitions** - `ITransferGateway`, `ICommandChannel`, `IIdentityProvider`,
//!   `ISessionStore`, `IFileEventSource`
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define trait interfaces that adapter
//! crates implement, and use cases orchestrate domain types through them.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
