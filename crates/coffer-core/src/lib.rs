//! coffer-core - Shared toolkit for the coffer vault walkthroughs
//!
//! The vault service acknowledges mutations before their effects are
//! visible to reads. Everything here exists around that gap: a bounded
//! polling loop that waits for propagation, client traits for the service,
//! and an in-memory service with a configurable visibility lag to run
//! against.

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod naming;
pub mod poll;

pub use client::{CertificateClient, KeyClient, SecretClient, VaultClient};
pub use config::Config;
pub use error::ServiceError;
pub use memory::MemoryService;
pub use poll::{PollError, PollSettings};
