//! Core types and shared functionality for cours-offline.
//!
//! This crate provides:
//! - Cache generations and entries with a SQLite backend
//! - Request, response and control message wire types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod message;

pub use cache::{CacheDb, CacheStorage, RequestIdentity, Store, VersionSet, open_store};
pub use config::{ConfigError, ProxyConfig};
pub use error::Error;
pub use http::{Destination, ProxyRequest, ProxyResponse};
pub use message::{ControlMessage, Notification, NotificationAction, PushPayload};
