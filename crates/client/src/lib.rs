//! Client side of cours-offline.
//!
//! This crate provides the network fetch pipeline, request classification and
//! caching strategies, the proxy lifecycle, the control channel and the
//! [`OfflineProxy`] facade tying them together.

pub mod control;
pub mod fetch;
pub mod lifecycle;
pub mod proxy;
pub mod route;

#[cfg(test)]
mod testing;

pub use control::{ControlChannel, Notifier};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use lifecycle::{LifecycleState, Registration, Worker};
pub use proxy::{GenerationInfo, OfflineProxy, ProxyStatus, WorkerStatus};
pub use route::{RequestClass, ResponseSource, Served, Strategy};
