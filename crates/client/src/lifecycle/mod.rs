//! Proxy instance lifecycle.
//!
//! An instance ([`Worker`]) moves through
//! `Installing → Waiting → Activating → Active → Superseded`, or ends up
//! `Redundant` when pre-warming fails. The [`Registration`] holds the
//! installing, waiting and active slots and performs the takeover: the last
//! instance to finish activation is the one serving requests.

mod registration;
mod worker;

use serde::Serialize;

pub use registration::Registration;
pub use worker::Worker;

/// State of one proxy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    /// Replaced by a later instance.
    Superseded,
    /// Install failed; this instance never serves.
    Redundant,
}
