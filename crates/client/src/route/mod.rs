//! Request classification and routing.
//!
//! Every intercepted request is classified by walking [`ROUTES`] in order;
//! the first matching predicate decides its class, and the class decides the
//! caching strategy:
//!
//! | Class        | Match                                   | Strategy                         |
//! |--------------|-----------------------------------------|----------------------------------|
//! | `Api`        | path starts with the API prefix         | network only, cache on failure   |
//! | `StaticAsset`| destination script/style/image/font     | cache first                      |
//! | `Navigation` | destination document                    | network first, then placeholder  |
//! | `Other`      | anything else                           | network first                    |

pub mod strategy;

use cours_offline_core::{Destination, ProxyRequest};
use schemars::JsonSchema;
use serde::Serialize;

pub use strategy::{ResponseSource, Router, RouterConfig, Served};

/// Class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Api,
    StaticAsset,
    Navigation,
    Other,
}

/// Caching strategy applied to a request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Network; the caches are only read when the transport fails.
    NetworkOnly,
    /// Cache; the network is only consulted on a miss.
    CacheFirst,
    /// Network, then the cached copy, then the offline placeholder.
    NetworkFirstWithPlaceholder,
    /// Network, then the cached copy.
    NetworkFirst,
}

impl RequestClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::Api => Strategy::NetworkOnly,
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::Navigation => Strategy::NetworkFirstWithPlaceholder,
            RequestClass::Other => Strategy::NetworkFirst,
        }
    }
}

/// Predicate over a request and the configured API prefix.
pub type Predicate = fn(&ProxyRequest, &str) -> bool;

fn is_api(request: &ProxyRequest, api_prefix: &str) -> bool {
    request.url.path().starts_with(api_prefix)
}

fn is_static_asset(request: &ProxyRequest, _api_prefix: &str) -> bool {
    matches!(request.destination, Destination::Script | Destination::Style | Destination::Image | Destination::Font)
}

fn is_navigation(request: &ProxyRequest, _api_prefix: &str) -> bool {
    request.destination == Destination::Document
}

fn any(_request: &ProxyRequest, _api_prefix: &str) -> bool {
    true
}

/// Classification rules in priority order. The last rule always matches.
pub const ROUTES: &[(Predicate, RequestClass)] = &[
    (is_api, RequestClass::Api),
    (is_static_asset, RequestClass::StaticAsset),
    (is_navigation, RequestClass::Navigation),
    (any, RequestClass::Other),
];

/// Classify a request. Pure and deterministic.
pub fn classify(request: &ProxyRequest, api_prefix: &str) -> RequestClass {
    ROUTES
        .iter()
        .find(|(matches, _)| matches(request, api_prefix))
        .map_or(RequestClass::Other, |(_, class)| *class)
}
