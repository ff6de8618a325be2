//! Integrations between the host analytics dispatcher and third-party
//! browser widgets.
//!
//! Each integration implements [`Integration`]. The dispatcher decides when to
//! call it; the integration translates each call into the provider's own
//! command vocabulary.

pub mod curebit;

use affiliate_core::{BridgeResult, Traits};

/// Raw properties of a track call.
pub type Properties = serde_json::Map<String, serde_json::Value>;

pub trait Integration: Send + Sync {
    /// Display name, e.g. "Curebit".
    fn name(&self) -> &str;

    /// Page globals the integration owns.
    fn globals(&self) -> &[&'static str];

    /// Whether the dispatcher may treat the integration as ready as soon as
    /// `initialize` returns.
    fn ready_on_initialize(&self) -> bool {
        false
    }

    fn initialize(&self) -> BridgeResult<()>;

    /// Whether the provider script has finished loading. Side-effect free.
    fn is_loaded(&self) -> bool;

    fn identify(&self, user_id: &str, traits: Option<&Traits>) -> BridgeResult<()>;

    /// Forward a track call. Events the provider has no use for are ignored.
    fn track(&self, event: &str, properties: Option<&Properties>) -> BridgeResult<()>;

    /// Validate that the integration configuration is usable.
    fn validate_config(&self) -> BridgeResult<()>;
}
