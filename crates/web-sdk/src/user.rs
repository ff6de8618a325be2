//! The host's view of the current user, consulted when a purchase is
//! attributed.

use std::sync::Arc;

use affiliate_core::Traits;
use parking_lot::RwLock;

pub trait UserSource: Send + Sync {
    fn user_id(&self) -> Option<String>;
    fn traits(&self) -> Option<Traits>;
}

/// No user is ever known.
pub struct Anonymous;

impl UserSource for Anonymous {
    fn user_id(&self) -> Option<String> {
        None
    }

    fn traits(&self) -> Option<Traits> {
        None
    }
}

pub fn anonymous() -> Arc<dyn UserSource> {
    Arc::new(Anonymous)
}

/// User record the host updates as identify calls arrive.
#[derive(Default)]
pub struct IdentifiedUser {
    state: RwLock<Option<(Option<String>, Traits)>>,
}

impl IdentifiedUser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identify(&self, user_id: Option<String>, traits: Traits) {
        *self.state.write() = Some((user_id, traits));
    }

    pub fn reset(&self) {
        *self.state.write() = None;
    }
}

impl UserSource for IdentifiedUser {
    fn user_id(&self) -> Option<String> {
        self.state.read().as_ref().and_then(|(id, _)| id.clone())
    }

    fn traits(&self) -> Option<Traits> {
        self.state.read().as_ref().map(|(_, traits)| traits.clone())
    }
}
