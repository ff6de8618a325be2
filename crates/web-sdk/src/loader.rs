//! Provider script loading. A load is a one-shot, fire-and-forget request:
//! callers learn about completion only by polling for the provider's global.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Starts loading a provider script. Must return without waiting for the
/// script to arrive.
pub trait ScriptLoader: Send + Sync {
    /// Returns `false` when the load could not be started at all.
    fn load(&self, src: &str) -> bool;
}

/// Loader that only logs the request.
pub struct NoOpLoader;

impl ScriptLoader for NoOpLoader {
    fn load(&self, src: &str) -> bool {
        debug!(src, "script load requested (no-op loader)");
        true
    }
}

pub fn noop_loader() -> Arc<dyn ScriptLoader> {
    Arc::new(NoOpLoader)
}

/// Loader that records requested sources for tests.
#[derive(Default)]
pub struct RecordingLoader {
    requests: Mutex<Vec<String>>,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl ScriptLoader for RecordingLoader {
    fn load(&self, src: &str) -> bool {
        self.requests.lock().push(src.to_string());
        true
    }
}

/// Loader that runs `fetch` as a detached task on the current tokio runtime.
pub struct TaskLoader<F> {
    fetch: F,
}

impl<F, Fut> TaskLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

impl<F, Fut> ScriptLoader for TaskLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn load(&self, src: &str) -> bool {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn((self.fetch)(src.to_string()));
                info!(src, "script load started");
                true
            }
            Err(_) => {
                warn!(src, "no async runtime available, script load not started");
                false
            }
        }
    }
}
