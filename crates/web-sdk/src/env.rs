//! Host environment access: the page-global bindings an integration reads and
//! writes, behind a capability trait so tests can swap in an in-memory double.
//!
//! Integrations only ever append to a command queue and probe for globals;
//! draining the queue belongs to the provider script.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use affiliate_core::{BridgeError, BridgeResult};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::commands::Command;

/// Append-only command log consumed by a provider script.
pub trait CommandLog: Send + Sync {
    fn append(&self, command: Command);
}

/// Access to named globals of the host environment.
pub trait Environment: Send + Sync {
    /// Return the named command queue, creating it empty when absent.
    fn ensure_queue(&self, name: &str) -> BridgeResult<Arc<dyn CommandLog>>;

    /// Whether the named global exists and is non-null.
    fn has_global(&self, name: &str) -> bool;
}

/// FIFO command buffer held by [`MemoryEnvironment`].
#[derive(Default)]
pub struct MemoryQueue {
    commands: Mutex<Vec<Command>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the queued commands, oldest first.
    pub fn snapshot(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    /// Take every queued command, as a loaded provider script would.
    pub fn drain(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.lock())
    }
}

impl CommandLog for MemoryQueue {
    fn append(&self, command: Command) {
        self.commands.lock().push(command);
    }
}

enum Global {
    Queue(Arc<MemoryQueue>),
    Object(serde_json::Value),
}

/// In-process stand-in for a page's global scope.
#[derive(Default)]
pub struct MemoryEnvironment {
    globals: DashMap<String, Global>,
    sealed: AtomicBool,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment that refuses to create new globals, as a sandboxed
    /// host would.
    pub fn sealed() -> Self {
        let env = Self::default();
        env.sealed.store(true, Ordering::SeqCst);
        env
    }

    /// Bind a plain object global, e.g. the namespace a provider script
    /// installs once it has executed.
    pub fn set_global(&self, name: &str, value: serde_json::Value) {
        self.globals.insert(name.to_string(), Global::Object(value));
    }

    /// The named queue, if one has been created.
    pub fn queue(&self, name: &str) -> Option<Arc<MemoryQueue>> {
        match self.globals.get(name).as_deref() {
            Some(Global::Queue(queue)) => Some(Arc::clone(queue)),
            _ => None,
        }
    }

    /// Drop every global.
    pub fn reset(&self) {
        self.globals.clear();
    }
}

impl Environment for MemoryEnvironment {
    fn ensure_queue(&self, name: &str) -> BridgeResult<Arc<dyn CommandLog>> {
        if let Some(existing) = self.globals.get(name) {
            return match &*existing {
                Global::Queue(queue) => Ok(Arc::clone(queue) as Arc<dyn CommandLog>),
                Global::Object(_) => Err(BridgeError::Environment(format!(
                    "global '{name}' exists and is not a command queue"
                ))),
            };
        }

        if self.sealed.load(Ordering::SeqCst) {
            return Err(BridgeError::Environment(format!(
                "environment does not allow creating global '{name}'"
            )));
        }

        let queue = match self
            .globals
            .entry(name.to_string())
            .or_insert_with(|| Global::Queue(Arc::new(MemoryQueue::new())))
            .value()
        {
            Global::Queue(queue) => Arc::clone(queue),
            Global::Object(_) => {
                return Err(BridgeError::Environment(format!(
                    "global '{name}' exists and is not a command queue"
                )))
            }
        };
        debug!(global = name, "command queue created");
        Ok(queue as Arc<dyn CommandLog>)
    }

    fn has_global(&self, name: &str) -> bool {
        match self.globals.get(name).as_deref() {
            Some(Global::Queue(_)) => true,
            Some(Global::Object(value)) => !value.is_null(),
            None => false,
        }
    }
}
