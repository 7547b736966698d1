//! Seams to the script engine: instances, their creator, and callback
//! subscriptions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use scripthost_devsupport::Task;

use crate::error::Result;

/// Identifies the root view an instance renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootViewId(pub u64);

impl RootViewId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RootViewId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Instance notifications a host can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallbackKind {
    /// The instance entered its error state.
    Error,
    /// The dev server reported changed sources.
    LiveReload,
    /// A remote debugger attached.
    DebuggerAttach,
}

impl CallbackKind {
    /// Every kind, in registration order.
    pub const ALL: [CallbackKind; 3] = [
        CallbackKind::Error,
        CallbackKind::LiveReload,
        CallbackKind::DebuggerAttach,
    ];
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackKind::Error => write!(f, "error"),
            CallbackKind::LiveReload => write!(f, "live-reload"),
            CallbackKind::DebuggerAttach => write!(f, "debugger-attach"),
        }
    }
}

/// Token returned by a registration and exchanged for its revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle {
    kind: CallbackKind,
    id: u64,
}

impl SubscriptionHandle {
    /// The kind this handle was registered for.
    pub fn kind(&self) -> CallbackKind {
        self.kind
    }
}

/// A callback an instance may invoke from any thread.
pub type InstanceCallback = Arc<dyn Fn() + Send + Sync>;

/// Developer settings an instance was created with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSettings {
    /// Offer the developer menu.
    pub enable_developer_menu: bool,
    /// Execute script code in a remote debugger.
    pub use_web_debugger: bool,
    /// Reload on dev-server change notifications.
    pub use_live_reload: bool,
}

/// A running script-engine instance.
///
/// Implementations may invoke registered callbacks from any thread. The host
/// calls these methods with its state locked, so they must not call back into
/// the host synchronously.
pub trait ScriptInstance: Send + Sync {
    /// True while the instance is in its error state.
    fn is_in_error(&self) -> bool;

    /// True while the instance waits for a remote debugger.
    fn is_waiting_for_debugger(&self) -> bool;

    /// Text of the most recent error.
    fn last_error_message(&self) -> String;

    /// Settings the instance runs with.
    fn settings(&self) -> InstanceSettings;

    /// Registers `callback` for `kind`.
    fn register_callback(&self, kind: CallbackKind, callback: InstanceCallback)
        -> SubscriptionHandle;

    /// Revokes a registration.
    fn unregister_callback(&self, handle: SubscriptionHandle);

    /// Starts rendering into `root`.
    fn attach_root_view(&self, root: RootViewId, initial_props: Value);

    /// Stops rendering into `root`.
    fn detach_root_view(&self, root: RootViewId);

    /// Calls a script function with opaque arguments.
    fn call_function(&self, module: &str, method: &str, args: Value);

    /// Enqueues `task` on the instance's internal work queue.
    fn run_on_queue(&self, task: Task);

    /// Marks the instance as stale so it gets rebuilt.
    fn set_needs_reload(&self);
}

/// Supplies instances and persists developer settings.
///
/// `get_instance` runs with the host's state locked and must not call back
/// into the host.
pub trait InstanceCreator: Send + Sync {
    /// Returns the current instance, creating it if needed.
    fn get_instance(&self) -> Result<Arc<dyn ScriptInstance>>;

    /// Drops the cached instance so the next `get_instance` builds a new one.
    fn mark_as_needs_reload(&self);

    /// Stores the web-debugger setting.
    fn persist_use_web_debugger(&self, enabled: bool);

    /// Stores the live-reload setting.
    fn persist_use_live_reload(&self, enabled: bool);
}

/// Registration bookkeeping for [`ScriptInstance`] implementors.
///
/// Each handle can be revoked exactly once; callbacks of a kind fire in
/// registration order.
#[derive(Default)]
pub struct CallbackRegistry {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<SubscriptionHandle, InstanceCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` and returns its handle.
    pub fn register(&self, kind: CallbackKind, callback: InstanceCallback) -> SubscriptionHandle {
        let handle = SubscriptionHandle {
            kind,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, callback);
        handle
    }

    /// Revokes `handle`. Returns false if it was not registered.
    pub fn unregister(&self, handle: SubscriptionHandle) -> bool {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle)
            .is_some()
    }

    /// Invokes every callback registered for `kind`.
    ///
    /// Callbacks run outside the registry lock, so they may register or
    /// revoke.
    pub fn fire(&self, kind: CallbackKind) {
        let matching: Vec<InstanceCallback> = self
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(h, _)| h.kind == kind)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for cb in matching {
            cb();
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
