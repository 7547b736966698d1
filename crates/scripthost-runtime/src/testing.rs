//! In-memory instance, creator and root view for host tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use scripthost_devsupport::Task;

use crate::error::Result;
use crate::instance::{
    CallbackKind, CallbackRegistry, InstanceCallback, InstanceCreator, InstanceSettings,
    RootViewId, ScriptInstance, SubscriptionHandle,
};
use crate::view::{FocusTarget, RootView, UiElement};

/// Ordered record of calls made on the mocks.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    pub(crate) fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Asserts that `expected` appear in this order, not necessarily adjacent.
    pub(crate) fn assert_in_order(&self, expected: &[&str]) {
        let entries = self.entries();
        let mut from = 0;
        for want in expected {
            match entries[from..].iter().position(|e| e == want) {
                Some(offset) => from += offset + 1,
                None => panic!("{:?} missing after position {} in {:?}", want, from, entries),
            }
        }
    }
}

/// An instance work queue that only runs when told to.
#[derive(Default)]
pub(crate) struct ManualQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl ManualQueue {
    pub(crate) fn push(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }

    pub(crate) fn run_all(&self) {
        loop {
            let next = self.tasks.lock().unwrap().pop_front();
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

pub(crate) struct MockInstance {
    log: EventLog,
    registry: CallbackRegistry,
    queue: Arc<ManualQueue>,
    in_error: AtomicBool,
    waiting: AtomicBool,
    last_error: Mutex<String>,
    settings: InstanceSettings,
}

impl MockInstance {
    /// Enters the error state and notifies subscribers.
    pub(crate) fn set_error(&self, message: &str) {
        *self.last_error.lock().unwrap() = message.to_string();
        self.in_error.store(true, Ordering::SeqCst);
        self.registry.fire(CallbackKind::Error);
    }

    pub(crate) fn set_waiting(&self, waiting: bool) {
        self.waiting.store(waiting, Ordering::SeqCst);
    }

    pub(crate) fn fire(&self, kind: CallbackKind) {
        self.registry.fire(kind);
    }

    pub(crate) fn subscriptions(&self) -> usize {
        self.registry.len()
    }
}

impl ScriptInstance for MockInstance {
    fn is_in_error(&self) -> bool {
        self.in_error.load(Ordering::SeqCst)
    }

    fn is_waiting_for_debugger(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    fn last_error_message(&self) -> String {
        self.last_error.lock().unwrap().clone()
    }

    fn settings(&self) -> InstanceSettings {
        self.settings.clone()
    }

    fn register_callback(
        &self,
        kind: CallbackKind,
        callback: InstanceCallback,
    ) -> SubscriptionHandle {
        self.log.push(format!("register_callback {}", kind));
        self.registry.register(kind, callback)
    }

    fn unregister_callback(&self, handle: SubscriptionHandle) {
        self.log.push(format!("unregister_callback {}", handle.kind()));
        self.registry.unregister(handle);
    }

    fn attach_root_view(&self, _root: RootViewId, initial_props: Value) {
        self.log.push(format!("attach_root_view {}", initial_props));
    }

    fn detach_root_view(&self, _root: RootViewId) {
        self.log.push("detach_root_view");
    }

    fn call_function(&self, module: &str, method: &str, args: Value) {
        self.log
            .push(format!("call_function {}.{} {}", module, method, args));
    }

    fn run_on_queue(&self, task: Task) {
        self.log.push("run_on_queue");
        self.queue.push(task);
    }

    fn set_needs_reload(&self) {
        self.log.push("set_needs_reload");
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        self.log.push("instance dropped");
    }
}

/// Creator caching one instance until marked for reload.
pub(crate) struct MockCreator {
    log: EventLog,
    queue: Arc<ManualQueue>,
    settings: Mutex<InstanceSettings>,
    cached: Mutex<Option<Arc<MockInstance>>>,
    born_error: Mutex<Option<String>>,
    born_waiting: AtomicBool,
    created: AtomicUsize,
}

impl MockCreator {
    pub(crate) fn new(log: EventLog, settings: InstanceSettings) -> Arc<Self> {
        Arc::new(Self {
            log,
            queue: Arc::new(ManualQueue::default()),
            settings: Mutex::new(settings),
            cached: Mutex::new(None),
            born_error: Mutex::new(None),
            born_waiting: AtomicBool::new(false),
            created: AtomicUsize::new(0),
        })
    }

    /// Instances created from now on start in the error state.
    pub(crate) fn fail_with(&self, message: &str) {
        *self.born_error.lock().unwrap() = Some(message.to_string());
    }

    /// Instances created from now on start waiting for a debugger.
    pub(crate) fn start_waiting(&self) {
        self.born_waiting.store(true, Ordering::SeqCst);
    }

    pub(crate) fn current(&self) -> Option<Arc<MockInstance>> {
        self.cached.lock().unwrap().clone()
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn queue(&self) -> Arc<ManualQueue> {
        Arc::clone(&self.queue)
    }

    pub(crate) fn settings(&self) -> InstanceSettings {
        self.settings.lock().unwrap().clone()
    }
}

impl InstanceCreator for MockCreator {
    fn get_instance(&self) -> Result<Arc<dyn ScriptInstance>> {
        self.log.push("get_instance");
        let mut cached = self.cached.lock().unwrap();
        if let Some(instance) = cached.as_ref() {
            return Ok(Arc::clone(instance) as Arc<dyn ScriptInstance>);
        }

        self.log.push("create_instance");
        self.created.fetch_add(1, Ordering::SeqCst);
        let born_error = self.born_error.lock().unwrap().clone();
        let instance = Arc::new(MockInstance {
            log: self.log.clone(),
            registry: CallbackRegistry::new(),
            queue: Arc::clone(&self.queue),
            in_error: AtomicBool::new(born_error.is_some()),
            waiting: AtomicBool::new(self.born_waiting.load(Ordering::SeqCst)),
            last_error: Mutex::new(born_error.unwrap_or_default()),
            settings: self.settings(),
        });
        *cached = Some(Arc::clone(&instance));
        Ok(instance as Arc<dyn ScriptInstance>)
    }

    fn mark_as_needs_reload(&self) {
        self.log.push("mark_as_needs_reload");
        self.cached.lock().unwrap().take();
    }

    fn persist_use_web_debugger(&self, enabled: bool) {
        self.log.push(format!("persist_use_web_debugger {}", enabled));
        self.settings.lock().unwrap().use_web_debugger = enabled;
    }

    fn persist_use_live_reload(&self, enabled: bool) {
        self.log.push(format!("persist_use_live_reload {}", enabled));
        self.settings.lock().unwrap().use_live_reload = enabled;
    }
}

/// Runs inside `try_focus`, the way a toolkit raises focus events.
pub(crate) type FocusHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct RootRecord {
    pub(crate) content: Vec<UiElement>,
    pub(crate) harbor_inserted: usize,
    pub(crate) harbor_tab_stop: bool,
    pub(crate) focused: Option<FocusTarget>,
    pub(crate) input_installed: bool,
    pub(crate) on_focus: Option<FocusHook>,
}

pub(crate) type SharedRecord = Arc<Mutex<RootRecord>>;

pub(crate) struct MockRoot {
    log: EventLog,
    panel: bool,
    record: SharedRecord,
}

impl MockRoot {
    pub(crate) fn new(log: EventLog, panel: bool) -> (Self, SharedRecord) {
        let record = SharedRecord::default();
        (
            Self {
                log,
                panel,
                record: Arc::clone(&record),
            },
            record,
        )
    }
}

impl RootView for MockRoot {
    fn is_panel(&self) -> bool {
        self.panel
    }

    fn clear_content(&mut self) {
        self.record.lock().unwrap().content.clear();
    }

    fn append_content(&mut self, element: UiElement) {
        self.record.lock().unwrap().content.push(element);
    }

    fn remove_content(&mut self, element: &UiElement) {
        let mut record = self.record.lock().unwrap();
        if let Some(pos) = record.content.iter().position(|e| e == element) {
            record.content.remove(pos);
        }
    }

    fn insert_focus_harbor(&mut self) {
        let mut record = self.record.lock().unwrap();
        record.harbor_inserted += 1;
        record.harbor_tab_stop = false;
    }

    fn set_focus_harbor_tab_stop(&mut self, tab_stop: bool) {
        self.record.lock().unwrap().harbor_tab_stop = tab_stop;
    }

    fn try_focus(&mut self, target: FocusTarget) -> bool {
        let hook = {
            let mut record = self.record.lock().unwrap();
            record.focused = Some(target);
            record.on_focus.clone()
        };
        if let Some(hook) = hook {
            hook();
        }
        true
    }

    fn install_input_handlers(&mut self, _instance: Arc<dyn ScriptInstance>) {
        self.log.push("install_input_handlers");
        self.record.lock().unwrap().input_installed = true;
    }

    fn remove_input_handlers(&mut self) {
        self.log.push("remove_input_handlers");
        self.record.lock().unwrap().input_installed = false;
    }
}
