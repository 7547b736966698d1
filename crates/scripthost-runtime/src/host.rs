//! The runtime host: binds one script instance to one root view.
//!
//! Every public operation runs on the UI thread. Instance callbacks arrive on
//! arbitrary threads; they only post a [`HostEvent`] onto the UI queue and
//! re-check the instance's state once there.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use crate::config::{HostConfig, KeyChord};
use crate::dispatcher::UiDispatcher;
use crate::error::{HostError, Result};
use crate::instance::{
    CallbackKind, InstanceCallback, InstanceCreator, RootViewId, ScriptInstance,
    SubscriptionHandle,
};
use crate::menu::{DevMenuCommand, DeveloperMenu};
use crate::overlay::{desired_overlay, Overlay, Panel};
use crate::view::{ElementId, FocusTarget, RootView, UiElement};

/// Notifications the host handles on the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    InstanceError,
    InstanceWaiting,
    DebuggerAttached,
    LiveReload,
}

const SUBSCRIPTIONS: [(CallbackKind, HostEvent); 3] = [
    (CallbackKind::Error, HostEvent::InstanceError),
    (CallbackKind::LiveReload, HostEvent::LiveReload),
    (CallbackKind::DebuggerAttach, HostEvent::DebuggerAttached),
];

/// Lifecycle controller for a script instance and its root view.
///
/// Cloning shares the same host.
#[derive(Clone)]
pub struct RuntimeHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    config: HostConfig,
    dispatcher: UiDispatcher,
    root_id: RootViewId,
    state: Mutex<HostState>,
}

struct HostState {
    attached: bool,
    creator: Option<Arc<dyn InstanceCreator>>,
    instance: Option<Arc<dyn ScriptInstance>>,
    root: Box<dyn RootView>,
    initial_props: Value,
    component_name: String,
    subscriptions: Vec<SubscriptionHandle>,
    overlay: Overlay,
    error_panel: Option<Panel>,
    waiting_panel: Option<Panel>,
    developer_menu: Option<DeveloperMenu>,
    accelerator: Option<KeyChord>,
    focus_harbor: bool,
}

impl RuntimeHost {
    /// Creates a detached host for `root`.
    pub fn new(dispatcher: UiDispatcher, root: Box<dyn RootView>, config: HostConfig) -> Self {
        Self {
            inner: Arc::new(HostInner {
                config,
                dispatcher,
                root_id: RootViewId::next(),
                state: Mutex::new(HostState {
                    attached: false,
                    creator: None,
                    instance: None,
                    root,
                    initial_props: Value::Null,
                    component_name: String::new(),
                    subscriptions: Vec::new(),
                    overlay: Overlay::None,
                    error_panel: None,
                    waiting_panel: None,
                    developer_menu: None,
                    accelerator: None,
                    focus_harbor: false,
                }),
            }),
        }
    }

    /// Id the instance sees for this host's root view.
    pub fn root_id(&self) -> RootViewId {
        self.inner.root_id
    }

    fn ensure_ui_thread(&self) -> Result<()> {
        if self.inner.dispatcher.is_ui_thread() {
            Ok(())
        } else {
            Err(HostError::NotOnUiThread)
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HostState>> {
        self.inner
            .state
            .lock()
            .map_err(|e| HostError::LockPoisoned(e.to_string()))
    }

    fn ui_lock(&self) -> Result<MutexGuard<'_, HostState>> {
        self.ensure_ui_thread()?;
        self.lock()
    }

    // ---- Lifecycle ----

    /// Obtains an instance and attaches it to the root view.
    ///
    /// No-op while attached.
    pub fn attach_root(&self) -> Result<()> {
        let mut state = self.ui_lock()?;
        self.attach_root_locked(&mut state)
    }

    fn attach_root_locked(&self, state: &mut HostState) -> Result<()> {
        if state.attached {
            return Ok(());
        }

        let instance = match state.instance.clone() {
            Some(instance) => instance,
            None => {
                let creator = state
                    .creator
                    .as_ref()
                    .ok_or_else(|| HostError::InstanceCreation("no instance creator".into()))?;
                let instance = creator.get_instance()?;
                state.instance = Some(Arc::clone(&instance));
                instance
            }
        };

        // Instances can be born failed or waiting for a debugger.
        let desired = desired_overlay(
            instance.is_in_error(),
            instance.is_waiting_for_debugger(),
            &instance.last_error_message(),
        );
        self.apply_overlay(state, desired);

        state.root.install_input_handlers(Arc::clone(&instance));
        self.subscribe(state, &instance);
        instance.attach_root_view(self.inner.root_id, state.initial_props.clone());

        if instance.settings().enable_developer_menu {
            state.accelerator = Some(self.inner.config.menu_chord);
        }
        state.attached = true;

        info!(root = self.inner.root_id.0, component = %state.component_name, "root attached");
        Ok(())
    }

    /// Detaches the instance from the root view. No-op while detached.
    pub fn detach_root(&self) -> Result<()> {
        let mut state = self.ui_lock()?;
        self.detach_root_locked(&mut state);
        Ok(())
    }

    fn detach_root_locked(&self, state: &mut HostState) {
        if !state.attached {
            return;
        }

        self.dismiss_menu(state);
        state.accelerator = None;
        state.root.remove_input_handlers();

        if let Some(instance) = state.instance.clone() {
            instance.detach_root_view(self.inner.root_id);

            // The cached panels stay around for the next error.
            if instance.is_in_error() {
                state.root.clear_content();
                state.overlay = Overlay::None;
            }
        }

        state.attached = false;
        info!(root = self.inner.root_id.0, "root detached");
    }

    /// Revokes subscriptions and releases the host's instance reference.
    ///
    /// The instance stays alive until its own work queue and the UI queue
    /// have run everything queued before this call.
    pub fn detach_instance(&self) -> Result<()> {
        let mut state = self.ui_lock()?;
        self.detach_instance_locked(&mut state);
        Ok(())
    }

    fn detach_instance_locked(&self, state: &mut HostState) {
        let Some(instance) = state.instance.take() else {
            return;
        };

        for handle in state.subscriptions.drain(..) {
            instance.unregister_callback(handle);
        }

        let queued = Arc::clone(&instance);
        instance.run_on_queue(Box::new(move || drop(queued)));
        if let Err(e) = self.inner.dispatcher.post(move || drop(instance)) {
            warn!(error = %e, "UI queue closed while draining instance");
        }

        debug!(root = self.inner.root_id.0, "instance detached");
    }

    /// Detaches the root now, then rebuilds on the UI queue.
    ///
    /// With `retire_current` the creator is told to build a fresh instance.
    pub fn reload(&self, retire_current: bool) -> Result<()> {
        {
            let mut state = self.ui_lock()?;
            self.detach_root_locked(&mut state);
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner.dispatcher.post(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = (RuntimeHost { inner }).finish_reload(retire_current) {
                warn!(error = %e, "reload failed");
            }
        })
    }

    fn finish_reload(&self, retire_current: bool) -> Result<()> {
        let mut state = self.lock()?;
        if retire_current && state.instance.is_some() {
            if let Some(creator) = &state.creator {
                creator.mark_as_needs_reload();
            }
        }
        self.detach_instance_locked(&mut state);
        self.attach_root_locked(&mut state)
    }

    // ---- Instance notifications ----

    fn subscribe(&self, state: &mut HostState, instance: &Arc<dyn ScriptInstance>) {
        if !state.subscriptions.is_empty() {
            return;
        }
        for (kind, event) in SUBSCRIPTIONS {
            let handle = instance.register_callback(kind, self.event_callback(event));
            state.subscriptions.push(handle);
        }
    }

    fn event_callback(&self, event: HostEvent) -> InstanceCallback {
        let weak = Arc::downgrade(&self.inner);
        let dispatcher = self.inner.dispatcher.clone();
        Arc::new(move || {
            if let Err(e) = post_event(&dispatcher, weak.clone(), event) {
                trace!(error = %e, ?event, "notification dropped");
            }
        })
    }

    /// Queues `event` for handling on the UI thread. Callable from any thread.
    pub fn post_event(&self, event: HostEvent) -> Result<()> {
        post_event(&self.inner.dispatcher, Arc::downgrade(&self.inner), event)
    }

    fn handle_event(&self, event: HostEvent) {
        if event == HostEvent::LiveReload {
            if let Err(e) = self.reload(true) {
                warn!(error = %e, "live reload failed");
            }
            return;
        }

        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, ?event, "host state unavailable");
                return;
            }
        };
        let Some(instance) = state.instance.clone() else {
            trace!(?event, "no instance, notification ignored");
            return;
        };

        let in_error = instance.is_in_error();
        let waiting = instance.is_waiting_for_debugger();
        match event {
            HostEvent::InstanceError if in_error => {
                let message = instance.last_error_message();
                warn!(error = %message, "instance failed");
                self.apply_overlay(&mut state, Overlay::Error { message });
            }
            HostEvent::InstanceWaiting if waiting => {
                let desired = desired_overlay(in_error, waiting, &instance.last_error_message());
                self.apply_overlay(&mut state, desired);
            }
            HostEvent::DebuggerAttached if !in_error && !waiting => {
                self.apply_overlay(&mut state, Overlay::None);
            }
            _ => trace!(?event, "stale notification ignored"),
        }
    }

    fn apply_overlay(&self, state: &mut HostState, desired: Overlay) {
        if state.overlay == desired {
            return;
        }

        state.root.clear_content();
        state.developer_menu = None;
        match &desired {
            Overlay::None => {}
            Overlay::Error { message } => {
                let style = &self.inner.config.error_style;
                let panel = state
                    .error_panel
                    .get_or_insert_with(|| Panel::error(message, style.clone()));
                panel.set_error_message(message);
                state.root.append_content(UiElement::Panel(panel.clone()));
            }
            Overlay::Waiting => {
                let style = &self.inner.config.waiting_style;
                let panel = state
                    .waiting_panel
                    .get_or_insert_with(|| Panel::waiting(style.clone()));
                state.root.append_content(UiElement::Panel(panel.clone()));
            }
        }

        debug!(overlay = ?desired, "overlay changed");
        state.overlay = desired;
    }

    // ---- Developer menu ----

    /// Opens the developer menu if `pressed` is the wired chord.
    ///
    /// Returns true when the menu was opened by this call.
    pub fn handle_accelerator(&self, pressed: KeyChord) -> Result<bool> {
        let mut state = self.ui_lock()?;
        let Some(chord) = state.accelerator else {
            return Ok(false);
        };
        if !chord.matches(&pressed) || state.developer_menu.is_some() {
            return Ok(false);
        }

        let settings = state
            .instance
            .as_ref()
            .map(|instance| instance.settings())
            .unwrap_or_default();
        let menu = DeveloperMenu::new(&settings);
        state.root.append_content(UiElement::DeveloperMenu(menu.clone()));
        state.developer_menu = Some(menu);

        debug!("developer menu opened");
        Ok(true)
    }

    fn dismiss_menu(&self, state: &mut HostState) {
        if let Some(menu) = state.developer_menu.take() {
            state.root.remove_content(&UiElement::DeveloperMenu(menu));
        }
    }

    /// Dismisses the developer menu and applies `command`.
    pub fn invoke_menu_command(&self, command: DevMenuCommand) -> Result<()> {
        let (instance, creator) = {
            let mut state = self.ui_lock()?;
            self.dismiss_menu(&mut state);
            (state.instance.clone(), state.creator.clone())
        };
        info!(%command, "developer menu command");

        match command {
            DevMenuCommand::Cancel => Ok(()),
            DevMenuCommand::Reload => self.reload(true),
            DevMenuCommand::ToggleRemoteDebug => {
                if let (Some(instance), Some(creator)) = (&instance, &creator) {
                    creator.persist_use_web_debugger(!instance.settings().use_web_debugger);
                }
                self.reload(true)
            }
            DevMenuCommand::ToggleLiveReload => {
                if let (Some(instance), Some(creator)) = (&instance, &creator) {
                    creator.persist_use_live_reload(!instance.settings().use_live_reload);
                }
                self.reload(true)
            }
            DevMenuCommand::ToggleInspector => {
                if let Some(instance) = instance {
                    instance.call_function(
                        "RCTDeviceEventEmitter",
                        "emit",
                        json!(["toggleElementInspector", null]),
                    );
                }
                Ok(())
            }
        }
    }

    // ---- Focus ----

    /// Moves focus away from `element`.
    ///
    /// Panel roots get a focus harbor, inserted on first use.
    pub fn blur(&self, element: ElementId) -> Result<()> {
        let mut state = self.ui_lock()?;
        if state.root.is_panel() {
            if !state.focus_harbor {
                state.root.insert_focus_harbor();
                state.focus_harbor = true;
            }
            state.root.set_focus_harbor_tab_stop(true);
            state.root.try_focus(FocusTarget::Harbor);
        } else {
            state.root.try_focus(FocusTarget::Element(element));
        }
        Ok(())
    }

    /// Called by the toolkit when the focus harbor loses focus.
    ///
    /// The tab stop is cleared from the UI queue, so toolkits may call this
    /// synchronously from inside [`RootView::try_focus`].
    pub fn on_focus_harbor_lost_focus(&self) -> Result<()> {
        self.ensure_ui_thread()?;
        let weak = Arc::downgrade(&self.inner);
        self.inner.dispatcher.post(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = (RuntimeHost { inner }).clear_harbor_tab_stop() {
                warn!(error = %e, "focus harbor update failed");
            }
        })
    }

    fn clear_harbor_tab_stop(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.focus_harbor {
            state.root.set_focus_harbor_tab_stop(false);
        }
        Ok(())
    }

    // ---- Settings ----

    /// Sets the component to render. A live instance is marked stale.
    pub fn set_component_name(&self, name: impl Into<String>) -> Result<()> {
        let mut state = self.ui_lock()?;
        state.component_name = name.into();
        if let Some(instance) = &state.instance {
            instance.set_needs_reload();
        }
        Ok(())
    }

    /// Props passed to every attach, including those after a reload.
    pub fn set_initial_props(&self, props: Value) -> Result<()> {
        self.ui_lock()?.initial_props = props;
        Ok(())
    }

    pub fn set_instance_creator(&self, creator: Arc<dyn InstanceCreator>) -> Result<()> {
        self.ui_lock()?.creator = Some(creator);
        Ok(())
    }

    // ---- Accessors ----

    pub fn component_name(&self) -> Result<String> {
        Ok(self.lock()?.component_name.clone())
    }

    pub fn instance(&self) -> Result<Option<Arc<dyn ScriptInstance>>> {
        Ok(self.lock()?.instance.clone())
    }

    pub fn is_attached(&self) -> Result<bool> {
        Ok(self.lock()?.attached)
    }

    pub fn current_overlay(&self) -> Result<Overlay> {
        Ok(self.lock()?.overlay.clone())
    }

    pub fn is_developer_menu_showing(&self) -> Result<bool> {
        Ok(self.lock()?.developer_menu.is_some())
    }
}

fn post_event(dispatcher: &UiDispatcher, weak: Weak<HostInner>, event: HostEvent) -> Result<()> {
    dispatcher.post(move || {
        if let Some(inner) = weak.upgrade() {
            let host = RuntimeHost { inner };
            host.handle_event(event);
        }
    })
}

impl Drop for HostInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = &state.instance {
            for handle in state.subscriptions.drain(..) {
                instance.unregister_callback(handle);
            }
        }
    }
}
