//! Runtime host for scripthost.
//!
//! This crate binds a script-engine instance to a root view owned by a
//! single UI thread:
//! - `UiDispatcher` - the UI thread and its FIFO work queue
//! - `RuntimeHost` - attach/detach/reload state machine with status overlays
//! - `DeveloperMenu` - keyboard-gated menu of developer commands
//! - `ScriptInstance` / `InstanceCreator` - seams to the engine
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use scripthost_runtime::{HostConfig, InstanceCreator, RootView, RuntimeHost, UiDispatcher};
//!
//! fn run(root: Box<dyn RootView>, creator: Arc<dyn InstanceCreator>) -> scripthost_runtime::Result<()> {
//!     let (ui, _thread) = UiDispatcher::spawn("ui")?;
//!     let host = RuntimeHost::new(ui.clone(), root, HostConfig::default());
//!
//!     ui.invoke(move || {
//!         host.set_instance_creator(creator)?;
//!         host.attach_root()
//!     })?
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod instance;
pub mod menu;
pub mod overlay;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Argb, HostConfig, KeyChord, PanelStyle};
pub use dispatcher::{UiDispatcher, UiThread};
pub use error::{HostError, Result};
pub use host::{HostEvent, RuntimeHost};
pub use instance::{
    CallbackKind, CallbackRegistry, InstanceCallback, InstanceCreator, InstanceSettings,
    RootViewId, ScriptInstance, SubscriptionHandle,
};
pub use menu::{DevMenuCommand, DeveloperMenu, MenuItem};
pub use overlay::{desired_overlay, Overlay, Panel, PanelKind};
pub use view::{ElementId, FocusTarget, RootView, UiElement};
