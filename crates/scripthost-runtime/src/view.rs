//! The UI node an instance renders into.

use std::sync::Arc;

use crate::instance::ScriptInstance;
use crate::menu::DeveloperMenu;
use crate::overlay::Panel;

/// Identifies an element inside the root view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Where programmatic focus should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// The zero-size helper placed ahead of the content.
    Harbor,
    /// An element, focused with pointer focus state.
    Element(ElementId),
}

/// Host-owned children of the root view.
#[derive(Debug, Clone, PartialEq)]
pub enum UiElement {
    Panel(Panel),
    DeveloperMenu(DeveloperMenu),
}

/// The toolkit side of a root view.
///
/// Only called on the UI thread, with the host's state locked. Methods must
/// not call back into the host synchronously, except for
/// [`RuntimeHost::on_focus_harbor_lost_focus`], which defers its work.
///
/// [`RuntimeHost::on_focus_harbor_lost_focus`]: crate::RuntimeHost::on_focus_harbor_lost_focus
pub trait RootView: Send {
    /// True when the root can hold the focus harbor ahead of its content.
    fn is_panel(&self) -> bool;

    /// Removes every child.
    fn clear_content(&mut self);

    /// Appends a host-owned child.
    fn append_content(&mut self, element: UiElement);

    /// Removes a host-owned child previously appended.
    fn remove_content(&mut self, element: &UiElement);

    /// Inserts the zero-size, non-tabbable focus harbor as first child.
    fn insert_focus_harbor(&mut self);

    fn set_focus_harbor_tab_stop(&mut self, tab_stop: bool);

    /// Requests focus. Returns false if the toolkit refused.
    fn try_focus(&mut self, target: FocusTarget) -> bool;

    /// Routes pointer and keyboard input to `instance`.
    fn install_input_handlers(&mut self, instance: Arc<dyn ScriptInstance>);

    fn remove_input_handlers(&mut self);
}
