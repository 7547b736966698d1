//! Status overlays shown in place of the rendered content.

use crate::config::PanelStyle;

/// Prefix of the error overlay text.
pub const ERROR_HEADER: &str = "ERROR: Instance failed to start.\n\n";

/// Text of the waiting-for-debugger overlay.
pub const WAITING_TEXT: &str = "Connecting to remote debugger";

/// The root view's overlay slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Overlay {
    /// Nothing covers the content.
    #[default]
    None,
    /// The instance failed; shows its last error.
    Error { message: String },
    /// A remote debugger is expected.
    Waiting,
}

/// Picks the overlay for an instance state. An error wins over waiting.
pub fn desired_overlay(in_error: bool, waiting_for_debugger: bool, last_error: &str) -> Overlay {
    if in_error {
        Overlay::Error {
            message: last_error.to_string(),
        }
    } else if waiting_for_debugger {
        Overlay::Waiting
    } else {
        Overlay::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Error,
    Waiting,
}

/// A styled message panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub text: String,
    pub style: PanelStyle,
}

impl Panel {
    /// Builds the error panel for `message`.
    pub fn error(message: &str, style: PanelStyle) -> Self {
        Self {
            kind: PanelKind::Error,
            text: format!("{}{}", ERROR_HEADER, message),
            style,
        }
    }

    pub fn waiting(style: PanelStyle) -> Self {
        Self {
            kind: PanelKind::Waiting,
            text: WAITING_TEXT.to_string(),
            style,
        }
    }

    /// Replaces the error text, keeping the panel itself.
    pub(crate) fn set_error_message(&mut self, message: &str) {
        self.text = format!("{}{}", ERROR_HEADER, message);
    }
}
