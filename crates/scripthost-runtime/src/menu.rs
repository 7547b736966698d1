//! Developer menu model.

use std::fmt;

use crate::instance::InstanceSettings;

pub const MENU_TITLE: &str = "Developer Menu";

/// Commands offered by the developer menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevMenuCommand {
    Reload,
    ToggleRemoteDebug,
    ToggleLiveReload,
    ToggleInspector,
    Cancel,
}

impl DevMenuCommand {
    /// Every command in menu order.
    pub const ALL: [DevMenuCommand; 5] = [
        DevMenuCommand::Reload,
        DevMenuCommand::ToggleRemoteDebug,
        DevMenuCommand::ToggleLiveReload,
        DevMenuCommand::ToggleInspector,
        DevMenuCommand::Cancel,
    ];

    /// Menu label, reflecting the current settings for the toggles.
    pub fn label(&self, settings: &InstanceSettings) -> &'static str {
        match self {
            DevMenuCommand::Reload => "Reload Javascript",
            DevMenuCommand::ToggleRemoteDebug if settings.use_web_debugger => {
                "Disable Remote JS Debugging"
            }
            DevMenuCommand::ToggleRemoteDebug => "Enable Remote JS Debugging",
            DevMenuCommand::ToggleLiveReload if settings.use_live_reload => "Disable Live Reload",
            DevMenuCommand::ToggleLiveReload => "Enable Live Reload",
            DevMenuCommand::ToggleInspector => "Toggle Inspector",
            DevMenuCommand::Cancel => "Cancel",
        }
    }
}

impl fmt::Display for DevMenuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevMenuCommand::Reload => write!(f, "reload"),
            DevMenuCommand::ToggleRemoteDebug => write!(f, "toggle-remote-debug"),
            DevMenuCommand::ToggleLiveReload => write!(f, "toggle-live-reload"),
            DevMenuCommand::ToggleInspector => write!(f, "toggle-inspector"),
            DevMenuCommand::Cancel => write!(f, "cancel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub command: DevMenuCommand,
    pub label: String,
}

/// The menu overlay as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperMenu {
    pub title: String,
    pub items: Vec<MenuItem>,
}

impl DeveloperMenu {
    /// Builds the menu for the given settings.
    pub fn new(settings: &InstanceSettings) -> Self {
        Self {
            title: MENU_TITLE.to_string(),
            items: DevMenuCommand::ALL
                .iter()
                .map(|&command| MenuItem {
                    command,
                    label: command.label(settings).to_string(),
                })
                .collect(),
        }
    }

    /// Looks up the label shown for `command`.
    pub fn label_of(&self, command: DevMenuCommand) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.command == command)
            .map(|item| item.label.as_str())
    }
}
