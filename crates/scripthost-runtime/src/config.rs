//! Host configuration.

/// A key together with the modifiers that must be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    /// The key, compared case-insensitively.
    pub key: char,
    /// Control held.
    pub ctrl: bool,
    /// Shift held.
    pub shift: bool,
    /// Alt held.
    pub alt: bool,
}

impl KeyChord {
    /// A chord with no modifiers.
    pub fn new(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    /// Adds Control.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Adds Shift.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Adds Alt.
    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// True if `pressed` is this chord.
    pub fn matches(&self, pressed: &KeyChord) -> bool {
        self.key.eq_ignore_ascii_case(&pressed.key)
            && self.ctrl == pressed.ctrl
            && self.shift == pressed.shift
            && self.alt == pressed.alt
    }
}

/// A color with alpha first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argb(pub u8, pub u8, pub u8, pub u8);

impl Argb {
    /// Opaque white.
    pub const WHITE: Argb = Argb(0xff, 0xff, 0xff, 0xff);
}

/// Fixed look of an overlay panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelStyle {
    /// Panel background.
    pub background: Argb,
    /// Text color.
    pub foreground: Argb,
    /// Monospace font family.
    pub font_family: String,
    /// Uniform text margin.
    pub margin: f32,
    /// Pin the panel to the top instead of filling the root.
    pub align_top: bool,
}

impl PanelStyle {
    /// Style of the error panel.
    pub fn error() -> Self {
        Self {
            background: Argb(0xee, 0xcc, 0x00, 0x00),
            foreground: Argb::WHITE,
            font_family: "Consolas".to_string(),
            margin: 10.0,
            align_top: false,
        }
    }

    /// Style of the waiting-for-debugger panel.
    pub fn waiting() -> Self {
        Self {
            background: Argb(0xff, 0x03, 0x59, 0x00),
            align_top: true,
            ..Self::error()
        }
    }
}

/// Configuration for a runtime host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Chord that opens the developer menu.
    pub menu_chord: KeyChord,
    /// Error panel style.
    pub error_style: PanelStyle,
    /// Waiting panel style.
    pub waiting_style: PanelStyle,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            menu_chord: KeyChord::new('D').with_ctrl().with_shift(),
            error_style: PanelStyle::error(),
            waiting_style: PanelStyle::waiting(),
        }
    }
}

impl HostConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the developer menu chord.
    pub fn with_menu_chord(mut self, chord: KeyChord) -> Self {
        self.menu_chord = chord;
        self
    }

    /// Sets the error panel style.
    pub fn with_error_style(mut self, style: PanelStyle) -> Self {
        self.error_style = style;
        self
    }

    /// Sets the waiting panel style.
    pub fn with_waiting_style(mut self, style: PanelStyle) -> Self {
        self.waiting_style = style;
        self
    }
}
