use crate::model::{AppId, MonitoredElement};
use crate::resolver::PositionResult;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

/// Inputs for app-specific position estimation.
#[derive(Debug, Clone)]
pub struct AdjustRequest<'a> {
    pub element: &'a MonitoredElement<'a>,
    pub range: Range<usize>,
    /// Text between the nearest preceding line break and the error.
    pub text_before_on_line: &'a str,
    pub error_text: &'a str,
    pub full_text: &'a str,
}

/// Horizontal estimate relative to the element's left edge (after padding).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsEstimate {
    pub offset: f64,
    pub width: f64,
    pub confidence: f64,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundsAdjustment {
    Estimate(BoundsEstimate),
    /// No opinion; the resolver moves on to the next strategy.
    Decline,
    /// Layout is unknowable; the whole overlay is suppressed for this update.
    Refuse { reason: String },
}

/// Per-application layout knowledge.
pub trait ContentParser: Send + Sync {
    fn parser_name(&self) -> &str;

    fn disables_visual_underlines(&self) -> bool {
        false
    }

    /// Horizontal inset between the element frame and the first glyph.
    fn left_padding(&self) -> f64 {
        0.0
    }

    /// Hosts whose accessibility geometry is well-formed but misplaced.
    fn untrusted_geometry(&self) -> bool {
        false
    }

    /// Full position override; `None` leaves the standard strategy chain in charge.
    fn resolve_position(
        &self,
        _range: Range<usize>,
        _element: &MonitoredElement<'_>,
        _full_text: &str,
    ) -> Option<PositionResult> {
        None
    }

    fn adjust_bounds(&self, _request: &AdjustRequest<'_>) -> BoundsAdjustment {
        BoundsAdjustment::Decline
    }
}

#[derive(Debug, Clone)]
pub struct GenericParser;

impl ContentParser for GenericParser {
    fn parser_name(&self) -> &str {
        "generic"
    }
}

/// Estimates glyph advances from a proportional-font width table.
#[derive(Debug, Clone)]
pub struct ProportionalParser {
    name: String,
    font_size: f64,
    left_padding: f64,
    refuse_wrapped_lines: bool,
}

impl ProportionalParser {
    pub fn new(name: impl Into<String>, font_size: f64, left_padding: f64) -> Self {
        Self {
            name: name.into(),
            font_size,
            left_padding,
            refuse_wrapped_lines: false,
        }
    }

    /// Refuse instead of guessing when the estimate runs past the element edge.
    pub fn refusing_wrapped_lines(mut self) -> Self {
        self.refuse_wrapped_lines = true;
        self
    }

    pub fn measure(&self, text: &str) -> f64 {
        text.chars().map(glyph_em).sum::<f64>() * self.font_size
    }
}

fn glyph_em(c: char) -> f64 {
    match c {
        '\t' => 1.12,
        'i' | 'l' | 'j' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' | '`' | ' ' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | '"' => 0.36,
        'm' | 'w' | 'M' | 'W' => 0.85,
        'A'..='Z' => 0.66,
        c if c.is_ascii() => 0.52,
        c if ('\u{1100}'..='\u{115F}').contains(&c)
            || ('\u{2E80}'..='\u{A4CF}').contains(&c)
            || ('\u{AC00}'..='\u{D7A3}').contains(&c)
            || ('\u{FF00}'..='\u{FF60}').contains(&c) =>
        {
            1.0
        }
        _ => 0.55,
    }
}

impl ContentParser for ProportionalParser {
    fn parser_name(&self) -> &str {
        &self.name
    }

    fn left_padding(&self) -> f64 {
        self.left_padding
    }

    fn untrusted_geometry(&self) -> bool {
        true
    }

    fn adjust_bounds(&self, request: &AdjustRequest<'_>) -> BoundsAdjustment {
        let Some(frame) = request.element.handle.frame() else {
            return BoundsAdjustment::Decline;
        };
        let offset = self.measure(request.text_before_on_line);
        let width = self.measure(request.error_text).max(self.font_size * 0.5);

        if self.refuse_wrapped_lines && self.left_padding + offset + width > frame.width {
            return BoundsAdjustment::Refuse {
                reason: format!(
                    "estimated extent {:.0} exceeds element width {:.0}",
                    self.left_padding + offset + width,
                    frame.width
                ),
            };
        }

        let ascii = request.text_before_on_line.is_ascii() && request.error_text.is_ascii();
        BoundsAdjustment::Estimate(BoundsEstimate {
            offset,
            width,
            confidence: if ascii { 0.8 } else { 0.6 },
            note: format!("{} width table", self.name),
        })
    }
}

/// Hosts where underlines cannot be drawn reliably at all.
#[derive(Debug, Clone)]
pub struct TerminalParser;

impl ContentParser for TerminalParser {
    fn parser_name(&self) -> &str {
        "terminal"
    }

    fn disables_visual_underlines(&self) -> bool {
        true
    }
}

const CHROMIUM_APPS: &[&str] = &[
    "chrome.exe",
    "msedge.exe",
    "brave.exe",
    "opera.exe",
    "vivaldi.exe",
];
const ELECTRON_APPS: &[&str] = &[
    "slack.exe",
    "discord.exe",
    "ms-teams.exe",
    "teams.exe",
    "notion.exe",
    "obsidian.exe",
    "code.exe",
];
const TERMINAL_APPS: &[&str] = &[
    "windowsterminal.exe",
    "conhost.exe",
    "cmd.exe",
    "powershell.exe",
    "pwsh.exe",
    "wezterm-gui.exe",
    "alacritty.exe",
];

/// Typed lookup from application identifier to its content parser.
pub struct ParserRegistry {
    parsers: HashMap<AppId, Arc<dyn ContentParser>>,
    fallback: Arc<dyn ContentParser>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            fallback: Arc::new(GenericParser),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let chromium: Arc<dyn ContentParser> = Arc::new(ProportionalParser::new("chromium", 14.0, 8.0));
        let firefox: Arc<dyn ContentParser> = Arc::new(ProportionalParser::new("firefox", 14.0, 6.0));
        let electron: Arc<dyn ContentParser> =
            Arc::new(ProportionalParser::new("electron", 15.0, 12.0).refusing_wrapped_lines());
        let terminal: Arc<dyn ContentParser> = Arc::new(TerminalParser);

        for app in CHROMIUM_APPS {
            registry.register(AppId::new(app), Arc::clone(&chromium));
        }
        registry.register(AppId::new("firefox.exe"), firefox);
        for app in ELECTRON_APPS {
            registry.register(AppId::new(app), Arc::clone(&electron));
        }
        for app in TERMINAL_APPS {
            registry.register(AppId::new(app), Arc::clone(&terminal));
        }
        registry
    }

    pub fn register(&mut self, app: AppId, parser: Arc<dyn ContentParser>) {
        self.parsers.insert(app, parser);
    }

    pub fn parser_for(&self, app: Option<&AppId>) -> &Arc<dyn ContentParser> {
        app.and_then(|app| self.parsers.get(app))
            .unwrap_or(&self.fallback)
    }

    /// Apps whose range geometry the bounds validator must always reject.
    pub fn untrusted_apps(&self) -> HashSet<AppId> {
        self.parsers
            .iter()
            .filter(|(_, parser)| parser.untrusted_geometry())
            .map(|(app, _)| app.clone())
            .collect()
    }
}
