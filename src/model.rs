use crate::geometry::ScreenRect;
use crate::platform::ElementHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Identifier of the application that owns monitored text.
///
/// On Windows this is the lowercased executable file name (`chrome.exe`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }

    pub fn to_rgba_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

pub const NEUTRAL_COLOR: Color = Color::rgba(128, 128, 128, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Spelling,
    Grammar,
    Punctuation,
    Style,
    Formatting,
    Typo,
    Capitalization,
    Readability,
    Other,
}

impl ErrorCategory {
    /// Unrecognized engine categories become [`ErrorCategory::Other`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "SPELLING" => Self::Spelling,
            "GRAMMAR" | "AGREEMENT" | "WORDCHOICE" | "WORD_CHOICE" => Self::Grammar,
            "PUNCTUATION" => Self::Punctuation,
            "STYLE" | "REPETITION" | "REDUNDANCY" => Self::Style,
            "FORMATTING" => Self::Formatting,
            "TYPO" => Self::Typo,
            "CAPITALIZATION" => Self::Capitalization,
            "READABILITY" => Self::Readability,
            _ => Self::Other,
        }
    }

    /// Which category survives when two errors cover the same span.
    pub fn priority(self) -> u8 {
        match self {
            Self::Grammar => 10,
            Self::Spelling => 9,
            Self::Punctuation => 8,
            Self::Style => 7,
            Self::Formatting => 6,
            Self::Typo => 5,
            Self::Capitalization => 4,
            Self::Readability => 3,
            Self::Other => 1,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Spelling | Self::Typo => Color::rgba(230, 57, 70, 255),
            Self::Grammar | Self::Capitalization => Color::rgba(244, 162, 97, 255),
            Self::Punctuation | Self::Formatting => Color::rgba(69, 123, 157, 255),
            Self::Style => Color::rgba(114, 9, 183, 255),
            Self::Readability => Color::rgba(42, 157, 143, 255),
            Self::Other => NEUTRAL_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Self::Error => 3,
            Self::Warning => 2,
            Self::Info => 1,
        }
    }
}

/// One detected problem as a half-open character interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRange {
    pub start: usize,
    pub end: usize,
    pub category: ErrorCategory,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ErrorRange {
    pub fn new(start: usize, end: usize, category: &str) -> Self {
        Self {
            start,
            end,
            category: ErrorCategory::parse(category),
            severity: Severity::default(),
            message: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Rewrite proposed by the style analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSuggestion {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub suggested: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub confidence: f32,
}

impl StyleSuggestion {
    pub fn as_error_range(&self) -> ErrorRange {
        ErrorRange {
            start: self.start,
            end: self.end,
            category: ErrorCategory::Style,
            severity: Severity::Info,
            message: self.explanation.clone(),
            suggestions: vec![self.suggested.clone()],
        }
    }
}

/// Sentence flagged as hard to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityRange {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub label: String,
}

impl ReadabilityRange {
    pub fn as_error_range(&self) -> ErrorRange {
        ErrorRange {
            start: self.start,
            end: self.end,
            category: ErrorCategory::Readability,
            severity: Severity::Info,
            message: self.label.clone(),
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Grammar,
    Style,
    Readability,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationSource {
    Error(ErrorRange),
    Style(StyleSuggestion),
    Readability(ReadabilityRange),
}

impl AnnotationSource {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Error(_) => AnnotationKind::Grammar,
            Self::Style(_) => AnnotationKind::Style,
            Self::Readability(_) => AnnotationKind::Readability,
        }
    }

    /// Text shown in the popup for this annotation.
    pub fn message(&self) -> &str {
        match self {
            Self::Error(error) => &error.message,
            Self::Style(style) => &style.explanation,
            Self::Readability(range) => &range.label,
        }
    }

    pub fn span(&self) -> (usize, usize) {
        match self {
            Self::Error(error) => error.span(),
            Self::Style(style) => (style.start, style.end),
            Self::Readability(range) => (range.start, range.end),
        }
    }
}

/// One visual underline: exact draw rectangle plus an enlarged target.
///
/// Both rectangles are in overlay-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub hit_bounds: ScreenRect,
    pub draw_bounds: ScreenRect,
    pub color_category: ErrorCategory,
    pub source: AnnotationSource,
}

impl AnnotationRecord {
    /// Identity used across wholesale list rebuilds.
    pub fn key(&self) -> (AnnotationKind, usize, usize) {
        let (start, end) = self.source.span();
        (self.source.kind(), start, end)
    }
}

/// Foreign text element for the duration of one call.
///
/// Borrowed, never stored: the overlay must not extend the element's lifetime.
#[derive(Clone, Copy)]
pub struct MonitoredElement<'a> {
    pub handle: &'a dyn ElementHandle,
    pub pid: u32,
    pub text: Option<&'a str>,
}

impl<'a> MonitoredElement<'a> {
    pub fn new(handle: &'a dyn ElementHandle, pid: u32) -> Self {
        Self {
            handle,
            pid,
            text: None,
        }
    }

    pub fn with_text(mut self, text: &'a str) -> Self {
        self.text = Some(text);
        self
    }
}

impl fmt::Debug for MonitoredElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoredElement")
            .field("pid", &self.pid)
            .field("text_len", &self.text.map(str::len))
            .finish()
    }
}

/// Keep one error per exact span, preferring the higher-priority category and
/// then the higher severity. Output is ordered by start offset.
pub fn deduplicate_overlapping(errors: &[ErrorRange]) -> Vec<ErrorRange> {
    let mut kept: Vec<ErrorRange> = Vec::with_capacity(errors.len());
    for error in errors {
        match kept.iter_mut().find(|e| e.span() == error.span()) {
            Some(existing) => {
                let better = (error.category.priority(), error.severity.rank())
                    > (existing.category.priority(), existing.severity.rank());
                if better {
                    *existing = error.clone();
                }
            }
            None => kept.push(error.clone()),
        }
    }
    kept.sort_by_key(|e| (e.start, e.end));
    kept
}
