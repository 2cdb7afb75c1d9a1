use crate::geometry::ValidationThresholds;
use crate::indicator::IndicatorPreset;
use crate::resolver::FallbackMetrics;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

const MIN_UNDERLINE_THICKNESS: f64 = 1.0;
const MAX_UNDERLINE_THICKNESS: f64 = 8.0;

fn default_underline_thickness() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_hover_tint() -> u8 {
    48
}

fn default_locked_tint() -> u8 {
    80
}

/// Outlines drawn over the overlay to diagnose placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOverlaySettings {
    pub show_raw_bounds: bool,
    pub show_validated_bounds: bool,
    pub show_converted_bounds: bool,
}

impl DebugOverlaySettings {
    pub fn any(&self) -> bool {
        self.show_raw_bounds || self.show_validated_bounds || self.show_converted_bounds
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_underline_thickness")]
    pub underline_thickness: f64,
    #[serde(default)]
    pub indicator_position: IndicatorPreset,
    #[serde(default = "default_true")]
    pub click_through: bool,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub debug: DebugOverlaySettings,
    #[serde(default)]
    pub thresholds: ValidationThresholds,
    #[serde(default)]
    pub fallback: FallbackMetrics,
    #[serde(default = "default_hover_tint")]
    pub hover_tint: u8,
    #[serde(default = "default_locked_tint")]
    pub locked_tint: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            underline_thickness: default_underline_thickness(),
            indicator_position: IndicatorPreset::default(),
            click_through: true,
            debug_logging: false,
            debug: DebugOverlaySettings::default(),
            thresholds: ValidationThresholds::default(),
            fallback: FallbackMetrics::default(),
            hover_tint: default_hover_tint(),
            locked_tint: default_locked_tint(),
        }
    }
}

impl Preferences {
    /// Pull out-of-range values back to defaults. Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();

        if !self.underline_thickness.is_finite() {
            self.underline_thickness = default_underline_thickness();
        }
        self.underline_thickness = self
            .underline_thickness
            .clamp(MIN_UNDERLINE_THICKNESS, MAX_UNDERLINE_THICKNESS);

        let defaults = ValidationThresholds::default();
        let t = &mut self.thresholds;
        let positive = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        t.min_dimension = positive(t.min_dimension, defaults.min_dimension);
        t.max_width = positive(t.max_width, defaults.max_width);
        t.max_height = positive(t.max_height, defaults.max_height);
        t.min_aspect_ratio = positive(t.min_aspect_ratio, defaults.min_aspect_ratio);
        t.max_aspect_ratio = positive(t.max_aspect_ratio, defaults.max_aspect_ratio);
        if t.min_aspect_ratio > t.max_aspect_ratio {
            t.min_aspect_ratio = defaults.min_aspect_ratio;
            t.max_aspect_ratio = defaults.max_aspect_ratio;
        }
        if !t.display_tolerance.is_finite() || t.display_tolerance < 0.0 {
            t.display_tolerance = defaults.display_tolerance;
        }

        let fallback = FallbackMetrics::default();
        let f = &mut self.fallback;
        f.average_glyph_width = positive(f.average_glyph_width, fallback.average_glyph_width);
        f.line_height = positive(f.line_height, fallback.line_height);
        f.synthetic_element_width =
            positive(f.synthetic_element_width, fallback.synthetic_element_width);
        f.synthetic_element_height =
            positive(f.synthetic_element_height, fallback.synthetic_element_height);
        for confidence in [
            &mut f.fixed_width_confidence,
            &mut f.cursor_confidence,
            &mut f.min_confidence,
        ] {
            *confidence = if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                fallback.min_confidence
            };
        }

        *self != before
    }
}

pub fn preferences_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(PREFERENCES_FILE_NAME))
}

pub fn resolve_preferences_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    preferences_path_from_exe_path(&exe_path)
}

pub fn load() -> Result<Preferences> {
    load_from_path(&resolve_preferences_path()?)
}

pub fn save(preferences: &Preferences) -> Result<PathBuf> {
    let path = resolve_preferences_path()?;
    save_to_path(&path, preferences)?;
    Ok(path)
}

pub fn load_from_path(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read preferences file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Preferences::default());
    }

    let mut loaded: Preferences = serde_json::from_str(&content)
        .with_context(|| format!("deserialize preferences file {}", path.display()))?;
    loaded.sanitize();
    Ok(loaded)
}

pub fn save_to_path(path: &Path, preferences: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create preferences parent folder {}", parent.display()))?;
    }

    let mut sanitized = preferences.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize preferences")?;
    std::fs::write(path, json)
        .with_context(|| format!("write preferences file {}", path.display()))
}
