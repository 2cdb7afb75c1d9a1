use crate::geometry::{Display, ScreenRect};
use crate::model::AppId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Plausibility limits for foreign-supplied rectangles.
///
/// The defaults were tuned against real applications rather than derived;
/// they stay configurable so they can be recalibrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub min_dimension: f64,
    pub max_width: f64,
    /// Rejects scrollback-sized rectangles misreported as one line.
    pub max_height: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub display_tolerance: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_dimension: 0.5,
            max_width: 5000.0,
            max_height: 500.0,
            min_aspect_ratio: 0.1,
            max_aspect_ratio: 100.0,
            display_tolerance: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("rectangle has non-finite components")]
    NonFinite,
    #[error("rectangle too small ({width}x{height})")]
    TooSmall { width: f64, height: f64 },
    #[error("rectangle too large ({width}x{height})")]
    TooLarge { width: f64, height: f64 },
    #[error("aspect ratio {0} out of range")]
    AspectRatio(f64),
    #[error("rectangle lies outside every display")]
    OffScreen,
    #[error("geometry reported by {0} is not trusted")]
    UntrustedApp(AppId),
}

#[derive(Debug, Clone, Default)]
pub struct BoundsValidator {
    thresholds: ValidationThresholds,
    denylist: HashSet<AppId>,
}

impl BoundsValidator {
    pub fn new(thresholds: ValidationThresholds) -> Self {
        Self {
            thresholds,
            denylist: HashSet::new(),
        }
    }

    pub fn with_denylist<I>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = AppId>,
    {
        self.denylist.extend(apps);
        self
    }

    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    pub fn is_denylisted(&self, app: &AppId) -> bool {
        self.denylist.contains(app)
    }

    /// `displays` must be expressed in the same space as `rect`.
    pub fn validate(
        &self,
        rect: &ScreenRect,
        app: Option<&AppId>,
        displays: &[Display],
        label: Option<&str>,
    ) -> Result<(), ValidationFailure> {
        let outcome = self.check(rect, app, displays);
        if let Err(ref failure) = outcome {
            tracing::debug!(
                label = label.unwrap_or("bounds"),
                ?rect,
                %failure,
                "bounds rejected"
            );
        }
        outcome
    }

    pub fn is_plausible(
        &self,
        rect: &ScreenRect,
        app: Option<&AppId>,
        displays: &[Display],
    ) -> bool {
        self.check(rect, app, displays).is_ok()
    }

    /// Normalize negative extents and clamp oversize ones, then re-validate.
    pub fn repair(
        &self,
        rect: &ScreenRect,
        app: Option<&AppId>,
        displays: &[Display],
        label: Option<&str>,
    ) -> Option<ScreenRect> {
        if !rect.is_finite() {
            return None;
        }
        let mut repaired = *rect;
        if repaired.width < 0.0 {
            repaired.x += repaired.width;
            repaired.width = -repaired.width;
        }
        if repaired.height < 0.0 {
            repaired.y += repaired.height;
            repaired.height = -repaired.height;
        }
        repaired.width = repaired.width.min(self.thresholds.max_width);
        repaired.height = repaired.height.min(self.thresholds.max_height);

        match self.validate(&repaired, app, displays, label) {
            Ok(()) => Some(repaired),
            Err(_) => None,
        }
    }

    fn check(
        &self,
        rect: &ScreenRect,
        app: Option<&AppId>,
        displays: &[Display],
    ) -> Result<(), ValidationFailure> {
        if let Some(app) = app {
            if self.denylist.contains(app) {
                return Err(ValidationFailure::UntrustedApp(app.clone()));
            }
        }
        if !rect.is_finite() {
            return Err(ValidationFailure::NonFinite);
        }

        let t = &self.thresholds;
        if rect.width < t.min_dimension || rect.height < t.min_dimension {
            return Err(ValidationFailure::TooSmall {
                width: rect.width,
                height: rect.height,
            });
        }
        if rect.width > t.max_width || rect.height > t.max_height {
            return Err(ValidationFailure::TooLarge {
                width: rect.width,
                height: rect.height,
            });
        }

        let aspect = rect.width / rect.height;
        if !(t.min_aspect_ratio..=t.max_aspect_ratio).contains(&aspect) {
            return Err(ValidationFailure::AspectRatio(aspect));
        }

        let center = rect.center();
        let on_screen = displays.iter().any(|display| {
            let expanded = display.frame.expanded(t.display_tolerance);
            expanded.intersects(rect) || expanded.contains(center)
        });
        if !on_screen {
            return Err(ValidationFailure::OffScreen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundsValidator, ValidationFailure, ValidationThresholds};
    use crate::geometry::{Display, ScreenRect};
    use crate::model::AppId;

    fn displays() -> Vec<Display> {
        vec![Display::new(
            ScreenRect::canonical(0.0, 0.0, 1440.0, 900.0),
            true,
        )]
    }

    fn validator() -> BoundsValidator {
        BoundsValidator::new(ValidationThresholds::default())
    }

    #[test]
    fn accepts_a_typical_word() {
        let rect = ScreenRect::canonical(200.0, 400.0, 48.0, 18.0);
        assert_eq!(validator().validate(&rect, None, &displays(), None), Ok(()));
    }

    #[test]
    fn rejects_sub_half_unit_dimensions() {
        let thin = ScreenRect::canonical(200.0, 400.0, 0.4, 18.0);
        let flat = ScreenRect::canonical(200.0, 400.0, 0.6, 0.49);
        assert!(matches!(
            validator().validate(&thin, None, &displays(), None),
            Err(ValidationFailure::TooSmall { .. })
        ));
        assert!(!validator().is_plausible(&flat, None, &displays()));
    }

    #[test]
    fn rejects_scrollback_sized_rect() {
        let rect = ScreenRect::canonical(0.0, 0.0, 1200.0, 2400.0);
        assert!(matches!(
            validator().validate(&rect, None, &displays(), Some("range")),
            Err(ValidationFailure::TooLarge { .. })
        ));
    }

    #[test]
    fn rejects_extreme_aspect_ratio() {
        let sliver = ScreenRect::canonical(10.0, 10.0, 4000.0, 20.0);
        assert!(matches!(
            validator().validate(&sliver, None, &displays(), None),
            Err(ValidationFailure::AspectRatio(_))
        ));
    }

    #[test]
    fn tolerance_band_around_display_is_accepted() {
        let near = ScreenRect::canonical(1500.0, 400.0, 40.0, 18.0);
        let far = ScreenRect::canonical(1600.0, 400.0, 40.0, 18.0);
        assert!(validator().is_plausible(&near, None, &displays()));
        assert_eq!(
            validator().validate(&far, None, &displays(), None),
            Err(ValidationFailure::OffScreen)
        );
    }

    #[test]
    fn rejects_nan_components() {
        let rect = ScreenRect::canonical(f64::NAN, 10.0, 40.0, 18.0);
        assert_eq!(
            validator().validate(&rect, None, &displays(), None),
            Err(ValidationFailure::NonFinite)
        );
    }

    #[test]
    fn denylisted_app_fails_with_valid_geometry() {
        let app = AppId::new("chrome.exe");
        let validator = validator().with_denylist([app.clone()]);
        let rect = ScreenRect::canonical(200.0, 400.0, 48.0, 18.0);
        assert_eq!(
            validator.validate(&rect, Some(&app), &displays(), None),
            Err(ValidationFailure::UntrustedApp(app))
        );
        assert!(validator.is_plausible(&rect, Some(&AppId::new("notepad.exe")), &displays()));
    }

    #[test]
    fn repair_flips_negative_extent() {
        let rect = ScreenRect::canonical(248.0, 418.0, -48.0, -18.0);
        let repaired = validator()
            .repair(&rect, None, &displays(), None)
            .expect("repairable");
        assert_eq!(repaired, ScreenRect::canonical(200.0, 400.0, 48.0, 18.0));
    }

    #[test]
    fn repair_clamps_height_then_revalidates() {
        let rect = ScreenRect::canonical(100.0, 100.0, 300.0, 900.0);
        let repaired = validator()
            .repair(&rect, None, &displays(), None)
            .expect("clamped rect passes");
        assert_eq!(repaired.height, 500.0);

        let offscreen = ScreenRect::canonical(-9000.0, 100.0, -20.0, 18.0);
        assert_eq!(validator().repair(&offscreen, None, &displays(), None), None);
    }
}
