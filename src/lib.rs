pub mod error;
pub mod geometry;
pub mod indicator;
pub mod logging;
pub mod model;
pub mod overlay;
pub mod platform;
pub mod resolver;
pub mod settings;
pub mod state;

pub use error::OverlayError;
pub use geometry::{BoundsValidator, CoordinateConverter, CoordinateSpace, Display, Point, ScreenRect};
pub use indicator::{IndicatorPositioner, IndicatorPreset};
pub use model::{AppId, ErrorRange, MonitoredElement, ReadabilityRange, StyleSuggestion};
pub use overlay::{ErrorOverlay, OverlayDeps, OverlayEvent, UpdateContext, UpdateSummary};
pub use resolver::{ParserRegistry, PositionResolver, PositionResult, Strategy};
pub use settings::Preferences;
pub use state::{AnnotationSnapshot, AnnotationStateManager};
