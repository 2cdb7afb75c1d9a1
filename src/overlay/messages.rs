use crate::geometry::{Point, ScreenRect};
use crate::model::{AnnotationKind, AnnotationRecord};

/// Notifications sent from the overlay to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    HoverBegan {
        annotation: AnnotationRecord,
        kind: AnnotationKind,
        index: usize,
        /// Canonical space; center of the annotation's draw rectangle.
        anchor: Point,
        /// Frame of the foreign window, window-manager space.
        window_frame: Option<ScreenRect>,
    },
    HoverEnded,
    Clicked {
        annotation: AnnotationRecord,
        kind: AnnotationKind,
        index: usize,
        anchor: Point,
    },
}

/// What `update` did, for callers that want to log or assert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateSummary {
    pub annotations: usize,
    pub unresolved: usize,
    pub refused: bool,
    pub visible: bool,
}
