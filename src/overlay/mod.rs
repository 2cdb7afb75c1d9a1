//! The transparent annotation layer: drawing, hit testing, hover and the
//! service that ties positioning to the state manager.

pub mod hover;
pub mod messages;
pub mod render;
pub mod service;
pub mod surface;

pub use hover::{
    DefaultPointerHook, HoverMonitor, MockPointerHook, MockPointerHookHandle, PointerEvent,
    PointerHookBackend,
};
pub use messages::{OverlayEvent, UpdateSummary};
pub use render::{DrawCommand, DrawList, RenderStyle};
pub use service::{ErrorOverlay, OverlayDeps, UpdateContext};
pub use surface::{
    NoopSurface, OverlaySurface, RecordingSurface, SurfaceBackend, SurfaceCall, SurfaceState,
};

#[cfg(windows)]
pub use crate::platform::win32::LayeredSurface;
