//! Global pointer tracking for a click-through surface.
//!
//! The hook backend delivers events on its own thread; they cross an mpsc
//! channel and are only applied when the interaction thread calls `pump`.

use crate::geometry::Point;
use crate::model::AnnotationKind;
use crate::overlay::surface::OverlaySurface;
use crate::state::AnnotationSnapshot;
use anyhow::anyhow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Pointer activity in window-manager space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved(Point),
    LeftDown(Point),
    LeftUp(Point),
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            Self::Moved(point) | Self::LeftDown(point) | Self::LeftUp(point) => point,
        }
    }
}

pub trait PointerHookBackend: Send {
    fn install(&mut self, sender: Sender<PointerEvent>) -> anyhow::Result<()>;
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

#[cfg(windows)]
pub use crate::platform::win32::DefaultPointerHook;

#[cfg(not(windows))]
#[derive(Default)]
pub struct DefaultPointerHook;

#[cfg(not(windows))]
impl PointerHookBackend for DefaultPointerHook {
    fn install(&mut self, _sender: Sender<PointerEvent>) -> anyhow::Result<()> {
        Err(anyhow!("pointer hooks are not supported on this platform"))
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}

#[derive(Clone)]
pub struct MockPointerHook {
    state: Arc<MockHookState>,
}

#[derive(Default)]
struct MockHookState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    sender: Mutex<Option<Sender<PointerEvent>>>,
}

impl MockPointerHook {
    pub fn new() -> (Self, MockPointerHookHandle) {
        let state = Arc::new(MockHookState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockPointerHookHandle { state },
        )
    }
}

impl PointerHookBackend for MockPointerHook {
    fn install(&mut self, sender: Sender<PointerEvent>) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sender);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

pub struct MockPointerHookHandle {
    state: Arc<MockHookState>,
}

impl MockPointerHookHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    pub fn is_installed(&self) -> bool {
        self.state
            .sender
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Deliver an event as the OS hook would. False when not installed.
    pub fn emit(&self, event: PointerEvent) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(event).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Identity of a hovered annotation across snapshot replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverMatch {
    pub kind: AnnotationKind,
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    Unchanged,
    Began(HoverMatch),
    Ended,
}

#[derive(Debug, Default)]
pub struct HoverTracker {
    current: Option<HoverMatch>,
}

impl HoverTracker {
    pub fn current(&self) -> Option<HoverMatch> {
        self.current
    }

    /// `local` is `None` when the pointer is outside the surface.
    pub fn track(&mut self, local: Option<Point>, snapshot: &AnnotationSnapshot) -> HoverChange {
        let hit = local.and_then(|local| {
            let (kind, index) = OverlaySurface::hit_test(snapshot, local)?;
            let record = snapshot.list(kind).get(index)?;
            let (_, start, end) = record.key();
            Some(HoverMatch {
                kind,
                index,
                start,
                end,
            })
        });

        match (self.current, hit) {
            (None, None) => HoverChange::Unchanged,
            (Some(_), None) => {
                self.current = None;
                HoverChange::Ended
            }
            (Some(current), Some(hit))
                if (current.kind, current.start, current.end) == (hit.kind, hit.start, hit.end) =>
            {
                // Same annotation; its index may have moved after a rebuild.
                self.current = Some(hit);
                HoverChange::Unchanged
            }
            (_, Some(hit)) => {
                self.current = Some(hit);
                HoverChange::Began(hit)
            }
        }
    }

    /// Forget the current match. Returns whether one was active.
    pub fn reset(&mut self) -> bool {
        self.current.take().is_some()
    }
}

/// Owns the pointer hook: installed while the surface is visible.
pub struct HoverMonitor {
    backend: Box<dyn PointerHookBackend>,
    sender: Sender<PointerEvent>,
    receiver: Receiver<PointerEvent>,
    tracker: HoverTracker,
}

impl HoverMonitor {
    pub fn new(backend: Box<dyn PointerHookBackend>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            backend,
            sender,
            receiver,
            tracker: HoverTracker::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.backend.is_installed()
    }

    pub fn start(&mut self) {
        if self.backend.is_installed() {
            return;
        }
        match self.backend.install(self.sender.clone()) {
            Ok(()) => debug!("pointer hook installed"),
            Err(err) => warn!(?err, "failed to install pointer hook"),
        }
    }

    /// Uninstall the hook and drop queued events. Returns whether a hover was active.
    pub fn stop(&mut self) -> bool {
        if self.backend.is_installed() {
            match self.backend.uninstall() {
                Ok(()) => debug!("pointer hook uninstalled"),
                Err(err) => warn!(?err, "failed to uninstall pointer hook"),
            }
        }
        while self.receiver.try_recv().is_ok() {}
        self.tracker.reset()
    }

    pub fn current(&self) -> Option<HoverMatch> {
        self.tracker.current()
    }

    /// Drain events queued by the hook thread.
    pub fn pump(&mut self) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    pub fn track(&mut self, local: Option<Point>, snapshot: &AnnotationSnapshot) -> HoverChange {
        self.tracker.track(local, snapshot)
    }

    pub fn reset(&mut self) -> bool {
        self.tracker.reset()
    }
}

impl Drop for HoverMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
