//! Single-writer store for the render snapshot.
//!
//! Readers clone the `Arc` and keep a consistent view while the writer
//! swaps in a new snapshot.

use crate::error::OverlayError;
use crate::model::{AnnotationKind, AnnotationRecord};
use std::sync::Arc;
use tracing::warn;

/// Immutable view of everything the overlay draws.
///
/// Every present index is valid for its list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSnapshot {
    pub grammar: Vec<AnnotationRecord>,
    pub style: Vec<AnnotationRecord>,
    pub readability: Vec<AnnotationRecord>,
    pub hovered_grammar_idx: Option<usize>,
    pub hovered_style_idx: Option<usize>,
    pub hovered_readability_idx: Option<usize>,
    /// Index into `grammar`.
    pub locked_highlight_idx: Option<usize>,
}

impl AnnotationSnapshot {
    pub fn has_content(&self) -> bool {
        !self.grammar.is_empty() || !self.style.is_empty() || !self.readability.is_empty()
    }

    pub fn total(&self) -> usize {
        self.grammar.len() + self.style.len() + self.readability.len()
    }

    pub fn list(&self, kind: AnnotationKind) -> &[AnnotationRecord] {
        match kind {
            AnnotationKind::Grammar => &self.grammar,
            AnnotationKind::Style => &self.style,
            AnnotationKind::Readability => &self.readability,
        }
    }

    pub fn hovered(&self, kind: AnnotationKind) -> Option<usize> {
        match kind {
            AnnotationKind::Grammar => self.hovered_grammar_idx,
            AnnotationKind::Style => self.hovered_style_idx,
            AnnotationKind::Readability => self.hovered_readability_idx,
        }
    }

    pub fn hovered_record(&self, kind: AnnotationKind) -> Option<&AnnotationRecord> {
        self.hovered(kind).and_then(|idx| self.list(kind).get(idx))
    }

    pub fn locked_record(&self) -> Option<&AnnotationRecord> {
        self.locked_highlight_idx
            .and_then(|idx| self.grammar.get(idx))
    }

    /// Grammar, then style, then readability, with each record's kind and index.
    pub fn iter_all(&self) -> impl Iterator<Item = (AnnotationKind, usize, &AnnotationRecord)> {
        let grammar = self
            .grammar
            .iter()
            .enumerate()
            .map(|(idx, record)| (AnnotationKind::Grammar, idx, record));
        let style = self
            .style
            .iter()
            .enumerate()
            .map(|(idx, record)| (AnnotationKind::Style, idx, record));
        let readability = self
            .readability
            .iter()
            .enumerate()
            .map(|(idx, record)| (AnnotationKind::Readability, idx, record));
        grammar.chain(style).chain(readability)
    }

    /// Compared by list lengths and indices only.
    pub fn observably_equal(&self, other: &AnnotationSnapshot) -> bool {
        self.grammar.len() == other.grammar.len()
            && self.style.len() == other.style.len()
            && self.readability.len() == other.readability.len()
            && self.hovered_grammar_idx == other.hovered_grammar_idx
            && self.hovered_style_idx == other.hovered_style_idx
            && self.hovered_readability_idx == other.hovered_readability_idx
            && self.locked_highlight_idx == other.locked_highlight_idx
    }

    fn check_invariants(&self) -> Result<(), OverlayError> {
        let checks = [
            ("hovered grammar", self.hovered_grammar_idx, self.grammar.len()),
            ("hovered style", self.hovered_style_idx, self.style.len()),
            (
                "hovered readability",
                self.hovered_readability_idx,
                self.readability.len(),
            ),
            ("locked highlight", self.locked_highlight_idx, self.grammar.len()),
        ];
        for (name, idx, len) in checks {
            if let Some(idx) = idx {
                if idx >= len {
                    return Err(OverlayError::InvariantViolation(format!(
                        "{name} index {idx} out of range for {len} records"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn surviving(idx: Option<usize>, len: usize) -> Option<usize> {
    idx.filter(|idx| *idx < len)
}

#[derive(Debug, Default)]
pub struct AnnotationStateManager {
    snapshot: Arc<AnnotationSnapshot>,
}

impl AnnotationStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<AnnotationSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn has_content(&self) -> bool {
        self.snapshot.has_content()
    }

    /// Replace all three lists. Returns whether anything observable changed.
    pub fn update_all(
        &mut self,
        grammar: Vec<AnnotationRecord>,
        style: Vec<AnnotationRecord>,
        readability: Vec<AnnotationRecord>,
    ) -> bool {
        let current = &self.snapshot;
        let next = AnnotationSnapshot {
            hovered_grammar_idx: surviving(current.hovered_grammar_idx, grammar.len()),
            hovered_style_idx: surviving(current.hovered_style_idx, style.len()),
            hovered_readability_idx: surviving(
                current.hovered_readability_idx,
                readability.len(),
            ),
            locked_highlight_idx: surviving(current.locked_highlight_idx, grammar.len()),
            grammar,
            style,
            readability,
        };
        self.replace(next)
    }

    /// Drop grammar underlines, keeping style and readability.
    pub fn clear_grammar_underlines(&mut self) -> bool {
        let style = self.snapshot.style.clone();
        let readability = self.snapshot.readability.clone();
        self.update_all(Vec::new(), style, readability)
    }

    pub fn clear_style_underlines(&mut self) -> bool {
        let grammar = self.snapshot.grammar.clone();
        let readability = self.snapshot.readability.clone();
        self.update_all(grammar, Vec::new(), readability)
    }

    /// Drop readability underlines, keeping grammar and style.
    pub fn clear_readability_underlines(&mut self) -> bool {
        let grammar = self.snapshot.grammar.clone();
        let style = self.snapshot.style.clone();
        self.update_all(grammar, style, Vec::new())
    }

    pub fn clear(&mut self) -> bool {
        self.update_all(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn set_hovered_grammar(&mut self, idx: Option<usize>) -> bool {
        self.set_index(AnnotationKind::Grammar, idx)
    }

    pub fn set_hovered_style(&mut self, idx: Option<usize>) -> bool {
        self.set_index(AnnotationKind::Style, idx)
    }

    pub fn set_hovered_readability(&mut self, idx: Option<usize>) -> bool {
        self.set_index(AnnotationKind::Readability, idx)
    }

    /// Set the hover index for `kind`, clearing the other kinds.
    pub fn set_hovered(&mut self, kind: AnnotationKind, idx: usize) -> bool {
        if idx >= self.snapshot.list(kind).len() {
            warn!(?kind, idx, "rejecting out-of-range hover index");
            return false;
        }
        let mut next = (*self.snapshot).clone();
        next.hovered_grammar_idx = None;
        next.hovered_style_idx = None;
        next.hovered_readability_idx = None;
        match kind {
            AnnotationKind::Grammar => next.hovered_grammar_idx = Some(idx),
            AnnotationKind::Style => next.hovered_style_idx = Some(idx),
            AnnotationKind::Readability => next.hovered_readability_idx = Some(idx),
        }
        self.replace(next)
    }

    pub fn clear_hover(&mut self) -> bool {
        let mut next = (*self.snapshot).clone();
        next.hovered_grammar_idx = None;
        next.hovered_style_idx = None;
        next.hovered_readability_idx = None;
        self.replace(next)
    }

    pub fn set_locked_highlight(&mut self, idx: Option<usize>) -> bool {
        if let Some(idx) = idx {
            if idx >= self.snapshot.grammar.len() {
                warn!(idx, len = self.snapshot.grammar.len(), "rejecting out-of-range lock index");
                return false;
            }
        }
        let mut next = (*self.snapshot).clone();
        next.locked_highlight_idx = idx;
        self.replace(next)
    }

    fn set_index(&mut self, kind: AnnotationKind, idx: Option<usize>) -> bool {
        let len = self.snapshot.list(kind).len();
        if let Some(idx) = idx {
            if idx >= len {
                warn!(?kind, idx, len, "rejecting out-of-range hover index");
                return false;
            }
        }
        let mut next = (*self.snapshot).clone();
        match kind {
            AnnotationKind::Grammar => next.hovered_grammar_idx = idx,
            AnnotationKind::Style => next.hovered_style_idx = idx,
            AnnotationKind::Readability => next.hovered_readability_idx = idx,
        }
        self.replace(next)
    }

    fn replace(&mut self, next: AnnotationSnapshot) -> bool {
        if let Err(err) = next.check_invariants() {
            warn!(%err, "snapshot rejected");
            return false;
        }
        let changed = !self.snapshot.observably_equal(&next);
        self.snapshot = Arc::new(next);
        changed
    }
}
