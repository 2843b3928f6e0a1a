//! In-memory annotation store for one editing session
//!
//! Insertion order is paint order: the export pipeline draws annotations in
//! the order they appear here, so later marks paint over earlier ones when
//! ink strokes overlap.

use crate::error::StoreError;
use crate::model::{Annotation, AnnotationKind, AnnotationPatch};

/// Ordered mutable collection of annotations, keyed by id.
///
/// The store belongs to a single logical editing session and carries no
/// internal locking; hosts that mutate from multiple threads wrap it in their
/// own synchronization. [`snapshot`](Self::snapshot) exists so an export can
/// capture a consistent ordered view before further edits land.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    entries: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an annotation. The id must be unique within the store; a
    /// duplicate is a caller bug and fails fast rather than silently
    /// replacing the existing entry.
    pub fn add(&mut self, annotation: Annotation) -> Result<(), StoreError> {
        if self.entries.iter().any(|a| a.id == annotation.id) {
            return Err(StoreError::DuplicateId(annotation.id));
        }
        self.entries.push(annotation);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.entries.iter().find(|a| a.id == id)
    }

    /// Merge a partial update into the annotation with the given id, leaving
    /// untouched fields unchanged. A missing id is an error so UI bugs
    /// surface instead of silently dropping edits; a kind-specific patch
    /// against the wrong kind is rejected at this boundary.
    pub fn update(&mut self, id: &str, patch: AnnotationPatch) -> Result<(), StoreError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // Validate before mutating so a rejected patch applies nothing.
        if patch.text.is_some() && !matches!(entry.kind, AnnotationKind::Text { .. }) {
            return Err(StoreError::KindMismatch(id.to_string()));
        }
        if patch.ink.is_some() && !matches!(entry.kind, AnnotationKind::Ink { .. }) {
            return Err(StoreError::KindMismatch(id.to_string()));
        }

        if let Some(page_index) = patch.page_index {
            entry.page_index = page_index;
        }
        if let Some(x_pt) = patch.x_pt {
            entry.x_pt = x_pt;
        }
        if let Some(y_pt) = patch.y_pt {
            entry.y_pt = y_pt;
        }

        match (&mut entry.kind, patch.text, patch.ink) {
            (
                AnnotationKind::Text {
                    text,
                    font_size_pt,
                    width_pt,
                    height_pt,
                },
                Some(tp),
                _,
            ) => {
                if let Some(new_text) = tp.text {
                    *text = new_text;
                }
                if tp.font_size_pt.is_some() {
                    *font_size_pt = tp.font_size_pt;
                }
                if tp.width_pt.is_some() {
                    *width_pt = tp.width_pt;
                }
                if tp.height_pt.is_some() {
                    *height_pt = tp.height_pt;
                }
            }
            (
                AnnotationKind::Ink {
                    strokes,
                    color,
                    thickness_pt,
                },
                _,
                Some(ip),
            ) => {
                if let Some(new_strokes) = ip.strokes {
                    *strokes = new_strokes;
                }
                if ip.color.is_some() {
                    *color = ip.color;
                }
                if ip.thickness_pt.is_some() {
                    *thickness_pt = ip.thickness_pt;
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Remove the annotation with the given id. Removing an id that is not
    /// present is a no-op: the UI may race a delete against an item that was
    /// already removed.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|a| a.id != id);
    }

    /// The full ordered sequence, insertion order preserved.
    pub fn list(&self) -> &[Annotation] {
        &self.entries
    }

    /// Owned ordered copy, taken at the start of an export so concurrent
    /// edits cannot tear the rendered output.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.entries.clone()
    }
}
