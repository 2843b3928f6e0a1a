//! Draft persistence boundary
//!
//! Hosts decide where draft annotations live (disk, database, browser
//! storage); the session layer only needs load and save for one draft id.
//! Annotations are persisted in their wire JSON shape, so anything that can
//! store a string can back a repository.

use std::collections::HashMap;
use std::sync::Mutex;

use inkmark_core::Annotation;

use crate::error::RepoError;

/// Storage for one draft's ordered annotation list, keyed by draft id.
pub trait DraftRepository: Send + Sync {
    /// Load the full ordered annotation list for a draft.
    fn load_annotations(&self, draft_id: &str) -> Result<Vec<Annotation>, RepoError>;

    /// Replace the stored annotation list for a draft, creating the draft if
    /// it does not exist yet.
    fn save_annotations(&self, draft_id: &str, annotations: &[Annotation])
        -> Result<(), RepoError>;
}

/// Repository backed by a process-local map. Used in tests and by hosts that
/// keep drafts purely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    drafts: Mutex<HashMap<String, String>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftRepository for InMemoryRepository {
    fn load_annotations(&self, draft_id: &str) -> Result<Vec<Annotation>, RepoError> {
        let drafts = self
            .drafts
            .lock()
            .map_err(|_| RepoError::Backend("draft map lock poisoned".into()))?;
        let json = drafts
            .get(draft_id)
            .ok_or_else(|| RepoError::DraftNotFound(draft_id.to_string()))?;
        Ok(serde_json::from_str(json)?)
    }

    fn save_annotations(
        &self,
        draft_id: &str,
        annotations: &[Annotation],
    ) -> Result<(), RepoError> {
        let json = serde_json::to_string(annotations)?;
        let mut drafts = self
            .drafts
            .lock()
            .map_err(|_| RepoError::Backend("draft map lock poisoned".into()))?;
        drafts.insert(draft_id.to_string(), json);
        Ok(())
    }
}

impl<R: DraftRepository + ?Sized> DraftRepository for &R {
    fn load_annotations(&self, draft_id: &str) -> Result<Vec<Annotation>, RepoError> {
        (**self).load_annotations(draft_id)
    }

    fn save_annotations(
        &self,
        draft_id: &str,
        annotations: &[Annotation],
    ) -> Result<(), RepoError> {
        (**self).save_annotations(draft_id, annotations)
    }
}
