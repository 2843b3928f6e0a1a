use thiserror::Error;

/// Errors surfaced by [`crate::store::AnnotationStore`] operations.
///
/// `remove` is deliberately absent from this taxonomy: removing an id that is
/// no longer present is idempotent, never an error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// `add` was called with an id the store already holds. Identifiers are
    /// generated by the caller, so a collision is a programmer error.
    #[error("annotation id already present: {0}")]
    DuplicateId(String),

    /// `update` or `get` targeted an id the store does not hold.
    #[error("annotation not found: {0}")]
    NotFound(String),

    /// A kind-specific patch was aimed at an annotation of the other kind,
    /// e.g. text fields against an ink annotation.
    #[error("patch does not match annotation kind for id: {0}")]
    KindMismatch(String),
}

/// Errors fatal to a whole export. Per-annotation problems (bad page index,
/// degenerate strokes) are skipped and logged instead of surfacing here.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to parse source PDF: {0}")]
    MalformedDocument(String),

    #[error("failed to serialize exported PDF: {0}")]
    Serialize(String),
}
