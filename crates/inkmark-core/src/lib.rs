//! Core annotation engine: coordinate transforms, the annotation model, the
//! ordered in-memory store, and the export pipeline that flattens annotations
//! into PDF content streams.
//!
//! This crate is deliberately free of async and I/O so it can be embedded in
//! any host (desktop shell, service, wasm). The draft-session layer lives in
//! `inkmark-draft`.

pub mod coords;
pub mod error;
pub mod export;
pub mod model;
pub mod store;

pub use coords::{
    pixel_length_to_point, pixel_to_point, point_length_to_pixel, point_to_pixel, PageViewport,
};
pub use error::{ExportError, StoreError};
pub use export::export;
pub use model::{
    Annotation, AnnotationKind, AnnotationPatch, InkPatch, Point, TextPatch,
    DEFAULT_FONT_SIZE_PT, DEFAULT_INK_THICKNESS_PT,
};
pub use store::AnnotationStore;
