//! One user's editing session over one draft
//!
//! The session owns the in-memory annotation store, converts captured screen
//! geometry into PDF point space at the moment a mark is placed, and talks to
//! the repository for persistence. Everything downstream of placement works
//! in point space only.

use inkmark_core::{
    export, pixel_length_to_point, pixel_to_point, Annotation, AnnotationPatch, AnnotationStore,
    PageViewport, Point,
};
use uuid::Uuid;

use crate::error::{RepoError, SessionError};
use crate::repo::DraftRepository;

pub struct EditorSession<R> {
    draft_id: String,
    repo: R,
    store: AnnotationStore,
}

impl<R: DraftRepository> EditorSession<R> {
    /// Open a session for a draft, loading any previously saved annotations.
    /// A draft the repository has never seen starts empty.
    pub fn open(draft_id: impl Into<String>, repo: R) -> Result<Self, SessionError> {
        let draft_id = draft_id.into();
        let mut store = AnnotationStore::new();
        match repo.load_annotations(&draft_id) {
            Ok(annotations) => {
                for ann in annotations {
                    store.add(ann)?;
                }
            }
            Err(RepoError::DraftNotFound(_)) => {
                tracing::debug!(draft_id = %draft_id, "starting new draft");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self {
            draft_id,
            repo,
            store,
        })
    }

    pub fn draft_id(&self) -> &str {
        &self.draft_id
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.list()
    }

    /// Place a text annotation at a click position captured in viewport
    /// pixels. The position and the optional on-screen font size are
    /// converted to point space here, once, so the stored annotation is
    /// zoom-independent.
    pub fn place_text(
        &mut self,
        viewport: &PageViewport,
        page_index: i64,
        x_px: f64,
        y_px: f64,
        text: impl Into<String>,
        font_size_px: Option<f64>,
    ) -> Result<String, SessionError> {
        let (x_pt, y_pt) = pixel_to_point(x_px, y_px, viewport);
        let id = Uuid::new_v4().to_string();

        let mut ann = Annotation::text(&id, page_index, x_pt, y_pt, text);
        if let inkmark_core::AnnotationKind::Text { font_size_pt, .. } = &mut ann.kind {
            *font_size_pt = font_size_px.map(|px| pixel_length_to_point(px, viewport));
        }
        self.store.add(ann)?;
        Ok(id)
    }

    /// Place an ink annotation from strokes captured in viewport pixels.
    /// Every point is converted to point space; the anchor is the first
    /// point of the first stroke.
    pub fn place_ink(
        &mut self,
        viewport: &PageViewport,
        page_index: i64,
        strokes_px: &[Vec<Point>],
        color: Option<String>,
        thickness_px: Option<f64>,
    ) -> Result<String, SessionError> {
        let strokes: Vec<Vec<Point>> = strokes_px
            .iter()
            .map(|stroke| {
                stroke
                    .iter()
                    .map(|p| {
                        let (x, y) = pixel_to_point(p.x, p.y, viewport);
                        Point::new(x, y)
                    })
                    .collect()
            })
            .collect();
        let (x_pt, y_pt) = strokes
            .first()
            .and_then(|s| s.first())
            .map(|p| (p.x, p.y))
            .unwrap_or((0.0, 0.0));

        let id = Uuid::new_v4().to_string();
        let mut ann = Annotation::ink(&id, page_index, x_pt, y_pt, strokes);
        if let inkmark_core::AnnotationKind::Ink {
            color: c,
            thickness_pt,
            ..
        } = &mut ann.kind
        {
            *c = color;
            *thickness_pt = thickness_px.map(|px| pixel_length_to_point(px, viewport));
        }
        self.store.add(ann)?;
        Ok(id)
    }

    /// Move an annotation to a new position captured in viewport pixels.
    pub fn move_annotation(
        &mut self,
        id: &str,
        viewport: &PageViewport,
        x_px: f64,
        y_px: f64,
    ) -> Result<(), SessionError> {
        let (x_pt, y_pt) = pixel_to_point(x_px, y_px, viewport);
        self.store.update(id, AnnotationPatch::position(x_pt, y_pt))?;
        Ok(())
    }

    /// Merge an arbitrary partial update. The patch is already in point
    /// space; callers converting from pixels do so before building it.
    pub fn update(&mut self, id: &str, patch: AnnotationPatch) -> Result<(), SessionError> {
        self.store.update(id, patch)?;
        Ok(())
    }

    /// Idempotent delete, mirroring the store's semantics.
    pub fn remove(&mut self, id: &str) {
        self.store.remove(id);
    }

    /// Persist the current annotation list under this session's draft id.
    pub fn save(&self) -> Result<(), SessionError> {
        self.repo
            .save_annotations(&self.draft_id, self.store.list())?;
        tracing::debug!(
            draft_id = %self.draft_id,
            count = self.store.len(),
            "draft saved"
        );
        Ok(())
    }

    /// Flatten the current annotations into the source document.
    pub fn export(&self, source_pdf: &[u8]) -> Result<Vec<u8>, SessionError> {
        Ok(export(source_pdf, self.store.list())?)
    }

    /// Flatten on a blocking worker so a large document does not stall the
    /// async host. Works from a snapshot taken up front; edits made while
    /// the task runs do not tear the output.
    pub async fn export_blocking(&self, source_pdf: Vec<u8>) -> Result<Vec<u8>, SessionError> {
        let snapshot = self.store.snapshot();
        let result = tokio::task::spawn_blocking(move || export(&source_pdf, &snapshot))
            .await
            .map_err(|e| SessionError::TaskFailed(e.to_string()))?;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::InMemoryRepository;
    use inkmark_core::AnnotationKind;
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};
    use pretty_assertions::assert_eq;

    fn create_test_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");

        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf 50 750 Td (Seed) Tj ET".to_vec(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn first_page_content(pdf: &[u8]) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
    }

    #[test]
    fn unknown_draft_opens_empty() {
        let session = EditorSession::open("new-draft", InMemoryRepository::new()).unwrap();
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn placement_converts_pixels_to_points_at_capture_time() {
        let mut session = EditorSession::open("d", InMemoryRepository::new()).unwrap();
        // Letter page at 2x zoom: 1224 x 1584 pixels.
        let vp = PageViewport::for_page(612.0, 792.0, 2.0);

        let id = session
            .place_text(&vp, 0, 200.0, 184.0, "Hello", Some(24.0))
            .unwrap();

        let ann = &session.annotations()[0];
        assert_eq!(ann.id, id);
        assert!((ann.x_pt - 100.0).abs() < 1e-9);
        // (1584 - 184) / 2 = 700
        assert!((ann.y_pt - 700.0).abs() < 1e-9);
        match &ann.kind {
            AnnotationKind::Text { font_size_pt, .. } => {
                assert_eq!(*font_size_pt, Some(12.0));
            }
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn ink_placement_converts_every_stroke_point() {
        let mut session = EditorSession::open("d", InMemoryRepository::new()).unwrap();
        let vp = PageViewport::for_page(612.0, 792.0, 2.0);

        let strokes_px = vec![vec![Point::new(20.0, 1564.0), Point::new(40.0, 1544.0)]];
        session
            .place_ink(&vp, 0, &strokes_px, Some("#00FF00".into()), Some(4.0))
            .unwrap();

        match &session.annotations()[0].kind {
            AnnotationKind::Ink {
                strokes,
                color,
                thickness_pt,
            } => {
                assert_eq!(strokes[0][0], Point::new(10.0, 10.0));
                assert_eq!(strokes[0][1], Point::new(20.0, 20.0));
                assert_eq!(color.as_deref(), Some("#00FF00"));
                assert_eq!(*thickness_pt, Some(2.0));
            }
            _ => panic!("expected ink"),
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut session = EditorSession::open("d", InMemoryRepository::new()).unwrap();
        let vp = PageViewport::for_page(612.0, 792.0, 1.0);
        let a = session.place_text(&vp, 0, 10.0, 10.0, "a", None).unwrap();
        let b = session.place_text(&vp, 0, 20.0, 20.0, "b", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn save_then_reopen_restores_draft_in_order() {
        let repo = InMemoryRepository::new();
        let vp = PageViewport::for_page(612.0, 792.0, 1.0);

        let mut session = EditorSession::open("d", &repo).unwrap();
        session.place_text(&vp, 0, 10.0, 700.0, "first", None).unwrap();
        session.place_text(&vp, 0, 20.0, 700.0, "second", None).unwrap();
        session.save().unwrap();

        let reopened = EditorSession::open("d", &repo).unwrap();
        let texts: Vec<&str> = reopened
            .annotations()
            .iter()
            .filter_map(|a| match &a.kind {
                AnnotationKind::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn move_then_remove_round_trips_through_the_store() {
        let mut session = EditorSession::open("d", InMemoryRepository::new()).unwrap();
        let vp = PageViewport::for_page(612.0, 792.0, 1.0);
        let id = session.place_text(&vp, 0, 10.0, 10.0, "x", None).unwrap();

        session.move_annotation(&id, &vp, 50.0, 92.0).unwrap();
        let ann = &session.annotations()[0];
        assert!((ann.x_pt - 50.0).abs() < 1e-9);
        assert!((ann.y_pt - 700.0).abs() < 1e-9);

        session.remove(&id);
        session.remove(&id);
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn export_flattens_current_annotations() {
        let mut session = EditorSession::open("d", InMemoryRepository::new()).unwrap();
        let vp = PageViewport::for_page(612.0, 792.0, 1.0);
        session
            .place_text(&vp, 0, 100.0, 92.0, "Flattened", None)
            .unwrap();

        let result = session.export(&create_test_pdf()).unwrap();
        let content = first_page_content(&result);
        assert!(content.contains("(Flattened) Tj"), "content: {content}");
        // y_pt = 792 - 92 = 700; baseline = 700 - 12 default = 688
        assert!(content.contains("100 688 Td"));
    }

    #[tokio::test]
    async fn blocking_export_matches_sync_export() {
        let mut session = EditorSession::open("d", InMemoryRepository::new()).unwrap();
        let vp = PageViewport::for_page(612.0, 792.0, 1.0);
        session
            .place_text(&vp, 0, 100.0, 92.0, "Async", None)
            .unwrap();

        let pdf = create_test_pdf();
        let sync = session.export(&pdf).unwrap();
        let blocking = session.export_blocking(pdf).await.unwrap();
        assert_eq!(sync, blocking);
    }
}
