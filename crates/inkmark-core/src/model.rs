//! Annotation data model
//!
//! Annotations are the unit of persisted user intent: a text label or a set
//! of freehand ink strokes anchored on one page. All geometry is stored in
//! PDF point space (72 points/inch, origin at the page's bottom-left corner),
//! never in screen pixels, so a draft renders identically at any zoom level.

use serde::{Deserialize, Serialize};

/// Font size used for text annotations that do not carry one.
pub const DEFAULT_FONT_SIZE_PT: f64 = 12.0;

/// Line width used for ink annotations that do not carry one.
pub const DEFAULT_INK_THICKNESS_PT: f64 = 2.0;

/// A 2-D coordinate. Whether it means pixels or PDF points is determined
/// entirely by context; the value itself never carries a unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single user-authored mark.
///
/// The wire shape matches the draft API exactly: the kind-specific fields are
/// flattened next to the common ones, discriminated by a lowercase `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Stable unique identifier, assigned at creation, never reused.
    pub id: String,
    /// Zero-based index into the target document's page sequence. Signed so
    /// a corrupt persisted record still loads; out-of-range values, negative
    /// included, are skipped at export rather than failing the whole draft.
    pub page_index: i64,
    /// Anchor position in PDF point space.
    pub x_pt: f64,
    pub y_pt: f64,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

/// The closed set of annotation kinds. Fields that only make sense for one
/// kind live on that variant, so an ink annotation with text (or vice versa)
/// is unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AnnotationKind {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        font_size_pt: Option<f64>,
        /// On-screen text box extent. Persisted for the editor's benefit;
        /// the export pipeline does not consume it.
        #[serde(skip_serializing_if = "Option::is_none")]
        width_pt: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        height_pt: Option<f64>,
    },
    Ink {
        /// Ordered strokes, each an ordered run of points already expressed
        /// in PDF point space.
        strokes: Vec<Vec<Point>>,
        /// CSS-style color string; red when absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thickness_pt: Option<f64>,
    },
}

impl Annotation {
    /// Build a text annotation anchored at `(x_pt, y_pt)`.
    pub fn text(
        id: impl Into<String>,
        page_index: i64,
        x_pt: f64,
        y_pt: f64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            page_index,
            x_pt,
            y_pt,
            kind: AnnotationKind::Text {
                text: text.into(),
                font_size_pt: None,
                width_pt: None,
                height_pt: None,
            },
        }
    }

    /// Build an ink annotation from strokes already in point space.
    pub fn ink(
        id: impl Into<String>,
        page_index: i64,
        x_pt: f64,
        y_pt: f64,
        strokes: Vec<Vec<Point>>,
    ) -> Self {
        Self {
            id: id.into(),
            page_index,
            x_pt,
            y_pt,
            kind: AnnotationKind::Ink {
                strokes,
                color: None,
                thickness_pt: None,
            },
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, AnnotationKind::Text { .. })
    }

    pub fn is_ink(&self) -> bool {
        matches!(self.kind, AnnotationKind::Ink { .. })
    }
}

/// Partial update merged into an existing annotation by
/// [`crate::store::AnnotationStore::update`]. Absent fields leave the current
/// value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub page_index: Option<i64>,
    pub x_pt: Option<f64>,
    pub y_pt: Option<f64>,
    /// Only valid against a text annotation.
    pub text: Option<TextPatch>,
    /// Only valid against an ink annotation.
    pub ink: Option<InkPatch>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPatch {
    pub text: Option<String>,
    pub font_size_pt: Option<f64>,
    pub width_pt: Option<f64>,
    pub height_pt: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InkPatch {
    pub strokes: Option<Vec<Vec<Point>>>,
    pub color: Option<String>,
    pub thickness_pt: Option<f64>,
}

impl AnnotationPatch {
    pub fn position(x_pt: f64, y_pt: f64) -> Self {
        Self {
            x_pt: Some(x_pt),
            y_pt: Some(y_pt),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_wire_shape_matches_draft_api() {
        let ann = Annotation {
            id: "a1".into(),
            page_index: 0,
            x_pt: 100.0,
            y_pt: 700.0,
            kind: AnnotationKind::Text {
                text: "Hello".into(),
                font_size_pt: Some(12.0),
                width_pt: None,
                height_pt: None,
            },
        };

        let json: serde_json::Value = serde_json::to_value(&ann).unwrap();
        assert_eq!(json["id"], "a1");
        assert_eq!(json["type"], "text");
        assert_eq!(json["pageIndex"], 0);
        assert_eq!(json["xPt"], 100.0);
        assert_eq!(json["yPt"], 700.0);
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["fontSizePt"], 12.0);
        // Unset optionals must not appear on the wire
        assert!(json.get("widthPt").is_none());
        assert!(json.get("strokes").is_none());
    }

    #[test]
    fn ink_wire_shape_matches_draft_api() {
        let json = r##"{
            "id": "a2",
            "type": "ink",
            "pageIndex": 1,
            "xPt": 10.0,
            "yPt": 10.0,
            "strokes": [[{"x": 10.0, "y": 10.0}, {"x": 20.0, "y": 10.0}]],
            "color": "#FF0000",
            "thicknessPt": 3.0
        }"##;

        let ann: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.page_index, 1);
        match &ann.kind {
            AnnotationKind::Ink {
                strokes,
                color,
                thickness_pt,
            } => {
                assert_eq!(strokes.len(), 1);
                assert_eq!(strokes[0][1], Point::new(20.0, 10.0));
                assert_eq!(color.as_deref(), Some("#FF0000"));
                assert_eq!(*thickness_pt, Some(3.0));
            }
            _ => panic!("expected ink annotation"),
        }
    }

    #[test]
    fn roundtrip_preserves_annotation_verbatim() {
        let mut ann = Annotation::text("t-1", 2, 72.5, 640.25, "Signed here");
        if let AnnotationKind::Text {
            font_size_pt,
            width_pt,
            height_pt,
            ..
        } = &mut ann.kind
        {
            *font_size_pt = Some(10.0);
            *width_pt = Some(150.0);
            *height_pt = Some(18.0);
        }

        let json = serde_json::to_string(&ann).unwrap();
        let back: Annotation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ann);
    }

    #[test]
    fn negative_page_index_still_deserializes() {
        // Corrupt records must load so one bad annotation cannot block
        // recovery of the whole draft; the export pipeline skips it later.
        let json = r#"{"id":"x","type":"text","pageIndex":-1,"xPt":0,"yPt":0,"text":"hi"}"#;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.page_index, -1);
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let json = r#"{"id":"x","type":"stamp","pageIndex":0,"xPt":0,"yPt":0}"#;
        assert!(serde_json::from_str::<Annotation>(json).is_err());
    }
}
