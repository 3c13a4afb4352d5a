//! The content tree: a chapter's structured content as a recursive sum type.
//!
//! Upstream JSON comes from an AI extraction step whose output shape is only
//! loosely guaranteed, so parsing here is permissive: only the top-level
//! `content` array is required. Inside it every object becomes a
//! [`ContentElement`]; missing or mistyped string fields read as empty, and an
//! unrecognised `type` becomes [`ContentElement::Unknown`] carrying its raw
//! fields instead of being dropped.
//!
//! The validated source document is kept alongside the typed tree so the JSON
//! artifact and the planner request see exactly what the model produced.

use crate::error::ValidationError;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Title used wherever a chapter has none.
pub const UNKNOWN_CHAPTER: &str = "Unknown Chapter";

/// One chapter's structured content.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTree {
    /// Chapter title, when the document carried one.
    pub chapter_title: Option<String>,
    /// Top-level elements in document order.
    pub content: Vec<ContentElement>,
    source: Value,
}

/// A node of the content tree, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentElement {
    Topic(Section),
    SubTopic(Section),
    Paragraph(TextBlock),
    Image(Figure),
    Diagram(Figure),
    Table(Table),
    Activity(Activity),
    Question(TextBlock),
    Example(TextBlock),
    ExternalSource(TextBlock),
    /// Any kind outside the set above, fields preserved as-is.
    Unknown(UnknownElement),
}

/// A `topic` or `sub_topic`: the only kinds with children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: Option<String>,
    pub children: Vec<ContentElement>,
}

/// Text-bearing leaf (`paragraph`, `question`, `example`, `external_source`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub name: Option<String>,
    pub text: String,
}

/// `image` or `diagram`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Figure {
    pub name: Option<String>,
    pub description: String,
    pub caption: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: Option<String>,
    pub caption: String,
    /// Not necessarily rectangular.
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub name: Option<String>,
    pub description: String,
    pub steps: Vec<String>,
}

/// An element whose `type` is missing or not recognised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnknownElement {
    /// The raw `type` tag, if there was a string one.
    pub kind: Option<String>,
    /// Every field of the source object, `type` included.
    pub fields: Map<String, Value>,
}

impl UnknownElement {
    /// The `name` field, if present as a string.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }
}

/// Validate raw JSON and build a [`ContentTree`] from it.
///
/// Fails only when the top-level `content` field is absent or not an array.
/// A missing chapter title is fine. Elements are not deep-validated.
pub fn validate(raw: &Value) -> Result<ContentTree, ValidationError> {
    let items = raw
        .get("content")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingContentField)?;

    Ok(ContentTree {
        chapter_title: chapter_title_of(raw),
        content: parse_elements(items),
        source: raw.clone(),
    })
}

/// Read `chapter_title` from a raw document; `null` counts as absent.
pub(crate) fn chapter_title_of(raw: &Value) -> Option<String> {
    match raw.get("chapter_title")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl ContentTree {
    /// Build a tree in code. The source document is synthesised from the
    /// typed elements.
    pub fn new(chapter_title: Option<String>, content: Vec<ContentElement>) -> Self {
        let mut doc = Map::new();
        if let Some(ref t) = chapter_title {
            doc.insert("chapter_title".into(), Value::String(t.clone()));
        }
        doc.insert(
            "content".into(),
            Value::Array(content.iter().map(ContentElement::to_value).collect()),
        );
        Self {
            chapter_title,
            content,
            source: Value::Object(doc),
        }
    }

    /// Parse JSON text and validate it.
    pub fn from_json_str(s: &str) -> Result<Self, ValidationError> {
        let raw: Value =
            serde_json::from_str(s).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
        validate(&raw)
    }

    /// The document this tree was validated from.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Title, or [`UNKNOWN_CHAPTER`].
    pub fn title_or_default(&self) -> &str {
        self.chapter_title.as_deref().unwrap_or(UNKNOWN_CHAPTER)
    }

    /// Number of elements across the whole recursive tree.
    pub fn element_count(&self) -> usize {
        count_elements(&self.content)
    }

    /// Pretty-printed JSON of the source document.
    pub fn to_pretty_json(&self) -> String {
        // Serialising a `Value` cannot fail.
        serde_json::to_string_pretty(&self.source).unwrap_or_default()
    }
}

impl Serialize for ContentTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

fn count_elements(elements: &[ContentElement]) -> usize {
    elements
        .iter()
        .map(|e| 1 + e.children().map_or(0, count_elements))
        .sum()
}

impl ContentElement {
    /// The kind tag as it appears in JSON (`"sub_topic"`, `"external_source"`, …).
    ///
    /// Unknown elements report their raw tag, or `"unknown"` when untagged.
    pub fn kind(&self) -> &str {
        match self {
            ContentElement::Topic(_) => "topic",
            ContentElement::SubTopic(_) => "sub_topic",
            ContentElement::Paragraph(_) => "paragraph",
            ContentElement::Image(_) => "image",
            ContentElement::Diagram(_) => "diagram",
            ContentElement::Table(_) => "table",
            ContentElement::Activity(_) => "activity",
            ContentElement::Question(_) => "question",
            ContentElement::Example(_) => "example",
            ContentElement::ExternalSource(_) => "external_source",
            ContentElement::Unknown(u) => u.kind.as_deref().unwrap_or("unknown"),
        }
    }

    /// The optional `name` field.
    pub fn name(&self) -> Option<&str> {
        match self {
            ContentElement::Topic(s) | ContentElement::SubTopic(s) => s.name.as_deref(),
            ContentElement::Paragraph(t)
            | ContentElement::Question(t)
            | ContentElement::Example(t)
            | ContentElement::ExternalSource(t) => t.name.as_deref(),
            ContentElement::Image(f) | ContentElement::Diagram(f) => f.name.as_deref(),
            ContentElement::Table(t) => t.name.as_deref(),
            ContentElement::Activity(a) => a.name.as_deref(),
            ContentElement::Unknown(u) => u.name(),
        }
    }

    /// Children of a container; `None` for leaves.
    pub fn children(&self) -> Option<&[ContentElement]> {
        match self {
            ContentElement::Topic(s) | ContentElement::SubTopic(s) => Some(&s.children),
            _ => None,
        }
    }

    /// Build an element from one JSON value. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return ContentElement::Unknown(UnknownElement {
                kind: None,
                fields: Map::new(),
            });
        };

        let kind = obj.get("type").and_then(Value::as_str);
        let name = opt_str(obj, "name");

        match kind {
            Some("topic") => ContentElement::Topic(section(obj, name)),
            Some("sub_topic") => ContentElement::SubTopic(section(obj, name)),
            Some("paragraph") => ContentElement::Paragraph(text_block(obj, name)),
            Some("question") => ContentElement::Question(text_block(obj, name)),
            Some("example") => ContentElement::Example(text_block(obj, name)),
            Some("external_source") => ContentElement::ExternalSource(text_block(obj, name)),
            Some("image") => ContentElement::Image(figure(obj, name)),
            Some("diagram") => ContentElement::Diagram(figure(obj, name)),
            Some("table") => ContentElement::Table(Table {
                name,
                caption: str_field(obj, "caption"),
                rows: obj
                    .get("rows")
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().map(row_cells).collect())
                    .unwrap_or_default(),
            }),
            Some("activity") => ContentElement::Activity(Activity {
                name,
                description: str_field(obj, "description"),
                steps: obj
                    .get("steps")
                    .and_then(Value::as_array)
                    .map(|steps| steps.iter().map(cell_text).collect())
                    .unwrap_or_default(),
            }),
            other => ContentElement::Unknown(UnknownElement {
                kind: other.map(str::to_string),
                fields: obj.clone(),
            }),
        }
    }

    /// Inverse of [`ContentElement::from_value`] for typed elements.
    /// Children are written under `elements`.
    pub fn to_value(&self) -> Value {
        if let ContentElement::Unknown(u) = self {
            return Value::Object(u.fields.clone());
        }

        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.kind().to_string()));
        if let Some(name) = self.name() {
            obj.insert("name".into(), Value::String(name.to_string()));
        }
        match self {
            ContentElement::Topic(s) | ContentElement::SubTopic(s) => {
                obj.insert(
                    "elements".into(),
                    Value::Array(s.children.iter().map(Self::to_value).collect()),
                );
            }
            ContentElement::Paragraph(t)
            | ContentElement::Question(t)
            | ContentElement::Example(t)
            | ContentElement::ExternalSource(t) => {
                obj.insert("text".into(), Value::String(t.text.clone()));
            }
            ContentElement::Image(f) | ContentElement::Diagram(f) => {
                obj.insert("description".into(), Value::String(f.description.clone()));
                obj.insert("caption".into(), Value::String(f.caption.clone()));
            }
            ContentElement::Table(t) => {
                obj.insert("caption".into(), Value::String(t.caption.clone()));
                obj.insert(
                    "rows".into(),
                    Value::Array(
                        t.rows
                            .iter()
                            .map(|r| Value::Array(r.iter().cloned().map(Value::String).collect()))
                            .collect(),
                    ),
                );
            }
            ContentElement::Activity(a) => {
                obj.insert("description".into(), Value::String(a.description.clone()));
                obj.insert(
                    "steps".into(),
                    Value::Array(a.steps.iter().cloned().map(Value::String).collect()),
                );
            }
            ContentElement::Unknown(_) => {}
        }
        Value::Object(obj)
    }
}

// ── Permissive field readers ─────────────────────────────────────────────

fn parse_elements(items: &[Value]) -> Vec<ContentElement> {
    items.iter().map(ContentElement::from_value).collect()
}

fn section(obj: &Map<String, Value>, name: Option<String>) -> Section {
    // The extraction prompt asks for `elements`; accept `children` too.
    let children = obj
        .get("elements")
        .or_else(|| obj.get("children"))
        .and_then(Value::as_array)
        .map(|items| parse_elements(items))
        .unwrap_or_default();
    Section { name, children }
}

fn text_block(obj: &Map<String, Value>, name: Option<String>) -> TextBlock {
    TextBlock {
        name,
        text: str_field(obj, "text"),
    }
}

fn figure(obj: &Map<String, Value>, name: Option<String>) -> Figure {
    Figure {
        name,
        description: str_field(obj, "description"),
        caption: str_field(obj, "caption"),
    }
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    opt_str(obj, key).unwrap_or_default()
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_cells(row: &Value) -> Vec<String> {
    match row {
        Value::Array(cells) => cells.iter().map(cell_text).collect(),
        other => vec![cell_text(other)],
    }
}
