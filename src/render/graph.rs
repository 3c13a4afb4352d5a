//! Graph renderer: a text outline of the chapter's knowledge structure.
//!
//! ```text
//! Chapter: Sound
//!
//! - Topic: Vibration
//!   - Sub-topic: Amplitude
//!       - Table: Table 13.1
//!     - Question: What is a vibration?
//! ```
//!
//! Topics and sub-topics form the hierarchy; leaves are annotated one level
//! deeper than their container's children. Paragraphs are the prose behind
//! a topic, not facts, and are omitted. So are unrecognised kinds.

use super::{capitalize, indent};
use crate::schema::{self, ContentElement, ContentTree};
use serde_json::Value;
use tracing::debug;

/// Render a validated tree.
pub fn render(tree: &ContentTree) -> String {
    let mut lines = prologue(tree.chapter_title.as_deref());
    push_elements(&mut lines, &tree.content, 0);
    lines.join("\n")
}

/// Render raw JSON. A document without a `content` array yields the
/// prologue alone (or an empty string when it also lacks a title).
pub fn render_value(raw: &Value) -> String {
    match schema::validate(raw) {
        Ok(tree) => render(&tree),
        Err(_) => prologue(schema::chapter_title_of(raw).as_deref()).join("\n"),
    }
}

fn prologue(title: Option<&str>) -> Vec<String> {
    match title {
        Some(t) => vec![format!("Chapter: {t}\n")],
        None => Vec::new(),
    }
}

fn push_elements(lines: &mut Vec<String>, elements: &[ContentElement], level: usize) {
    let pad = indent(level);
    for element in elements {
        match element {
            ContentElement::Topic(section) => {
                lines.push(format!("{pad}- Topic: {}", section.name.as_deref().unwrap_or("")));
                push_elements(lines, &section.children, level + 1);
            }
            ContentElement::SubTopic(section) => {
                lines.push(format!(
                    "{pad}- Sub-topic: {}",
                    section.name.as_deref().unwrap_or("")
                ));
                push_elements(lines, &section.children, level + 1);
            }
            ContentElement::Paragraph(_) => {}
            ContentElement::Image(figure) | ContentElement::Diagram(figure) => {
                let label = capitalize(element.kind());
                let headline = if figure.caption.is_empty() {
                    &figure.description
                } else {
                    &figure.caption
                };
                lines.push(format!("{pad}  - {label}: {headline}"));
                if !figure.caption.is_empty() && !figure.description.is_empty() {
                    lines.push(format!("{pad}    (Description: {})", figure.description));
                }
            }
            ContentElement::Table(table) => {
                lines.push(format!("{pad}  - Table: {}", table.caption));
            }
            ContentElement::Example(block) => {
                lines.push(format!("{pad}  - Example: {}...", first_line(&block.text)));
            }
            ContentElement::Activity(activity) => {
                lines.push(format!("{pad}  - Activity: {}", activity.description));
            }
            ContentElement::Question(block) => {
                lines.push(format!("{pad}  - Question: {}", block.text.trim()));
            }
            ContentElement::ExternalSource(block) => {
                lines.push(format!(
                    "{pad}  - Boxed Info/Source: {}...",
                    first_line(block.text.trim())
                ));
            }
            ContentElement::Unknown(unknown) => {
                debug!(
                    "knowledge graph: skipping element of unrecognised kind {:?}",
                    unknown.kind
                );
            }
        }
    }
}

/// Line boundaries: LF, CR, vertical tab, form feed, the ASCII separators, NEL, LS and PS.
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

fn first_line(text: &str) -> &str {
    text.split(LINE_BREAKS).next().unwrap_or("")
}
