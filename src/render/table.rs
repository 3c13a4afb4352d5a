//! Tabular renderer: the content tree as flat 4-column spreadsheet rows.
//!
//! Layout:
//!
//! ```text
//! Type            | Name/Title | Content/Description | Details (e.g., Steps, Rows, Caption)
//! Chapter Title   | Sound      |                     |
//! Topic           | Vibration  |                     |
//!   Paragraph     |            | Sound is produced … |
//!   Table         |            | Table 13.1          | | Object | Part |\n| … |
//! ```
//!
//! Every element contributes exactly one row, containers before their
//! descendants, so `rows.len() == 2 + tree.element_count()`.

use super::{capitalize, indent};
use crate::error::SchemaError;
use crate::schema::{self, ContentElement, ContentTree};
use serde::Serialize;
use serde_json::Value;

/// Number of columns in every row.
pub const COLUMN_COUNT: usize = 4;

/// Header row, verbatim.
pub const HEADERS: [&str; COLUMN_COUNT] = [
    "Type",
    "Name/Title",
    "Content/Description",
    "Details (e.g., Steps, Rows, Caption)",
];

/// Extra characters added to the longest value of each column.
pub const COLUMN_PADDING: usize = 2;

/// Name shown for a topic or sub-topic without one.
const UNNAMED_SECTION: &str = "N/A";

/// One spreadsheet row: `(Type, Name/Title, Content/Description, Details)`.
pub type Row = [String; COLUMN_COUNT];

/// Rendered table, headers included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterTable {
    pub rows: Vec<Row>,
    /// Display width per column: longest cell (in chars) + [`COLUMN_PADDING`].
    pub column_widths: [usize; COLUMN_COUNT],
}

/// Render a validated tree.
pub fn render(tree: &ContentTree) -> ChapterTable {
    let mut rows: Vec<Row> = Vec::with_capacity(2 + tree.element_count());
    rows.push(HEADERS.map(String::from));
    rows.push(row("Chapter Title", tree.title_or_default(), "", ""));
    push_elements(&mut rows, &tree.content, 0);

    let column_widths = column_widths(&rows);
    ChapterTable {
        rows,
        column_widths,
    }
}

/// Render raw JSON, refusing documents without a `content` array.
pub fn render_value(raw: &Value) -> Result<ChapterTable, SchemaError> {
    let tree = schema::validate(raw)?;
    Ok(render(&tree))
}

fn push_elements(rows: &mut Vec<Row>, elements: &[ContentElement], depth: usize) {
    let pad = indent(depth);
    for element in elements {
        let label = match element {
            ContentElement::Unknown(_) => format!("{pad}Unknown"),
            known => format!("{pad}{}", capitalize(known.kind())),
        };
        let name = element.name().unwrap_or_default();

        match element {
            ContentElement::Topic(section) | ContentElement::SubTopic(section) => {
                let name = section.name.as_deref().unwrap_or(UNNAMED_SECTION);
                rows.push(row(&label, name, "", ""));
                push_elements(rows, &section.children, depth + 1);
            }
            ContentElement::Paragraph(block)
            | ContentElement::Question(block)
            | ContentElement::Example(block)
            | ContentElement::ExternalSource(block) => {
                rows.push(row(&label, name, &block.text, ""));
            }
            ContentElement::Image(figure) | ContentElement::Diagram(figure) => {
                rows.push(row(&label, name, &figure.description, &figure.caption));
            }
            ContentElement::Table(table) => {
                rows.push(row(&label, name, &table.caption, &format_rows(&table.rows)));
            }
            ContentElement::Activity(activity) => {
                rows.push(row(
                    &label,
                    name,
                    &activity.description,
                    &activity.steps.join("\n"),
                ));
            }
            // Deliberately not fully blank: an unknown kind keeps its `name`
            // in the Name/Title column. Description and Content stay empty.
            ContentElement::Unknown(_) => {
                rows.push(row(&label, name, "", ""));
            }
        }
    }
}

/// `[["A","B"],["1","2"]]` → `"| A | B |\n| 1 | 2 |"`.
pub fn format_rows(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for r in rows {
        out.push_str("| ");
        out.push_str(&r.join(" | "));
        out.push_str(" |\n");
    }
    out.trim().to_string()
}

fn row(kind: &str, name: &str, content: &str, details: &str) -> Row {
    [
        kind.to_string(),
        name.to_string(),
        content.to_string(),
        details.to_string(),
    ]
}

fn column_widths(rows: &[Row]) -> [usize; COLUMN_COUNT] {
    let mut widths = [0usize; COLUMN_COUNT];
    for r in rows {
        for (w, cell) in widths.iter_mut().zip(r.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    widths.map(|w| w + COLUMN_PADDING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table_of(raw: Value) -> ChapterTable {
        render_value(&raw).expect("content present")
    }

    #[test]
    fn empty_content_yields_header_and_title_rows() {
        let t = table_of(json!({"chapter_title": "X", "content": []}));
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0], HEADERS.map(String::from));
        assert_eq!(t.rows[1], row("Chapter Title", "X", "", ""));
    }

    #[test]
    fn missing_title_falls_back() {
        let t = table_of(json!({"content": []}));
        assert_eq!(t.rows[1][1], "Unknown Chapter");
    }

    #[test]
    fn missing_content_is_refused() {
        assert_eq!(
            render_value(&json!({"chapter_title": "X"})),
            Err(SchemaError::MissingContent)
        );
        assert_eq!(
            render_value(&json!({"content": {"type": "topic"}})),
            Err(SchemaError::MissingContent)
        );
    }

    #[test]
    fn table_rows_become_pipe_lines() {
        let t = table_of(json!({"content": [
            {"type": "table", "caption": "T1", "rows": [["A", "B"], ["1", "2"]]}
        ]}));
        assert_eq!(t.rows[2], row("Table", "", "T1", "| A | B |\n| 1 | 2 |"));
    }

    #[test]
    fn ragged_and_empty_tables_render() {
        assert_eq!(
            format_rows(&[vec!["a".into()], vec!["b".into(), "c".into()]]),
            "| a |\n| b | c |"
        );
        assert_eq!(format_rows(&[]), "");
    }

    #[test]
    fn nesting_indents_type_column() {
        let t = table_of(json!({"chapter_title": "C", "content": [
            {"type": "topic", "name": "T", "elements": [
                {"type": "sub_topic", "name": "S", "elements": [
                    {"type": "paragraph"}
                ]}
            ]}
        ]}));
        let kinds: Vec<&str> = t.rows.iter().skip(1).map(|r| r[0].as_str()).collect();
        assert_eq!(kinds, ["Chapter Title", "Topic", "  Sub_topic", "    Paragraph"]);
        assert_eq!(t.rows[4][2], "");
        assert_eq!(t.rows.len(), 5);
    }

    #[test]
    fn leaf_kinds_fill_their_columns() {
        let t = table_of(json!({"content": [
            {"type": "image", "description": "leaf", "caption": "Fig 1"},
            {"type": "diagram", "description": "cell", "caption": ""},
            {"type": "activity", "name": "Act 1", "description": "Observe",
             "steps": ["Take a leaf", "Look"]},
            {"type": "question", "text": "Why?"},
            {"type": "example", "text": "e.g."},
            {"type": "external_source", "text": "Box"}
        ]}));
        assert_eq!(t.rows[2], row("Image", "", "leaf", "Fig 1"));
        assert_eq!(t.rows[3], row("Diagram", "", "cell", ""));
        assert_eq!(t.rows[4], row("Activity", "Act 1", "Observe", "Take a leaf\nLook"));
        assert_eq!(t.rows[5], row("Question", "", "Why?", ""));
        assert_eq!(t.rows[6], row("Example", "", "e.g.", ""));
        assert_eq!(t.rows[7], row("External_source", "", "Box", ""));
    }

    #[test]
    fn unnamed_sections_show_placeholder() {
        let t = table_of(json!({"content": [{"type": "topic"}]}));
        assert_eq!(t.rows[2], row("Topic", "N/A", "", ""));
    }

    #[test]
    fn unknown_kinds_get_a_generic_row() {
        let t = table_of(json!({"content": [
            {"type": "topic", "name": "T", "elements": [
                {"type": "formula", "name": "Ohm", "latex": "V=IR"}
            ]}
        ]}));
        assert_eq!(t.rows[3], row("  Unknown", "Ohm", "", ""));
    }

    #[test]
    fn row_count_matches_element_count() {
        let raw = json!({"content": [
            {"type": "topic", "name": "A", "elements": [
                {"type": "paragraph", "text": "x"},
                {"type": "sub_topic", "name": "B", "elements": [
                    {"type": "mystery"}, {"type": "question", "text": "?"}
                ]}
            ]},
            {"type": "topic", "name": "C"}
        ]});
        let tree = schema::validate(&raw).unwrap();
        assert_eq!(render(&tree).rows.len(), 2 + tree.element_count());
        assert_eq!(tree.element_count(), 6);
    }

    #[test]
    fn widths_cover_longest_cell_plus_padding() {
        let t = table_of(json!({"chapter_title": "A very long chapter title", "content": []}));
        assert_eq!(t.column_widths[0], "Chapter Title".len() + 2);
        assert_eq!(t.column_widths[1], "A very long chapter title".len() + 2);
        assert_eq!(t.column_widths[2], "Content/Description".len() + 2);
        assert_eq!(t.column_widths[3], HEADERS[3].len() + 2);
    }

    #[test]
    fn rendering_is_idempotent() {
        let raw = json!({"chapter_title": "X", "content": [
            {"type": "topic", "name": "T", "elements": [{"type": "example", "text": "a\nb"}]}
        ]});
        assert_eq!(table_of(raw.clone()), table_of(raw));
    }
}
