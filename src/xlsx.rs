//! Minimal `.xlsx` writer for a [`ChapterTable`].
//!
//! An xlsx file is a zip archive of SpreadsheetML parts. We only need one
//! worksheet of plain strings with fixed column widths, so the parts are
//! generated directly: cells are written as inline strings (no shared-string
//! table) and empty cells are omitted.
//!
//! [`save_workbook`] builds the whole archive in a temp file next to the
//! destination and renames it into place, so a failed write never leaves a
//! truncated spreadsheet behind.

use crate::error::ChapterError;
use crate::render::table::{ChapterTable, COLUMN_COUNT};
use std::io::{self, Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Worksheet title.
pub const SHEET_NAME: &str = "Chapter Content";

const COLUMN_LETTERS: [char; COLUMN_COUNT] = ['A', 'B', 'C', 'D'];

/// Write `table` as an xlsx archive to any seekable writer.
pub fn write_workbook<W: Write + Seek>(table: &ChapterTable, writer: W) -> io::Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, String); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml", workbook_xml(SHEET_NAME)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/styles.xml", STYLES_XML.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)),
    ];

    for (name, body) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

/// Write `table` to `path` atomically (temp file + rename).
pub fn save_workbook(table: &ChapterTable, path: &Path) -> Result<(), ChapterError> {
    let fail = |source: io::Error| ChapterError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(fail)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    write_workbook(table, tmp.as_file_mut()).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;

    debug!("Wrote {} rows to {}", table.rows.len(), path.display());
    Ok(())
}

// ── Part generators ──────────────────────────────────────────────────────

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="{}" sheetId="1" r:id="rId1"/>
  </sheets>
</workbook>"#,
        escape_xml(sheet_name)
    )
}

fn sheet_xml(table: &ChapterTable) -> String {
    let mut xml = String::with_capacity(256 + table.rows.len() * 128);
    xml.push_str(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cols>
"#,
    );

    for (i, width) in table.column_widths.iter().enumerate() {
        xml.push_str(&format!(
            "    <col min=\"{n}\" max=\"{n}\" width=\"{width}\" customWidth=\"1\"/>\n",
            n = i + 1
        ));
    }
    xml.push_str("  </cols>\n  <sheetData>\n");

    for (r, row) in table.rows.iter().enumerate() {
        let row_num = r + 1;
        xml.push_str(&format!("    <row r=\"{row_num}\">"));
        for (letter, value) in COLUMN_LETTERS.iter().zip(row.iter()) {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                "<c r=\"{letter}{row_num}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                escape_xml(value)
            ));
        }
        xml.push_str("</row>\n");
    }

    xml.push_str("  </sheetData>\n</worksheet>\n");
    xml
}

/// Escape markup characters and drop control characters XML 1.0 forbids.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
  <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
  <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::table;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn sample_table() -> ChapterTable {
        table::render_value(&json!({
            "chapter_title": "Combustion & Flame",
            "content": [
                {"type": "table", "caption": "T<1>", "rows": [["A", "B"], ["1", "2"]]}
            ]
        }))
        .unwrap()
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn escape_handles_markup_and_controls() {
        assert_eq!(escape_xml("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
        assert_eq!(escape_xml("x\u{0}y\u{7}\nz"), "xy\nz");
    }

    #[test]
    fn archive_contains_all_parts() {
        let mut buf = Cursor::new(Vec::new());
        write_workbook(&sample_table(), &mut buf).unwrap();
        let bytes = buf.into_inner();

        let archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/worksheets/sheet1.xml",
        ] {
            assert!(names.contains(&part), "missing {part}: {names:?}");
        }
        assert!(read_part(&bytes, "xl/workbook.xml").contains("name=\"Chapter Content\""));
    }

    #[test]
    fn sheet_has_widths_and_escaped_cells() {
        let t = sample_table();
        let mut buf = Cursor::new(Vec::new());
        write_workbook(&t, &mut buf).unwrap();
        let sheet = read_part(&buf.into_inner(), "xl/worksheets/sheet1.xml");

        assert!(sheet.contains(&format!(
            "<col min=\"2\" max=\"2\" width=\"{}\" customWidth=\"1\"/>",
            t.column_widths[1]
        )));
        assert!(sheet.contains("Combustion &amp; Flame"));
        assert!(sheet.contains("<c r=\"C3\" t=\"inlineStr\"><is><t xml:space=\"preserve\">T&lt;1&gt;</t></is></c>"));
        assert!(sheet.contains("| A | B |\n| 1 | 2 |"));
        // Empty Name/Title cell of the table row is omitted.
        assert!(!sheet.contains("r=\"B3\""));
    }

    #[test]
    fn save_creates_parent_dirs_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.xlsx");
        save_workbook(&sample_table(), &path).unwrap();

        assert!(path.exists());
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1, "unexpected files: {entries:?}");
    }
}
