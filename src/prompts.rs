//! Prompts for the two AI calls.
//!
//! Both defaults live here so the schema the extraction prompt asks for and
//! the schema [`crate::schema`] parses can be checked side by side. Callers
//! can override either prompt via [`crate::config::PipelineConfig`]; the
//! documentation artifact records whichever prompt was actually used.

/// Marker line between the extraction prompt and the chapter text.
pub const CHAPTER_TEXT_MARKER: &str = "[INSERT THE CLASS 8 NCERT SCIENCE CHAPTER TEXT HERE]";

/// Marker line between the planner prompt and the chapter JSON.
pub const CHAPTER_JSON_MARKER: &str =
    "[INSERT THE EXTRACTED JSON CONTENT OF THE CLASS 8 NCERT SCIENCE CHAPTER HERE]";

/// Default prompt turning raw chapter text into structured JSON.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an expert curriculum analyst. Read the raw text of a school science textbook chapter and return its content as ONE JSON object.

Follow these rules precisely:

1. OUTPUT FORMAT
   - Output ONLY the JSON object, no commentary and no Markdown fences
   - Top level: {"chapter_title": "<title>", "content": [ ...elements... ]}

2. ELEMENT TYPES (field "type")
   - "topic":           {"type": "topic", "name": "...", "elements": [ ... ]}
   - "sub_topic":       {"type": "sub_topic", "name": "...", "elements": [ ... ]}
   - "paragraph":       {"type": "paragraph", "text": "..."}
   - "image":           {"type": "image", "description": "...", "caption": "..."}
   - "diagram":         {"type": "diagram", "description": "...", "caption": "..."}
   - "table":           {"type": "table", "caption": "...", "rows": [["cell", "cell"], ...]}
   - "activity":        {"type": "activity", "description": "...", "steps": ["...", "..."]}
   - "question":        {"type": "question", "text": "..."}
   - "example":         {"type": "example", "text": "..."}
   - "external_source": {"type": "external_source", "text": "..."}  (boxed facts, "Did you know?" panels)

3. STRUCTURE
   - Keep the chapter's reading order
   - Only "topic" and "sub_topic" may contain "elements"
   - Nest sub-topics inside the topic they belong to
   - The first row of a table holds its column headers

4. FIDELITY
   - Copy text faithfully; do not summarise paragraphs
   - Describe figures from their captions and surrounding text
   - Omit page numbers, running headers and footers"#;

/// Default prompt turning structured JSON into a study planner.
pub const DEFAULT_PLANNER_PROMPT: &str = r#"You are an experienced science teacher. From the structured chapter content below, write a study planner for a Class 8 student.

Follow these rules precisely:

1. Output Markdown only
2. Start with a one-paragraph overview of the chapter
3. Split the chapter into daily study sessions of 30-45 minutes, each with:
   - the topics and sub-topics covered
   - the activities to perform and what to observe
   - 2-3 self-check questions drawn from the chapter
4. End with a revision checklist covering every topic
5. Do NOT invent content that is not in the chapter"#;

/// Assemble the extraction request.
pub fn extraction_request(base_prompt: &str, chapter_text: &str) -> String {
    format!("{base_prompt}\n\n{CHAPTER_TEXT_MARKER}\n{chapter_text}")
}

/// Assemble the planner request.
pub fn planner_request(base_prompt: &str, chapter_json: &str) -> String {
    format!("{base_prompt}\n\n{CHAPTER_JSON_MARKER}\n{chapter_json}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_names_every_kind() {
        for kind in [
            "\"topic\"",
            "\"sub_topic\"",
            "\"paragraph\"",
            "\"image\"",
            "\"diagram\"",
            "\"table\"",
            "\"activity\"",
            "\"question\"",
            "\"example\"",
            "\"external_source\"",
        ] {
            assert!(DEFAULT_EXTRACTION_PROMPT.contains(kind), "missing {kind}");
        }
        assert!(DEFAULT_EXTRACTION_PROMPT.contains("\"elements\""));
    }

    #[test]
    fn requests_put_payload_after_marker() {
        let req = extraction_request("PROMPT", "chapter body");
        assert!(req.starts_with("PROMPT\n\n"));
        assert!(req.ends_with(&format!("{CHAPTER_TEXT_MARKER}\nchapter body")));

        let req = planner_request("P", "{}");
        assert_eq!(req, format!("P\n\n{CHAPTER_JSON_MARKER}\n{{}}"));
    }
}
