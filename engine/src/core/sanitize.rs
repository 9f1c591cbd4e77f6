//! Cleanup of model-authored handler source before it is persisted.
//!
//! The model's code turn arrives wrapped in whatever the model felt like
//! adding: markdown fences, conversational preamble, sometimes echoed
//! protocol markers. Sanitization is deterministic so the same blob always
//! produces the same handler file.

use super::parser::{END_MARKER, START_MARKER};

/// Prefixes that mark the first genuine line of handler source: imports,
/// definitions, comments, and docstring openers.
const SOURCE_PREFIXES: [&str; 7] = ["import ", "from ", "def ", "class ", "#", "\"\"\"", "'''"];

/// Strip formatting artifacts and conversational preamble from a raw code
/// blob, returning the lines to persist.
pub fn clean_handler_source(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.trim().lines().collect();

    if lines.first().is_some_and(|line| line.trim().starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|line| line.trim() == "```") {
        lines.pop();
    }

    // The model occasionally echoes protocol syntax into its own code.
    let bare_end_marker = END_MARKER.to_string();
    lines.retain(|line| line.trim() != bare_end_marker);
    lines.retain(|line| !(line.contains(START_MARKER) && line.contains(END_MARKER)));

    // Drop prose before the first source-looking line. When nothing looks
    // like source, keep everything that survived the filters above.
    let first_source = lines
        .iter()
        .position(|line| {
            let trimmed = line.trim();
            SOURCE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
        })
        .unwrap_or(0);

    lines[first_source..].join("\n")
}
