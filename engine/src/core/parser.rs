//! Marker-delimited command extraction and tokenization.
//!
//! A model turn carries at most one command: the text between the first
//! start marker and the first end marker after it. Everything outside the
//! pair is conversational and ignored.

/// Glyph that opens an inline command.
pub const START_MARKER: char = '░';
/// Glyph that closes an inline command.
pub const END_MARKER: char = '█';

/// A parsed command invocation: name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// Result of scanning one model turn for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// A well-formed invocation was found.
    Command(Invocation),
    /// No marker pair present: a plain conversational turn, not an error.
    NoCommand,
    /// A marker pair was present but its contents do not tokenize.
    InvalidSyntax { raw: String },
}

/// Extract the candidate command between the first start marker and the
/// first end marker after it, trimmed.
///
/// Returns `None` when either marker is missing or only appears in the
/// wrong order.
pub fn extract_command(text: &str) -> Option<&str> {
    let start = text.find(START_MARKER)?;
    let after = start + START_MARKER.len_utf8();
    let end = text[after..].find(END_MARKER)?;
    Some(text[after..after + end].trim())
}

/// Parse one model turn into a dispatchable invocation.
///
/// An empty candidate (markers around nothing) counts as no command. A
/// candidate that fails POSIX word splitting, or whose first token is
/// blank, is invalid syntax rather than a partial invocation.
pub fn parse_response(text: &str) -> ParseOutcome {
    let Some(candidate) = extract_command(text) else {
        return ParseOutcome::NoCommand;
    };
    if candidate.is_empty() {
        return ParseOutcome::NoCommand;
    }
    tokenize(candidate)
}

fn tokenize(candidate: &str) -> ParseOutcome {
    let Some(tokens) = shlex::split(candidate) else {
        return ParseOutcome::InvalidSyntax {
            raw: candidate.to_string(),
        };
    };
    let mut tokens = tokens.into_iter();
    match tokens.next() {
        Some(name) if !name.trim().is_empty() => ParseOutcome::Command(Invocation {
            name,
            args: tokens.collect(),
        }),
        _ => ParseOutcome::InvalidSyntax {
            raw: candidate.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(text: &str) -> Invocation {
        match parse_response(text) {
            ParseOutcome::Command(invocation) => invocation,
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn extracts_trimmed_text_between_first_marker_pair() {
        let text = "I will list files now. ░ list_files . █ and then continue █░noise█";
        assert_eq!(extract_command(text), Some("list_files ."));
    }

    #[test]
    fn content_after_end_marker_is_ignored() {
        let invocation = command("░task_complete█ trailing ░prose█");
        assert_eq!(invocation.name, "task_complete");
        assert!(invocation.args.is_empty());
    }

    #[test]
    fn missing_markers_is_no_command() {
        assert_eq!(parse_response("just thinking out loud"), ParseOutcome::NoCommand);
        assert_eq!(parse_response("only a start ░ here"), ParseOutcome::NoCommand);
        assert_eq!(parse_response("only an end █ here"), ParseOutcome::NoCommand);
    }

    #[test]
    fn reversed_markers_is_no_command() {
        assert_eq!(parse_response("█ backwards ░"), ParseOutcome::NoCommand);
    }

    #[test]
    fn empty_candidate_is_no_command() {
        assert_eq!(parse_response("░   █"), ParseOutcome::NoCommand);
    }

    #[test]
    fn tokenizes_quoted_arguments() {
        let invocation = command("░create_command_begin greet \"hi there\"█");
        assert_eq!(invocation.name, "create_command_begin");
        assert_eq!(invocation.args, vec!["greet".to_string(), "hi there".to_string()]);
    }

    #[test]
    fn unterminated_quote_is_invalid_syntax() {
        let outcome = parse_response("░greet \"unterminated█");
        assert_eq!(
            outcome,
            ParseOutcome::InvalidSyntax {
                raw: "greet \"unterminated".to_string()
            }
        );
    }

    #[test]
    fn blank_name_is_invalid_syntax() {
        assert!(matches!(
            parse_response("░\"\" arg█"),
            ParseOutcome::InvalidSyntax { .. }
        ));
    }
}
