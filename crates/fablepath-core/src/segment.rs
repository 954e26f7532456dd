// Story segment parsing.
//
// The backend returns free-form text that ends with two options written as
// "A. ..." followed by "B. ...". This module splits a segment into the
// narrative part and the two raw option texts. A segment without the option
// pattern is reported as `Concluded`.

use std::sync::LazyLock;

use regex::Regex;

/// "A." block, one whitespace character, then a "B." block running to the end
/// of the segment. `(?s)` lets both blocks span lines.
static OPTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(A\..+?)\s(B\..+)").expect("option pattern is a valid regex")
});

/// Result of parsing one story segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSegment {
    /// The option pattern was found.
    ///
    /// `narrative` is the trimmed text before the match. `option_a` and
    /// `option_b` are the trimmed matched blocks, still carrying their
    /// "A." / "B." prefixes.
    WithChoices {
        narrative: String,
        option_a: String,
        option_b: String,
    },
    /// No option pattern: the whole segment is narrative and the story is
    /// treated as finished.
    Concluded { narrative: String },
}

impl ParsedSegment {
    /// The text to append to the transcript.
    pub fn narrative(&self) -> &str {
        match self {
            ParsedSegment::WithChoices { narrative, .. } => narrative,
            ParsedSegment::Concluded { narrative } => narrative,
        }
    }

    /// Display texts for the two choice controls, with the "A." / "B."
    /// prefixes removed. `None` for a concluded segment.
    pub fn choice_texts(&self) -> Option<(String, String)> {
        match self {
            ParsedSegment::WithChoices {
                option_a, option_b, ..
            } => Some((
                option_display_text(option_a, "A."),
                option_display_text(option_b, "B."),
            )),
            ParsedSegment::Concluded { .. } => None,
        }
    }

    pub fn has_choices(&self) -> bool {
        matches!(self, ParsedSegment::WithChoices { .. })
    }
}

/// Split a raw segment into narrative and options.
///
/// Uses the leftmost match of the option pattern, so an "A." appearing
/// earlier in the prose (an initial, for example) starts option A.
pub fn parse_segment(segment: &str) -> ParsedSegment {
    match OPTION_PATTERN.captures(segment) {
        Some(caps) => {
            // Group 0 always exists on a successful match.
            let start = caps.get(0).map_or(0, |m| m.start());
            let option_a = caps.get(1).map_or("", |m| m.as_str());
            let option_b = caps.get(2).map_or("", |m| m.as_str());
            ParsedSegment::WithChoices {
                narrative: segment[..start].trim().to_string(),
                option_a: option_a.trim().to_string(),
                option_b: option_b.trim().to_string(),
            }
        }
        None => ParsedSegment::Concluded {
            narrative: segment.to_string(),
        },
    }
}

/// Remove the first occurrence of `prefix` and trim the rest.
fn option_display_text(raw: &str, prefix: &str) -> String {
    raw.replacen(prefix, "", 1).trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
