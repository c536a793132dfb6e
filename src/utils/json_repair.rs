//! JSON normalization for free-text LLM responses.
//!
//! LLM output is free text even when the model is instructed to emit JSON:
//! responses arrive wrapped in prose, markdown code fences, or single
//! quotes, doubly escaped, or with minor syntax defects. This module turns
//! such a response into a string safe to hand to a strict JSON parser.
//!
//! The normalizer is a fixed pipeline of narrowly-targeted fixups, each a
//! previously-observed failure pattern. It is explicitly NOT a lenient JSON
//! parser: a new failure pattern gets a new step, never a generalization of
//! an existing one, so each step's effect stays independently testable.
//!
//! # Pipeline
//!
//! 1. Trim surrounding whitespace.
//! 2. Extract the interior of a fenced code block (optionally tagged
//!    `json`) when one contains a brace pair; this takes priority over
//!    every other heuristic.
//! 3. Otherwise slice from the first `{` to the last `}` inclusive; text
//!    without a brace pair passes through unchanged and fails downstream
//!    parsing, which is an expected terminal outcome.
//! 4. Strip one wrapping pair of single quotes.
//! 5. Unescape literal `\n`, `\"`, `\'` sequences (the model sometimes
//!    emits JSON as a doubly-escaped string literal).
//! 6. Three idempotent pattern repairs: trailing commas before `}`/`]`,
//!    missing comma between adjacent objects (`}{`), missing comma between
//!    adjacent arrays (`][`).
//!
//! Steps 5 and 6 only run while the candidate still fails strict parsing;
//! an unconditional substitution could corrupt valid JSON whose string
//! contents happen to contain the patterns.
//!
//! The output is not guaranteed to be valid JSON. The caller must treat a
//! parse failure after normalization as a final, reportable error.

use std::sync::OnceLock;

use regex::Regex;

/// Normalizes a raw LLM response into a string intended for a strict JSON
/// parser.
///
/// # Example
///
/// ```
/// use adforge::utils::extract_json;
///
/// let raw = "Here is the analysis:\n```json\n{\"pain_points\": [\"slow\"]}\n```";
/// assert_eq!(extract_json(raw), "{\"pain_points\": [\"slow\"]}");
/// ```
pub fn extract_json(raw: &str) -> String {
    let trimmed = raw.trim();

    // Fenced block extraction takes priority; the outer-brace slice only
    // applies when no fence matched.
    let candidate = match extract_from_fenced_block(trimmed) {
        Some(block) => block,
        None => slice_outer_object(trimmed).to_string(),
    };

    let candidate = strip_single_quote_wrap(&candidate).to_string();
    if parses_as_json(&candidate) {
        return candidate;
    }

    let candidate = unescape_literal_escapes(&candidate);
    if parses_as_json(&candidate) {
        return candidate;
    }

    let candidate = strip_trailing_commas(&candidate);
    if parses_as_json(&candidate) {
        return candidate;
    }

    let candidate = join_adjacent_objects(&candidate);
    if parses_as_json(&candidate) {
        return candidate;
    }

    join_adjacent_arrays(&candidate)
}

fn parses_as_json(s: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(s).is_ok()
}

/// Extracts a JSON object from a fenced code block (```json ... ``` or a
/// bare ``` ... ``` fence).
///
/// A block qualifies only when its interior contains an opening `{` with a
/// matching `}`; the object is sliced out of the interior. Fences tagged
/// `json` are preferred over generic ones, and every fence is considered,
/// so prose code blocks without JSON do not shadow a later JSON block.
/// Returns None when no qualifying fence is present.
pub fn extract_from_fenced_block(content: &str) -> Option<String> {
    static JSON_FENCE: OnceLock<Regex> = OnceLock::new();
    static ANY_FENCE: OnceLock<Regex> = OnceLock::new();

    let json_fence = JSON_FENCE
        .get_or_init(|| Regex::new(r"```json\s*\n?([\s\S]*?)\n?```").expect("valid pattern"));
    let any_fence = ANY_FENCE.get_or_init(|| {
        Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").expect("valid pattern")
    });

    for re in [json_fence, any_fence] {
        for caps in re.captures_iter(content) {
            let Some(interior) = caps.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };
            let Some(start) = interior.find('{') else {
                continue;
            };
            if let Some(end) = find_matching_brace(&interior[start..]) {
                return Some(interior[start..=start + end].to_string());
            }
        }
    }

    None
}

/// Slices from the first `{` to the last `}` inclusive.
///
/// Handles prose-wrapped output without fences. When no such pair exists
/// the input is returned unchanged.
pub fn slice_outer_object(content: &str) -> &str {
    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        return content;
    };
    if end > start {
        &content[start..=end]
    } else {
        content
    }
}

/// Strips one wrapping pair of single-quote characters.
pub fn strip_single_quote_wrap(content: &str) -> &str {
    if content.len() >= 2 && content.starts_with('\'') && content.ends_with('\'') {
        &content[1..content.len() - 1]
    } else {
        content
    }
}

/// Unescapes literal `\n`, `\"`, and `\'` sequences.
///
/// Fires when the model emitted its JSON as a doubly-escaped string
/// literal rather than raw JSON.
pub fn unescape_literal_escapes(content: &str) -> String {
    content
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
}

/// Removes a trailing comma immediately before a closing `}` or `]`.
pub fn strip_trailing_commas(content: &str) -> String {
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid pattern"));
    re.replace_all(content, "$1").into_owned()
}

/// Inserts the missing comma between two adjacent object literals.
pub fn join_adjacent_objects(content: &str) -> String {
    static GAP: OnceLock<Regex> = OnceLock::new();
    let re = GAP.get_or_init(|| Regex::new(r"\}\s*\{").expect("valid pattern"));
    re.replace_all(content, "},{").into_owned()
}

/// Inserts the missing comma between two adjacent array literals.
pub fn join_adjacent_arrays(content: &str) -> String {
    static GAP: OnceLock<Regex> = OnceLock::new();
    let re = GAP.get_or_init(|| Regex::new(r"\]\s*\[").expect("valid pattern"));
    re.replace_all(content, "],[").into_owned()
}

/// Finds the matching closing brace for a string starting at an opening
/// `{`, tracking string literals and escape sequences.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("extracted JSON should parse")
    }

    #[test]
    fn valid_minified_json_is_unchanged() {
        let input = r#"{"a":1,"b":{"c":[1,2,3]}}"#;
        let result = extract_json(input);
        assert_eq!(parse(&result), parse(input));
    }

    #[test]
    fn valid_json_with_escapes_survives() {
        // String contents that look like repair targets must not be touched.
        let input = r#"{"msg":"He said \"hi\"","odd":",}"}"#;
        let result = extract_json(input);
        assert_eq!(parse(&result), parse(input));
    }

    #[test]
    fn json_fence_extracted() {
        let input = "Here is the result:\n```json\n{\"key\": \"value\"}\n```\nHope this helps!";
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn generic_fence_extracted() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn fence_takes_priority_over_outer_braces() {
        let input = "Prose with stray braces {not json} around:\n```json\n{\"inner\": 1}\n```\nmore {braces}";
        assert_eq!(extract_json(input), r#"{"inner": 1}"#);
    }

    #[test]
    fn prose_wrapped_object_sliced() {
        let input = r#"Sure, here's the JSON: {"name": "test", "count": 5} - that's it!"#;
        assert_eq!(extract_json(input), r#"{"name": "test", "count": 5}"#);
    }

    #[test]
    fn no_brace_pair_passes_through() {
        // Expected terminal failure mode: downstream parsing reports it.
        let input = "I could not produce any output for this request.";
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn single_quote_wrap_stripped() {
        let result = extract_json("'{\"a\":1}'");
        assert_eq!(parse(&result), serde_json::json!({"a": 1}));
    }

    #[test]
    fn doubly_escaped_json_repaired() {
        let input = r#"{\"a\": \"b\"}"#;
        let result = extract_json(input);
        assert_eq!(parse(&result), serde_json::json!({"a": "b"}));
    }

    #[test]
    fn trailing_comma_repaired() {
        let result = extract_json(r#"{"a":1,}"#);
        assert_eq!(parse(&result), serde_json::json!({"a": 1}));
    }

    #[test]
    fn trailing_comma_in_array_repaired() {
        let result = extract_json(r#"{"a":[1,2,],}"#);
        assert_eq!(parse(&result), serde_json::json!({"a": [1, 2]}));
    }

    // Per-step unit tests: each repair is independently exercised on the
    // substring it targets.

    #[test]
    fn strip_trailing_commas_step() {
        assert_eq!(strip_trailing_commas(r#"{"a":1,}"#), r#"{"a":1}"#);
        assert_eq!(strip_trailing_commas("[1,2, ]"), "[1,2]");
        // Idempotent.
        assert_eq!(strip_trailing_commas(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn join_adjacent_objects_step() {
        assert_eq!(join_adjacent_objects("}{"), "},{");
        assert_eq!(join_adjacent_objects("} \n {"), "},{");
        assert_eq!(
            join_adjacent_objects(r#"{"a":1}{"b":2}"#),
            r#"{"a":1},{"b":2}"#
        );
        // Idempotent.
        assert_eq!(join_adjacent_objects("},{"), "},{");
    }

    #[test]
    fn join_adjacent_arrays_step() {
        assert_eq!(join_adjacent_arrays("]["), "],[");
        assert_eq!(join_adjacent_arrays("[1,2][3,4]"), "[1,2],[3,4]");
        // Idempotent.
        assert_eq!(join_adjacent_arrays("],["), "],[");
    }

    #[test]
    fn unescape_literal_escapes_step() {
        assert_eq!(unescape_literal_escapes(r#"\"a\""#), r#""a""#);
        assert_eq!(unescape_literal_escapes(r"\'x\'"), "'x'");
        assert_eq!(unescape_literal_escapes(r"a\nb"), "a\nb");
    }

    #[test]
    fn strip_single_quote_wrap_step() {
        assert_eq!(strip_single_quote_wrap("'{\"a\":1}'"), "{\"a\":1}");
        assert_eq!(strip_single_quote_wrap("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_single_quote_wrap("'"), "'");
    }

    #[test]
    fn slice_outer_object_step() {
        assert_eq!(slice_outer_object("x {\"a\":1} y"), "{\"a\":1}");
        assert_eq!(slice_outer_object("no braces"), "no braces");
        assert_eq!(slice_outer_object("} backwards {"), "} backwards {");
    }

    #[test]
    fn find_matching_brace_tracks_strings() {
        assert_eq!(find_matching_brace("{}"), Some(1));
        assert_eq!(find_matching_brace(r#"{"a": {"b": "c"}}"#), Some(16));
        assert_eq!(find_matching_brace(r#"{"braces": "{ not a brace }"}"#), Some(28));
        assert_eq!(find_matching_brace(r#"{"open": "#), None);
    }

    #[test]
    fn object_gap_repair_fires_in_pipeline() {
        // The comma is inserted; the overall result is a comma-joined pair
        // that still fails strict object parsing at the caller. The repair
        // itself must fire, not the parse.
        let result = extract_json(r#"{"a":1}{"b":2}"#);
        assert!(result.contains("},{"));
    }

    #[test]
    fn fenced_block_with_trailing_note_sliced_to_object() {
        let input = "```json\n{\"a\": 1}\nNote: fields are approximate.\n```";
        assert_eq!(extract_json(input), r#"{"a": 1}"#);
    }

    #[test]
    fn idempotent_on_own_output() {
        let raw = "Result:\n```json\n{\"a\": [1,2,],}\n```";
        let once = extract_json(raw);
        let twice = extract_json(&once);
        assert_eq!(parse(&once), parse(&twice));
    }
}
