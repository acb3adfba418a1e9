//! Response cleanup: turn the generation service's raw text into a
//! validated [`ContentBundle`].
//!
//! ## Why a separate module?
//!
//! Models wrap JSON in Markdown fences, spell the narration key two ways,
//! and return narration either as one string or as a list of paragraphs.
//! Each of these quirks is handled by one small, pure function here so the
//! generator only deals with transport and retries.
//!
//! The accepted shapes are enumerated ([`NarrationField`]); anything else is a
//! [`GenerationError::Schema`] carrying the raw response.

use crate::error::GenerationError;
use crate::schema::{ContentBundle, ShortSegment, SlideContent, ThemeColors};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

// ── Fence stripping ──────────────────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```\s*$").unwrap());

/// Remove a leading code-fence marker (with optional language tag) and a
/// trailing fence marker, then trim.
///
/// Text without fences is only trimmed, so applying this twice gives the
/// same result as applying it once.
pub fn strip_code_fences(input: &str) -> String {
    let s = input.trim();
    let s = RE_LEADING_FENCE.replace(s, "");
    let s = RE_TRAILING_FENCE.replace(&s, "");
    s.trim().to_string()
}

// ── Colours ──────────────────────────────────────────────────────────────────

/// Canonicalise a colour to six upper-case hex digits without `#`.
///
/// Accepts `#RRGGBB`, `RRGGBB`, `#RGB` and `RGB`. Returns `None` otherwise.
pub fn normalize_hex(value: &str) -> Option<String> {
    let v = value.trim();
    let v = v.strip_prefix('#').unwrap_or(v);
    if !v.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match v.len() {
        6 => Some(v.to_ascii_uppercase()),
        3 => Some(
            v.chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_uppercase(),
        ),
        _ => None,
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────────────

/// Narration as the model sends it: one script, or a list of paragraphs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NarrationField {
    Text(String),
    Lines(Vec<String>),
}

impl NarrationField {
    /// Paragraph lists are joined with a blank line.
    pub fn into_text(self) -> String {
        match self {
            NarrationField::Text(s) => s,
            NarrationField::Lines(lines) => lines.join("\n\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBundle {
    slides: Vec<RawSlide>,
    #[serde(default)]
    short_segments: Vec<RawSegment>,
    #[serde(default)]
    theme_colors: Option<Map<String, Value>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    voice_over_script: Option<NarrationField>,
}

#[derive(Debug, Deserialize)]
struct RawSlide {
    title: String,
    content: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(alias = "voice_over_script")]
    voice_over: NarrationField,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    title: String,
    content: String,
    script: NarrationField,
    #[serde(default)]
    duration: Option<f64>,
}

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Parse and validate one generation response.
///
/// Fences are stripped first. Non-JSON text yields
/// [`GenerationError::MalformedJson`]; JSON that does not fit the content
/// schema yields [`GenerationError::Schema`]. Both keep `raw` verbatim.
pub fn parse_bundle(raw: &str) -> Result<ContentBundle, GenerationError> {
    let cleaned = strip_code_fences(raw);

    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| GenerationError::MalformedJson {
            detail: e.to_string(),
            raw: raw.to_string(),
        })?;

    let schema_err = |detail: String| GenerationError::Schema {
        detail,
        raw: raw.to_string(),
    };

    if !value.is_object() {
        return Err(schema_err(format!(
            "expected a JSON object at the top level, got {}",
            json_kind(&value)
        )));
    }

    let bundle: RawBundle = serde_json::from_value(value).map_err(|e| schema_err(e.to_string()))?;

    let mut slides = Vec::with_capacity(bundle.slides.len());
    for (i, s) in bundle.slides.into_iter().enumerate() {
        let title = s.title.trim().to_string();
        if title.is_empty() {
            return Err(schema_err(format!("slide {i}: title is empty")));
        }
        let narration = s.voice_over.into_text().trim().to_string();
        if narration.is_empty() {
            return Err(schema_err(format!("slide {i} ('{title}'): narration is empty")));
        }
        slides.push(SlideContent {
            title,
            content: s.content.trim().to_string(),
            key_points: s
                .key_points
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            narration,
        });
    }

    let mut short_segments = Vec::with_capacity(bundle.short_segments.len());
    for (i, seg) in bundle.short_segments.into_iter().enumerate() {
        let script = seg.script.into_text().trim().to_string();
        if script.is_empty() {
            return Err(schema_err(format!("short segment {i}: script is empty")));
        }
        let duration_secs = seg.duration.unwrap_or(ShortSegment::DEFAULT_DURATION_SECS);
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(schema_err(format!(
                "short segment {i}: duration must be a positive number, got {duration_secs}"
            )));
        }
        short_segments.push(ShortSegment {
            title: seg.title.trim().to_string(),
            content: seg.content.trim().to_string(),
            script,
            duration_secs,
        });
    }

    let theme_colors = bundle.theme_colors.as_ref().and_then(ThemeColors::from_map);

    Ok(ContentBundle {
        slides,
        short_segments,
        theme_colors,
        description: bundle
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        narration: bundle
            .voice_over_script
            .map(|n| n.into_text().trim().to_string())
            .filter(|n| !n.is_empty()),
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r##"{
        "slides": [
            {"title": "Intro", "content": "What we cover", "key_points": ["a", " b "], "voice_over": "Welcome."},
            {"title": "Core Idea", "content": "The idea", "voice_over_script": ["First part.", "Second part."]}
        ],
        "short_segments": [
            {"title": "Teaser", "content": "Hook", "script": "Did you know?"}
        ],
        "theme_colors": {"primary": "#abc", "secondary": "4F81BD", "accent": "c0504d", "background": "#FFFFFF", "text": "000000"},
        "description": "A short deck"
    }"##;

    #[test]
    fn strip_fences_with_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  \n"), "{}");
    }

    #[test]
    fn strip_fences_is_idempotent() {
        for input in [
            "{\"slides\": []}",
            "  {\"slides\": []}\n",
            "```json\n{\"slides\": []}\n```",
            "```\n[1, 2]\n```",
            "plain words",
        ] {
            let once = strip_code_fences(input);
            assert_eq!(strip_code_fences(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn unwrapped_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\": \"```\"} "), "{\"a\": \"```\"}");
    }

    #[test]
    fn normalize_hex_forms() {
        assert_eq!(normalize_hex("#1f497d").as_deref(), Some("1F497D"));
        assert_eq!(normalize_hex("abc").as_deref(), Some("AABBCC"));
        assert_eq!(normalize_hex("#12345"), None);
        assert_eq!(normalize_hex("blue"), None);
        assert_eq!(normalize_hex(""), None);
    }

    #[test]
    fn narration_lines_join_with_blank_line() {
        let n = NarrationField::Lines(vec!["One.".into(), "Two.".into()]);
        assert_eq!(n.into_text(), "One.\n\nTwo.");
    }

    #[test]
    fn parses_valid_bundle() {
        let b = parse_bundle(VALID).unwrap();
        assert_eq!(b.slides.len(), 2);
        assert_eq!(b.slides[0].key_points, vec!["a", "b"]);
        assert_eq!(b.slides[1].narration, "First part.\n\nSecond part.");
        assert!(b.slides[1].key_points.is_empty());
        assert_eq!(b.short_segments[0].duration_secs, 60.0);
        assert_eq!(b.theme_colors.unwrap().primary, "AABBCC");
        assert_eq!(b.description.as_deref(), Some("A short deck"));
        assert!(b.narration.is_none());
    }

    #[test]
    fn fenced_response_parses() {
        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(parse_bundle(&fenced).unwrap().slides.len(), 2);
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = parse_bundle("{\"slides\": [{\"title\": \"Intro\"").unwrap_err();
        assert!(matches!(err, GenerationError::MalformedJson { .. }));
        assert_eq!(err.raw_response(), Some("{\"slides\": [{\"title\": \"Intro\""));
    }

    #[test]
    fn missing_narration_is_schema_error() {
        let err = parse_bundle(r#"{"slides": [{"title": "T", "content": "C"}]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Schema { .. }), "{err}");
    }

    #[test]
    fn blank_title_is_schema_error() {
        let err = parse_bundle(r#"{"slides": [{"title": "  ", "content": "C", "voice_over": "x"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("title is empty"));
    }

    #[test]
    fn top_level_array_is_schema_error() {
        let err = parse_bundle("[1, 2]").unwrap_err();
        assert!(matches!(err, GenerationError::Schema { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn partial_palette_is_dropped() {
        let b = parse_bundle(
            r#"{"slides": [], "theme_colors": {"primary": "123456", "accent": "ABCDEF"}}"#,
        )
        .unwrap();
        assert!(b.theme_colors.is_none());
    }

    #[test]
    fn legacy_bundle_script_is_kept() {
        let b = parse_bundle(r#"{"slides": [], "voice_over_script": ["a", "b"]}"#).unwrap();
        assert_eq!(b.narration.as_deref(), Some("a\n\nb"));
    }

    #[test]
    fn non_positive_segment_duration_is_rejected() {
        let err = parse_bundle(
            r#"{"slides": [], "short_segments": [{"title": "t", "content": "c", "script": "s", "duration": 0}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::Schema { .. }));
    }
}
