//! Content schema: the validated shapes that flow between pipeline stages.
//!
//! Every type here is plain data. Instances are only created from a fully
//! validated generation response (see [`crate::pipeline::normalize`]); a
//! partially valid bundle never exists.
//!
//! The generation stage can produce one bundle per chunk or a single bundle
//! for a topic. [`GeneratedContent`] names both shapes and
//! [`GeneratedContent::into_presentation`] normalises them once into the
//! [`Presentation`] that rendering and timeline assembly consume.

use crate::pipeline::flatten::{flatten, flatten_segments, resolve_theme};
use crate::pipeline::normalize::normalize_hex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One slide: what is shown and what is said while it is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    /// Never blank.
    pub title: String,
    pub content: String,
    /// Insertion order is display order.
    pub key_points: Vec<String>,
    /// Per-slide narration script. Never blank; it drives the unit duration.
    pub narration: String,
}

/// A stand-alone short-form segment (one portrait video each).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortSegment {
    pub title: String,
    pub content: String,
    pub script: String,
    /// Target length. Longer narration is cut at this point.
    pub duration_secs: f64,
}

impl ShortSegment {
    pub const DEFAULT_DURATION_SECS: f64 = 60.0;
}

/// Five-role colour palette, every role always present.
///
/// Values are six upper-case hex digits without a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: "1F497D".to_string(),
            secondary: "4F81BD".to_string(),
            accent: "C0504D".to_string(),
            background: "FFFFFF".to_string(),
            text: "000000".to_string(),
        }
    }
}

impl ThemeColors {
    pub const ROLES: [&'static str; 5] = ["primary", "secondary", "accent", "background", "text"];

    /// Build a palette from a generated `theme_colors` object.
    ///
    /// Returns `None` unless all five roles are present and every value is a
    /// valid hex colour. Callers substitute [`ThemeColors::default`] wholesale;
    /// palettes are never merged role by role.
    pub fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let role = |name: &str| map.get(name).and_then(Value::as_str).and_then(normalize_hex);
        Some(Self {
            primary: role("primary")?,
            secondary: role("secondary")?,
            accent: role("accent")?,
            background: role("background")?,
            text: role("text")?,
        })
    }

    /// Value with a leading `#`, as CSS wants it.
    pub fn css(value: &str) -> String {
        format!("#{value}")
    }
}

/// The validated result of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub slides: Vec<SlideContent>,
    #[serde(default)]
    pub short_segments: Vec<ShortSegment>,
    /// `None` when the response had no complete, valid palette.
    #[serde(default)]
    pub theme_colors: Option<ThemeColors>,
    #[serde(default)]
    pub description: Option<String>,
    /// Whole-bundle narration script from older response shapes. Stored for
    /// the checkpoint only; unit timing always comes from per-slide narration.
    #[serde(default)]
    pub narration: Option<String>,
}

/// Everything the generation stage produced for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bundles", rename_all = "snake_case")]
pub enum GeneratedContent {
    /// A single bundle (topic mode, or a document that fit in one chunk).
    Bundle(ContentBundle),
    /// One bundle per chunk, in chunk order.
    Chunked(Vec<ContentBundle>),
}

impl GeneratedContent {
    /// Bundles in chunk order.
    pub fn bundles(&self) -> &[ContentBundle] {
        match self {
            GeneratedContent::Bundle(b) => std::slice::from_ref(b),
            GeneratedContent::Chunked(v) => v,
        }
    }

    /// Normalise into the single shape downstream stages consume.
    pub fn into_presentation(self) -> Presentation {
        let bundles = self.bundles();
        let slides = flatten(bundles);
        let segments = flatten_segments(bundles);
        let theme = resolve_theme(bundles);
        let topic = derive_topic(&slides);
        Presentation {
            slides,
            theme,
            segments,
            topic,
        }
    }
}

/// Flattened, theme-resolved content of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub slides: Vec<SlideContent>,
    pub theme: ThemeColors,
    pub segments: Vec<ShortSegment>,
    pub topic: String,
}

/// Topic shown on the title slide and spoken in the intro.
///
/// The first slide's title, with a leading "Introduction to" removed.
pub fn derive_topic(slides: &[SlideContent]) -> String {
    const PREFIX: &str = "introduction to ";
    let Some(first) = slides.first() else {
        return "Presentation".to_string();
    };
    let title = first.title.trim();
    match title.get(..PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PREFIX) => {
            let rest = title[PREFIX.len()..].trim();
            if rest.is_empty() {
                title.to_string()
            } else {
                rest.to_string()
            }
        }
        _ => title.to_string(),
    }
}
