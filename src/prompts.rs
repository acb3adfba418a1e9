//! Prompts and fixed narration for document-to-video generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what the model is asked for (a new
//!    key, a different segment count) means editing exactly one place.
//!
//! 2. **Testability**: unit tests inspect prompts directly without calling a
//!    real model, so prompt regressions are easy to catch.

use crate::config::{Theme, VideoConfig, VoiceStyle};

/// Visual-approach phrase embedded in the prompt for a theme.
///
/// Unrecognised themes degrade to `"professional style"`.
pub fn theme_descriptor(theme: &Theme) -> &'static str {
    match theme {
        Theme::Professional => "formal, corporate style with clean design",
        Theme::Creative => "vibrant, engaging style with dynamic elements",
        Theme::Minimal => "clean, simple style with focus on key content",
        Theme::Unrecognized(_) => "professional style",
    }
}

/// Narration-tone phrase embedded in the prompt for a voice style.
///
/// Unrecognised styles degrade to `"clear and professional"`.
pub fn tone_descriptor(style: &VoiceStyle) -> &'static str {
    match style {
        VoiceStyle::Neutral => "balanced and clear",
        VoiceStyle::Enthusiastic => "energetic and engaging",
        VoiceStyle::Formal => "serious and professional",
        VoiceStyle::Unrecognized(_) => "clear and professional",
    }
}

/// System message sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You turn source material into narrated slide presentations. \
You answer with a single valid JSON object and nothing else.";

const JSON_CONTRACT: &str = r#"Create a JSON object with these keys:
1. "slides": list of objects with "title", "content", "key_points" (list of bullet points), and "voice_over" (narration script for this specific slide)
2. "short_segments": 3-5 stand-alone segments for short-form videos (under 2 minutes each) with "title", "content", "script", and "duration" (in seconds) fields
3. "theme_colors": suggested color scheme as hex codes for "primary", "secondary", "accent", "background", "text"
4. "description": one or two sentences describing the presentation"#;

/// Build the user message for one generation call.
///
/// `source` is either a chunk of document text or, when `is_topic` is set, a
/// bare topic to present.
pub fn generation_prompt(source: &str, is_topic: bool, video: &VideoConfig) -> String {
    let opening = if is_topic {
        "Generate a structured presentation about the following topic."
    } else {
        "Generate a structured presentation based on the following content."
    };
    let label = if is_topic { "Topic" } else { "Content" };

    format!(
        "{opening} Use a {theme} visual approach and a {tone} tone for narration. \
         Write all slide text and narration in the language with code '{language}'.\n\n\
         {JSON_CONTRACT}\n\n\
         {label}:\n{source}\n\n\
         Respond with valid JSON only. Keep all content factual and based on the input material.",
        theme = theme_descriptor(&video.theme),
        tone = tone_descriptor(&video.voice_style),
        language = video.language,
    )
}

/// Narration for the title slide.
pub fn intro_narration(topic: &str) -> String {
    format!(
        "Hello and welcome! Today we are taking a closer look at {topic}. \
         Let's get started."
    )
}

/// Narration for the closing slide.
pub const OUTRO_NARRATION: &str = "Thanks for watching! If you found this useful, \
like the video, share it with someone who might enjoy it, and subscribe for more. \
Leave your questions and ideas in the comments.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_descriptors_and_source() {
        let video = VideoConfig {
            theme: Theme::Creative,
            voice_style: VoiceStyle::Formal,
            language: "fr".into(),
            ..VideoConfig::default()
        };
        let p = generation_prompt("Photosynthesis converts light.", false, &video);
        assert!(p.contains("vibrant, engaging style with dynamic elements"));
        assert!(p.contains("serious and professional"));
        assert!(p.contains("'fr'"));
        assert!(p.contains("Content:\nPhotosynthesis converts light."));
        for key in ["\"slides\"", "\"short_segments\"", "\"theme_colors\"", "\"description\"", "\"voice_over\""] {
            assert!(p.contains(key), "missing {key}");
        }
    }

    #[test]
    fn topic_prompt_is_labelled() {
        let p = generation_prompt("Rust lifetimes", true, &VideoConfig::default());
        assert!(p.starts_with("Generate a structured presentation about the following topic."));
        assert!(p.contains("Topic:\nRust lifetimes"));
    }

    #[test]
    fn unknown_names_fall_back() {
        assert_eq!(
            theme_descriptor(&Theme::Unrecognized("neon".into())),
            "professional style"
        );
        assert_eq!(
            tone_descriptor(&VoiceStyle::Unrecognized("whisper".into())),
            "clear and professional"
        );
    }

    #[test]
    fn intro_mentions_topic() {
        assert!(intro_narration("Quantum Computing").contains("Quantum Computing"));
        assert!(!OUTRO_NARRATION.is_empty());
    }
}
