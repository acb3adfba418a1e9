//! Marp deck construction.
//!
//! A deck for a presentation with N slides always has N + 2 slides: a title
//! slide, one slide per content slide in order, and a closing slide. The
//! renderer must return exactly that many images; timeline assembly relies
//! on it.

use crate::config::{AspectRatio, VideoConfig};
use crate::schema::{Presentation, ShortSegment, ThemeColors};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

/// A thematic break: three or more of one of `-`, `*`, `_`, spaces allowed.
static RE_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap()
});

pub const TITLE_SUBTITLE: &str = "A Comprehensive Guide";
pub const CLOSING_TITLE: &str = "Thank You!";
pub const CLOSING_SUBTITLE: &str = "Any questions?";

/// A Marp Markdown document plus the facts the renderer needs about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideDeck {
    pub markdown: String,
    slide_count: usize,
    /// Slide size in CSS pixels.
    pub width: u32,
    pub height: u32,
}

impl SlideDeck {
    /// Number of slides (and therefore rendered images) in the deck.
    pub fn slide_count(&self) -> usize {
        self.slide_count
    }
}

/// Title slide, one slide per content slide, closing slide.
pub fn build_deck(presentation: &Presentation, video: &VideoConfig) -> SlideDeck {
    let (width, height) = video.frame_size();
    let mut md = front_matter(&presentation.theme, width, height);

    push_lead(&mut md, &presentation.topic, TITLE_SUBTITLE);

    for slide in &presentation.slides {
        md.push_str("\n---\n\n");
        let _ = writeln!(md, "# {}\n", single_line(&slide.title));
        let body = sanitize_block(&slide.content);
        if !body.is_empty() {
            let _ = writeln!(md, "{body}\n");
        }
        for point in &slide.key_points {
            let _ = writeln!(md, "- {}", single_line(point));
        }
    }

    md.push_str("\n---\n\n");
    push_lead(&mut md, CLOSING_TITLE, CLOSING_SUBTITLE);

    SlideDeck {
        markdown: md,
        slide_count: presentation.slides.len() + 2,
        width,
        height,
    }
}

/// One portrait slide for a short-form segment.
pub fn build_short_deck(segment: &ShortSegment, theme: &ThemeColors, video: &VideoConfig) -> SlideDeck {
    let portrait = VideoConfig {
        aspect_ratio: AspectRatio::Portrait,
        ..video.clone()
    };
    let (width, height) = portrait.frame_size();
    let mut md = front_matter(theme, width, height);
    md.push_str("<!-- _class: lead -->\n\n");
    let _ = writeln!(md, "# {}\n", single_line(&segment.title));
    let body = sanitize_block(&segment.content);
    if !body.is_empty() {
        let _ = writeln!(md, "{body}");
    }

    SlideDeck {
        markdown: md,
        slide_count: 1,
        width,
        height,
    }
}

fn front_matter(theme: &ThemeColors, width: u32, height: u32) -> String {
    let css = ThemeColors::css;
    format!(
        "---\n\
         marp: true\n\
         paginate: false\n\
         style: |\n  \
         section {{ width: {width}px; height: {height}px; background: {bg}; color: {text}; font-size: 36px; }}\n  \
         h1 {{ color: {primary}; }}\n  \
         h2 {{ color: {secondary}; }}\n  \
         strong, li::marker {{ color: {accent}; }}\n  \
         section.lead {{ text-align: center; justify-content: center; }}\n\
         ---\n\n",
        bg = css(&theme.background),
        text = css(&theme.text),
        primary = css(&theme.primary),
        secondary = css(&theme.secondary),
        accent = css(&theme.accent),
    )
}

fn push_lead(md: &mut String, title: &str, subtitle: &str) {
    md.push_str("<!-- _class: lead -->\n\n");
    let _ = writeln!(md, "# {}\n", single_line(title));
    let _ = writeln!(md, "## {}", single_line(subtitle));
}

/// Collapse whitespace so a value fits on one Markdown line.
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop lines Marp would read as slide separators or front matter.
fn sanitize_block(s: &str) -> String {
    s.lines()
        .filter(|line| !RE_RULE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SlideContent;

    fn presentation(titles: &[&str]) -> Presentation {
        Presentation {
            slides: titles
                .iter()
                .map(|t| SlideContent {
                    title: t.to_string(),
                    content: format!("About {t}"),
                    key_points: vec!["first".into(), "second\npoint".into()],
                    narration: "n".into(),
                })
                .collect(),
            theme: ThemeColors::default(),
            segments: vec![],
            topic: "Tides".into(),
        }
    }

    fn separators(md: &str) -> usize {
        md.matches("\n---\n\n").count()
    }

    #[test]
    fn deck_has_title_slides_and_closing() {
        for n in 0..4 {
            let titles: Vec<String> = (0..n).map(|i| format!("S{i}")).collect();
            let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
            let deck = build_deck(&presentation(&refs), &VideoConfig::default());
            assert_eq!(deck.slide_count(), n + 2);
            // Front matter closes with one separator; slides add N + 1 more.
            assert_eq!(separators(&deck.markdown), n + 2, "n={n}");
        }
    }

    #[test]
    fn deck_content_order() {
        let deck = build_deck(&presentation(&["Intro", "Core Idea"]), &VideoConfig::default());
        let md = &deck.markdown;
        let pos = |s: &str| md.find(s).unwrap();
        assert!(pos("# Tides") < pos("# Intro"));
        assert!(pos("# Intro") < pos("# Core Idea"));
        assert!(pos("# Core Idea") < pos("# Thank You!"));
        assert!(md.contains("## A Comprehensive Guide"));
        assert!(md.contains("## Any questions?"));
        assert!(md.contains("- second point"));
        assert!(md.contains("background: #FFFFFF"));
        assert!(md.contains("h1 { color: #1F497D; }"));
        assert_eq!((deck.width, deck.height), (1920, 1080));
    }

    #[test]
    fn separator_lines_in_content_are_dropped() {
        assert_eq!(sanitize_block("a\n---\nb\n *** "), "a\nb");
        assert_eq!(sanitize_block("a - b"), "a - b");
    }

    #[test]
    fn every_thematic_break_form_is_dropped() {
        for rule in ["---", "***", "___", "- - -", "* * *", "_ _ _", "  -----", "_\t_\t_ "] {
            let body = format!("before\n{rule}\nafter");
            assert_eq!(sanitize_block(&body), "before\nafter", "rule {rule:?} kept");
        }
    }

    #[test]
    fn non_rules_survive() {
        for line in ["--", "-*-", "__init__", "- item", "**bold**", "a ___ b"] {
            assert_eq!(sanitize_block(line), line);
        }
    }

    #[test]
    fn rules_in_content_do_not_add_slides() {
        let mut p = presentation(&["Only"]);
        p.slides[0].content = "one\n___\ntwo\n* * *\nthree\n- - -".into();
        let deck = build_deck(&p, &VideoConfig::default());
        assert_eq!(separators(&deck.markdown), 3);
        assert!(deck.markdown.contains("one\ntwo\nthree"));
    }

    #[test]
    fn short_deck_is_portrait_single_slide() {
        let seg = ShortSegment {
            title: "Did you know?".into(),
            content: "Tides are caused by the moon.".into(),
            script: "s".into(),
            duration_secs: 60.0,
        };
        let deck = build_short_deck(&seg, &ThemeColors::default(), &VideoConfig::default());
        assert_eq!(deck.slide_count(), 1);
        assert_eq!((deck.width, deck.height), (1080, 1920));
        assert!(deck.markdown.contains("# Did you know?"));
    }
}
