//! Chunk-result flattening.
//!
//! Per-chunk bundles are concatenated in chunk order; order inside a chunk
//! is kept. No slide is dropped, merged or re-sorted.

use crate::schema::{ContentBundle, ShortSegment, SlideContent, ThemeColors};
use tracing::warn;

/// All slides of all bundles, chunk order first, then slide order.
pub fn flatten(bundles: &[ContentBundle]) -> Vec<SlideContent> {
    bundles.iter().flat_map(|b| b.slides.iter().cloned()).collect()
}

/// All short segments, in the same order as [`flatten`].
pub fn flatten_segments(bundles: &[ContentBundle]) -> Vec<ShortSegment> {
    bundles
        .iter()
        .flat_map(|b| b.short_segments.iter().cloned())
        .collect()
}

/// The first complete palette in chunk order, else the default palette.
pub fn resolve_theme(bundles: &[ContentBundle]) -> ThemeColors {
    match bundles.iter().find_map(|b| b.theme_colors.clone()) {
        Some(theme) => theme,
        None => {
            warn!("No complete theme palette in generated content, using default colours");
            ThemeColors::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(prefix: &str, n: usize) -> ContentBundle {
        ContentBundle {
            slides: (0..n)
                .map(|i| SlideContent {
                    title: format!("{prefix}{i}"),
                    content: String::new(),
                    key_points: vec![],
                    narration: "n".into(),
                })
                .collect(),
            short_segments: vec![],
            theme_colors: None,
            description: None,
            narration: None,
        }
    }

    #[test]
    fn length_is_sum_and_order_is_kept() {
        let sizes = [3usize, 0, 1, 4];
        let bundles: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(c, &n)| bundle(&format!("c{c}-"), n))
            .collect();
        let flat = flatten(&bundles);
        assert_eq!(flat.len(), sizes.iter().sum::<usize>());

        let expected: Vec<String> = sizes
            .iter()
            .enumerate()
            .flat_map(|(c, &n)| (0..n).map(move |i| format!("c{c}-{i}")))
            .collect();
        let got: Vec<_> = flat.into_iter().map(|s| s.title).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_input() {
        assert!(flatten(&[]).is_empty());
        assert_eq!(resolve_theme(&[]), ThemeColors::default());
    }

    #[test]
    fn segments_follow_chunk_order() {
        let mut a = bundle("a", 0);
        a.short_segments.push(ShortSegment {
            title: "first".into(),
            content: String::new(),
            script: "s".into(),
            duration_secs: 30.0,
        });
        let mut b = bundle("b", 0);
        b.short_segments.push(ShortSegment {
            title: "second".into(),
            content: String::new(),
            script: "s".into(),
            duration_secs: 60.0,
        });
        let segs = flatten_segments(&[a, b]);
        assert_eq!(segs[0].title, "first");
        assert_eq!(segs[1].title, "second");
    }
}
