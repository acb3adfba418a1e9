//! Text chunking for the generation stage.
//!
//! Chunks borrow from the extracted text, so concatenating them gives back
//! the input exactly. The budget is counted in `char`s, never bytes, so a
//! chunk boundary can never fall inside a UTF-8 sequence.

/// A contiguous slice of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    /// 0-based position in the chunk sequence.
    pub index: usize,
    pub text: &'a str,
}

impl TextChunk<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Splits text into chunks of at most `max_chars` characters.
///
/// When a window would cut a word, the chunk ends just after the last
/// whitespace character in the window. A window without whitespace is cut at
/// the budget.
#[derive(Debug, Clone)]
pub struct Chunker<'a> {
    text: &'a str,
    max_chars: usize,
}

impl<'a> Chunker<'a> {
    /// `max_chars` below 1 is treated as 1.
    pub fn new(text: &'a str, max_chars: usize) -> Self {
        Self {
            text,
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// A fresh iterator over the chunks. Each call starts from the beginning.
    pub fn chunks(&self) -> Chunks<'a> {
        Chunks {
            rest: self.text,
            max_chars: self.max_chars,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &Chunker<'a> {
    type Item = TextChunk<'a>;
    type IntoIter = Chunks<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks()
    }
}

/// Lazy iterator returned by [`Chunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_chars: usize,
    index: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = TextChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let split = split_point(self.rest, self.max_chars);
        let (head, tail) = self.rest.split_at(split);
        self.rest = tail;

        let chunk = TextChunk {
            index: self.index,
            text: head,
        };
        self.index += 1;
        Some(chunk)
    }
}

/// Byte offset where the next chunk of `text` ends.
fn split_point(text: &str, max_chars: usize) -> usize {
    // Byte offset just past the `max_chars`-th char, if the text is longer.
    let Some((window_end, next)) = text.char_indices().nth(max_chars) else {
        return text.len();
    };

    // The window ends exactly at a word boundary.
    if next.is_whitespace() {
        return window_end;
    }

    let window = &text[..window_end];
    match window.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((i, c)) => i + c.len_utf8(),
        None => window_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str, max: usize) -> Vec<&str> {
        Chunker::new(text, max).chunks().map(|c| c.text).collect()
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(collect("", 10).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(collect("hello world", 100), vec!["hello world"]);
    }

    #[test]
    fn breaks_after_whitespace() {
        assert_eq!(
            collect("alpha beta gamma", 8),
            vec!["alpha ", "beta ", "gamma"]
        );
    }

    #[test]
    fn hard_split_without_whitespace() {
        assert_eq!(collect("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let text = "ééééé ééééé";
        let chunks = collect(text, 6);
        assert_eq!(chunks, vec!["ééééé ", "ééééé"]);
        for c in &chunks {
            assert!(c.chars().count() <= 6);
        }
    }

    #[test]
    fn round_trip_and_bound() {
        let text = "Lorem ipsum dolor sit amet,\nconsectetur adipiscing elit. \
                    Pellentesque_habitant_morbi_tristique senectus et netus. ünïcödé ✓ text";
        for max in 1..=40 {
            let chunks = collect(text, max);
            assert_eq!(chunks.concat(), text, "max={max}");
            assert!(
                chunks.iter().all(|c| c.chars().count() <= max && !c.is_empty()),
                "max={max}"
            );
        }
    }

    #[test]
    fn chunks_are_restartable_and_indexed() {
        let chunker = Chunker::new("one two three four", 5);
        let first: Vec<_> = chunker.chunks().collect();
        let second: Vec<_> = (&chunker).into_iter().collect();
        assert_eq!(first, second);
        let indices: Vec<_> = first.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..first.len()).collect::<Vec<_>>());
    }

    #[test]
    fn zero_budget_is_clamped() {
        let chunker = Chunker::new("ab", 0);
        assert_eq!(chunker.max_chars(), 1);
        assert_eq!(chunker.chunks().count(), 2);
    }

    #[test]
    fn blank_chunk_detection() {
        let chunks: Vec<_> = Chunker::new("   \n\t", 10).chunks().collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_blank());
    }
}
