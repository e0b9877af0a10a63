use crate::models::{Chunk, PipelineOptions, SegmentationPolicy};

/// Sentence-terminal punctuation, including the Arabic question mark.
pub const SENTENCE_TERMINALS: [char; 4] = ['.', '?', '!', '؟'];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub policy: SegmentationPolicy,
    pub max_chars: usize,
    pub min_chars: usize,
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            policy: value.segmentation,
            max_chars: value.chunk_max_chars,
            min_chars: value.min_chunk_chars,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&PipelineOptions::default())
    }
}

fn is_terminal(ch: char) -> bool {
    SENTENCE_TERMINALS.contains(&ch)
}

/// Splits on sentence terminals and embedded newlines. Terminals stay
/// attached to the sentence they close; runs like `?!` or `...` close once.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' || ch == '\r' {
            flush(&mut sentences, &mut current);
            continue;
        }

        current.push(ch);
        if is_terminal(ch) {
            while let Some(&next) = chars.peek() {
                if !is_terminal(next) {
                    break;
                }
                current.push(next);
                chars.next();
            }
            flush(&mut sentences, &mut current);
        }
    }
    flush(&mut sentences, &mut current);

    sentences
}

fn flush(target: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        target.push(trimmed.to_string());
    }
    current.clear();
}

/// Greedily packs whitespace-delimited words into chunks of at most
/// `max_chars` characters. A single word longer than the budget becomes its
/// own chunk.
pub fn pack_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Segments canonical text into chunks and drops every chunk whose trimmed
/// length does not exceed `min_chars`.
pub fn build_chunks(text: &str, config: ChunkingConfig) -> Vec<Chunk> {
    let raw = match config.policy {
        SegmentationPolicy::Sentence => split_sentences(text),
        SegmentationPolicy::WordBudget => pack_words(text, config.max_chars),
    };

    let produced = raw.len();
    let chunks: Vec<Chunk> = raw
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| piece.chars().count() > config.min_chars)
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect();

    tracing::debug!(
        policy = ?config.policy,
        produced,
        kept = chunks.len(),
        "segmented text"
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: SegmentationPolicy, max_chars: usize, min_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            policy,
            max_chars,
            min_chars,
        }
    }

    #[test]
    fn sentences_keep_their_terminals() {
        let sentences = split_sentences("First one. Second one? Third one! Fourth");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one?", "Third one!", "Fourth"]
        );
    }

    #[test]
    fn arabic_question_mark_and_newlines_split() {
        let sentences = split_sentences("ما هو العلم؟ العلم نور\nوالجهل ظلام");
        assert_eq!(sentences, vec!["ما هو العلم؟", "العلم نور", "والجهل ظلام"]);
    }

    #[test]
    fn terminal_runs_close_a_single_sentence() {
        let sentences = split_sentences("Wait... Really?! Yes.");
        assert_eq!(sentences, vec!["Wait...", "Really?!", "Yes."]);
    }

    #[test]
    fn short_sentences_are_filtered() {
        let chunks = build_chunks(
            "Too short. This sentence is comfortably long enough.",
            config(SegmentationPolicy::Sentence, 512, 20),
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "This sentence is comfortably long enough.");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let exactly_twenty = "abcdefghij klmnopqr.";
        assert_eq!(exactly_twenty.chars().count(), 20);

        let chunks = build_chunks(exactly_twenty, config(SegmentationPolicy::Sentence, 512, 20));
        assert!(chunks.is_empty());
    }

    #[test]
    fn word_budget_packs_greedily_and_flushes_the_tail() {
        let chunks = pack_words("aaa bbb ccc ddd eee", 11);
        assert_eq!(chunks, vec!["aaa bbb ccc", "ddd eee"]);
    }

    #[test]
    fn oversized_word_becomes_its_own_chunk() {
        let long_word = "x".repeat(40);
        let text = format!("tiny {long_word} tail words");
        let chunks = pack_words(&text, 10);

        assert_eq!(chunks, vec!["tiny".to_string(), long_word, "tail words".to_string()]);
    }

    #[test]
    fn oversized_word_survives_filtering() {
        let long_word = "y".repeat(64);
        let chunks = build_chunks(&long_word, config(SegmentationPolicy::WordBudget, 16, 10));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, long_word);
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let chunks = pack_words("علم نور جهل ظلام", 7);
        assert_eq!(chunks, vec!["علم نور", "جهل", "ظلام"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(build_chunks("", ChunkingConfig::default()).is_empty());
        assert!(pack_words("   ", 10).is_empty());
    }
}
