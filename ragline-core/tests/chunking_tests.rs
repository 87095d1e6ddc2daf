//! Property tests for fixed-size chunking.

use ragline_core::chunking::{Chunker, FixedSizeChunker};
use proptest::prelude::*;

/// Text without surrounding or internal whitespace, so trimming is a no-op
/// and chunk texts can be compared to raw character windows.
fn arb_dense_text(max_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::char::range('a', 'z'), 1..max_len)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Chunk size and an overlap strictly below it.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* text no longer than `chunk_size`, chunking SHALL yield exactly
    /// one chunk equal to the trimmed text.
    #[test]
    fn short_text_is_one_chunk(text in "[a-z ]{1,40}", (size, overlap) in arb_params()) {
        prop_assume!(text.chars().count() <= size);
        prop_assume!(!text.trim().is_empty());
        let chunks = FixedSizeChunker::new(size, overlap).split(&text);
        prop_assert_eq!(chunks, vec![text.trim().to_string()]);
    }

    /// *For any* text longer than `chunk_size`, consecutive chunks SHALL start
    /// `chunk_size - overlap` characters apart and the count SHALL be
    /// `ceil((len - overlap) / (chunk_size - overlap))`.
    #[test]
    fn long_text_windows_follow_step(text in arb_dense_text(300), (size, overlap) in arb_params()) {
        let chars: Vec<char> = text.chars().collect();
        prop_assume!(chars.len() > size);

        let chunker = FixedSizeChunker::new(size, overlap);
        let chunks = chunker.split(&text);
        let step = size - overlap;

        prop_assert_eq!(chunks.len(), (chars.len() - overlap).div_ceil(step));
        for (i, chunk) in chunks.iter().enumerate() {
            let start = i * step;
            let end = (start + size).min(chars.len());
            let expected: String = chars[start..end].iter().collect();
            prop_assert_eq!(chunk, &expected);
        }
    }

    /// *For any* document, `chunk` SHALL number chunks from zero and record the total.
    #[test]
    fn chunks_are_numbered(text in arb_dense_text(200), (size, overlap) in arb_params()) {
        let chunks = FixedSizeChunker::new(size, overlap).chunk("doc.txt", &text);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.chunk_id, i);
            prop_assert_eq!(chunk.total_chunks, Some(total));
            prop_assert_eq!(chunk.source.as_str(), "doc.txt");
        }
    }
}

#[test]
fn multibyte_text_is_split_on_char_boundaries() {
    let chunks = FixedSizeChunker::new(3, 1).split("héllo wörld");
    assert_eq!(chunks, vec!["hél", "llo", "o w", "wör", "rld"]);
}
