//! Property tests for in-memory vector store search ordering.

use ragline_core::document::{Chunk, IndexEntry};
use ragline_core::inmemory::InMemoryVectorStore;
use ragline_core::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate an index entry with a normalized embedding.
fn arb_entry(dim: usize) -> impl Strategy<Value = IndexEntry> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", 0usize..50, arb_normalized_embedding(dim)).prop_map(
        |(source, text, chunk_id, embedding)| IndexEntry {
            chunk: Chunk::new(text, format!("{source}.txt"), chunk_id),
            embedding,
        },
    )
}

/// *For any* set of unit-length entries stored in an InMemoryVectorStore,
/// searching with a unit query SHALL return results ordered by descending
/// cosine similarity, with scores in `[-1, 1]`, and exactly
/// `min(top_k, entry count)` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            entries in proptest::collection::vec(arb_entry(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.reset(DIM).await.unwrap();
                store.upsert(&entries).await.unwrap();
                store.search(&query, top_k).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(entries.len()));

            for result in &results {
                prop_assert!(result.score >= -1.0 - 1e-5 && result.score <= 1.0 + 1e-5);
            }

            // Results are ordered by descending score
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn repeated_search_is_identical(
            entries in proptest::collection::vec(arb_entry(DIM), 1..12),
            query in arb_normalized_embedding(DIM),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (first, second) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.reset(DIM).await.unwrap();
                store.upsert(&entries).await.unwrap();
                let first = store.search(&query, 5).await.unwrap();
                let second = store.search(&query, 5).await.unwrap();
                (first, second)
            });

            prop_assert_eq!(first, second);
        }
    }
}
