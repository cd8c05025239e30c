use std::collections::HashSet;

use docquery_lib::chunk::EmbeddedChunk;
use docquery_lib::store::{MemoryStore, VectorStore};
use proptest::prelude::*;

const DIMS: usize = 3;

fn vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, DIMS)
}

fn batch() -> impl Strategy<Value = Vec<EmbeddedChunk>> {
    prop::collection::vec(("[a-c]{1,2}", 0usize..4, vector()), 0..24).prop_map(|rows| {
        rows.into_iter()
            .map(|(text, ordinal, embedding)| EmbeddedChunk { ordinal, text, embedding })
            .collect()
    })
}

proptest! {
    #[test]
    fn nearest_is_sorted_and_bounded(chunks in batch(), query in vector(), k in 0usize..32) {
        let store = MemoryStore::new(DIMS);
        store.insert_chunks("doc", &chunks).unwrap();
        let stored = store.len().unwrap();

        let results = store.nearest(&query, k).unwrap();
        prop_assert_eq!(results.len(), k.min(stored));
        for pair in results.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn natural_key_is_unique(chunks in batch()) {
        let store = MemoryStore::new(DIMS);
        store.insert_chunks("doc", &chunks).unwrap();
        let second = store.insert_chunks("doc", &chunks).unwrap();
        prop_assert_eq!(second.inserted, 0);

        let all = store.nearest(&vec![1.0, 0.0, 0.0], usize::MAX).unwrap();
        let keys: HashSet<_> = all
            .iter()
            .map(|r| (r.chunk.text.clone(), r.chunk.ordinal, r.chunk.source_id.clone()))
            .collect();
        prop_assert_eq!(keys.len(), all.len());
    }

    #[test]
    fn report_accounts_for_every_row(chunks in batch()) {
        let store = MemoryStore::new(DIMS);
        let report = store.insert_chunks("doc", &chunks).unwrap();
        prop_assert_eq!(report.inserted + report.skipped, chunks.len());
        prop_assert_eq!(report.inserted, store.len().unwrap());
    }
}
