use super::test_support::{doc_index, CollidingAdapter, Doc, DocAdapter};
use crate::error::IndexError;
use crate::index::{IndexConfig, MultiIndex};

#[test]
fn test_empty_index() {
    let index = doc_index(1, 16);
    assert_eq!(index.size(), 0);
    assert!(index.is_empty());
    assert_eq!(index.lookup(&Doc::new(1, 1)), None);
    assert!(index.lookup_by_key(&1, 0).is_empty());
    assert!(index.lookup_continue_after(&Doc::new(1, 1), 0).is_empty());
    assert_eq!(index.selectivity(), 1.0);
}

#[test]
fn test_insert_then_lookup() {
    let mut index = doc_index(1, 16);
    let doc = Doc::new(10, 1);

    let prior = index.insert(doc.clone(), false, true).unwrap();
    assert!(prior.is_none());
    assert_eq!(index.lookup(&doc), Some(doc.clone()));
    assert_eq!(index.size(), 1);

    // a record with the same key but different identity is not found
    assert_eq!(index.lookup(&Doc::new(10, 2)), None);
}

#[test]
fn test_group_order_is_head_then_stacked_members() {
    let mut index = doc_index(1, 16);
    let r1 = Doc::new(1, 1);
    let r2 = Doc::new(1, 2);
    let r3 = Doc::new(2, 3);

    index.insert(r1.clone(), false, true).unwrap();
    index.insert(r2.clone(), false, true).unwrap();
    index.insert(r3.clone(), false, true).unwrap();

    assert_eq!(index.lookup_by_key(&1, 0), vec![r1.clone(), r2.clone()]);
    assert_eq!(index.lookup_by_key(&2, 0), vec![r3]);
    assert_eq!(index.size(), 3);

    // new members splice in right after the head
    let r4 = Doc::new(1, 4);
    index.insert(r4.clone(), false, true).unwrap();
    assert_eq!(index.lookup_by_key(&1, 0), vec![r1, r4, r2]);
    index.validate();
}

#[test]
fn test_remove_head_promotes_first_member() {
    let mut index = doc_index(1, 16);
    let r1 = Doc::new(1, 1);
    let r2 = Doc::new(1, 2);
    let r3 = Doc::new(2, 3);
    index.insert(r1.clone(), false, true).unwrap();
    index.insert(r2.clone(), false, true).unwrap();
    index.insert(r3.clone(), false, true).unwrap();

    // one of three records is a duplicate-key member
    assert!((index.selectivity() - 2.0 / 3.0).abs() < 1e-9);

    let removed = index.remove(&r1);
    assert_eq!(removed, Some(r1));

    // r2 now heads its group; validate() checks its re-cached key hash
    assert_eq!(index.lookup_by_key(&1, 0), vec![r2]);
    assert_eq!(index.size(), 2);
    assert_eq!(index.selectivity(), 1.0);
    index.validate();
}

#[test]
fn test_remove_sole_member_dissolves_group() {
    let mut index = doc_index(1, 16);
    let a = Doc::new(1, 1);
    let b = Doc::new(2, 2);
    index.insert(a.clone(), false, true).unwrap();
    index.insert(b.clone(), false, true).unwrap();

    assert_eq!(index.remove(&a), Some(a.clone()));
    assert!(index.lookup_by_key(&1, 0).is_empty());
    assert_eq!(index.lookup(&a), None);
    assert_eq!(index.lookup_by_key(&2, 0), vec![b]);
    index.validate();
}

#[test]
fn test_remove_middle_member_splices_list() {
    let mut index = doc_index(1, 16);
    let docs: Vec<Doc> = (0..4).map(|seq| Doc::new(7, seq)).collect();
    for doc in &docs {
        index.insert(doc.clone(), false, true).unwrap();
    }
    // list is head, then members stacked: [0, 3, 2, 1]
    assert_eq!(
        index.lookup_by_key(&7, 0),
        vec![
            docs[0].clone(),
            docs[3].clone(),
            docs[2].clone(),
            docs[1].clone()
        ]
    );

    assert_eq!(index.remove(&docs[2]), Some(docs[2].clone()));
    assert_eq!(
        index.lookup_by_key(&7, 0),
        vec![docs[0].clone(), docs[3].clone(), docs[1].clone()]
    );
    index.validate();
}

#[test]
fn test_remove_missing_record() {
    let mut index = doc_index(1, 16);
    index.insert(Doc::new(1, 1), false, true).unwrap();
    assert_eq!(index.remove(&Doc::new(1, 99)), None);
    assert_eq!(index.remove(&Doc::new(99, 1)), None);
    assert_eq!(index.size(), 1);
}

#[test]
fn test_reinsert_is_idempotent_and_returns_prior() {
    let mut index = doc_index(1, 16);
    let doc = Doc::new(5, 5);
    assert!(index.insert(doc.clone(), false, true).unwrap().is_none());

    let prior = index.insert(doc.clone(), false, true).unwrap();
    assert_eq!(prior, Some(doc.clone()));
    assert_eq!(index.size(), 1);
    assert_eq!(index.lookup_by_key(&5, 0), vec![doc]);
}

#[test]
fn test_overwrite_replaces_stored_handle() {
    let mut index = doc_index(1, 16);
    let original = Doc::stamped(5, 5, 1);
    let replacement = Doc::stamped(5, 5, 2);
    index.insert(original.clone(), false, true).unwrap();

    // without overwrite the stored handle is untouched
    let prior = index.insert(replacement.clone(), false, true).unwrap();
    assert_eq!(prior.unwrap().stamp, 1);
    assert_eq!(index.lookup(&original).unwrap().stamp, 1);

    // with overwrite the prior handle comes back and the new one is stored
    let prior = index.insert(replacement.clone(), true, true).unwrap();
    assert_eq!(prior.unwrap().stamp, 1);
    assert_eq!(index.lookup(&original).unwrap().stamp, 2);
    assert_eq!(index.size(), 1);
}

#[test]
fn test_overwrite_replaces_member_handle() {
    let mut index = doc_index(1, 16);
    let head = Doc::new(5, 1);
    let member = Doc::stamped(5, 2, 1);
    index.insert(head.clone(), false, true).unwrap();
    index.insert(member.clone(), false, true).unwrap();

    let replacement = Doc::stamped(5, 2, 9);
    let prior = index.insert(replacement, true, true).unwrap();
    assert_eq!(prior.unwrap().stamp, 1);
    assert_eq!(index.lookup(&member).unwrap().stamp, 9);
    assert_eq!(index.size(), 2);
    index.validate();
}

#[test]
fn test_growth_trigger_resizes_to_next_prime() {
    let mut index = doc_index(1, 4);
    assert_eq!(index.capacity(), 4);

    // sixth distinct key; the fourth insert finds the bucket past 2/3 full
    // and grows it to the next prime >= 9
    for key in 0..6 {
        index.insert(Doc::new(key, key), false, true).unwrap();
    }
    assert_eq!(index.capacity(), 11);
    assert_eq!(index.stats().resizes, 1);

    for key in 0..6 {
        assert_eq!(index.lookup(&Doc::new(key, key)), Some(Doc::new(key, key)));
    }
    index.validate();
}

#[test]
fn test_limit_semantics() {
    let mut index = doc_index(1, 32);
    for seq in 0..5 {
        index.insert(Doc::new(1, seq), false, true).unwrap();
    }

    assert_eq!(index.lookup_by_key(&1, 0).len(), 5);
    assert_eq!(index.lookup_by_key(&1, 2).len(), 2);
    assert_eq!(index.lookup_by_key(&1, 10).len(), 5);
}

#[test]
fn test_continuation_pages_through_group() {
    let mut index = doc_index(1, 32);
    for seq in 0..7 {
        index.insert(Doc::new(3, seq), false, true).unwrap();
    }
    let all = index.lookup_by_key(&3, 0);
    assert_eq!(all.len(), 7);

    // page through with a window of 2 and compare against the full scan
    let mut paged = index.lookup_by_key(&3, 2);
    loop {
        let next = index.lookup_continue_after(paged.last().unwrap(), 2);
        if next.is_empty() {
            break;
        }
        paged.extend(next);
    }
    assert_eq!(paged, all);
}

#[test]
fn test_continuation_after_head_uses_key_hash_fallback() {
    let mut index = doc_index(1, 32);
    let head = Doc::new(3, 0);
    index.insert(head.clone(), false, true).unwrap();
    for seq in 1..4 {
        index.insert(Doc::new(3, seq), false, true).unwrap();
    }

    // the head is placed by key hash, so the full-record-hash probe misses
    // and the key-hash fallback must re-locate it
    let rest = index.lookup_continue_after(&head, 0);
    assert_eq!(rest, index.lookup_by_key(&3, 0)[1..].to_vec());
}

#[test]
fn test_continuation_after_unknown_record_is_empty() {
    let mut index = doc_index(1, 16);
    index.insert(Doc::new(3, 0), false, true).unwrap();
    assert!(index.lookup_continue_after(&Doc::new(99, 9), 0).is_empty());
}

#[test]
fn test_bulk_load_mode_skips_equality() {
    let mut index = doc_index(1, 16);
    for seq in 0..8 {
        index.insert(Doc::new(2, seq), false, false).unwrap();
    }
    assert_eq!(index.size(), 8);
    assert_eq!(index.lookup_by_key(&2, 0).len(), 8);
    index.validate();
}

#[test]
fn test_selectivity() {
    let mut index = doc_index(1, 32);
    for key in 0..4 {
        index.insert(Doc::new(key, 0), false, true).unwrap();
    }
    assert_eq!(index.selectivity(), 1.0);

    for seq in 1..4 {
        index.insert(Doc::new(0, seq), false, true).unwrap();
    }
    // 4 of 7 records are group heads
    assert!((index.selectivity() - 4.0 / 7.0).abs() < 1e-9);
}

#[test]
fn test_memory_usage_and_capacity() {
    let index = doc_index(4, 64);
    assert_eq!(index.num_buckets(), 4);
    assert_eq!(index.capacity(), 4 * 64);
    assert!(index.memory_usage() >= index.capacity() * std::mem::size_of::<u64>());
}

#[test]
fn test_bucket_count_rounds_up_to_power_of_two() {
    let index = MultiIndex::new(
        DocAdapter,
        IndexConfig::builder()
            .num_buckets(5)
            .initial_capacity(16)
            .build(),
    )
    .unwrap();
    assert_eq!(index.num_buckets(), 8);
}

#[test]
fn test_colliding_key_hashes_share_a_bucket() {
    let mut index = MultiIndex::new(
        CollidingAdapter,
        IndexConfig::builder()
            .num_buckets(4)
            .initial_capacity(8)
            .build(),
    )
    .unwrap();

    // every key hash has its low byte cleared, so all 12 keys route to
    // bucket 0 and force it through several growths
    for key in 0..12 {
        index.insert(Doc::new(key, key), false, true).unwrap();
    }
    assert_eq!(index.size(), 12);
    for key in 0..12 {
        assert_eq!(index.lookup_by_key(&key, 0), vec![Doc::new(key, key)]);
    }
    index.validate();
}

#[test]
fn test_resize_preserves_contents_and_order() {
    let mut index = doc_index(2, 16);
    for key in 0..6 {
        for seq in 0..3 {
            index.insert(Doc::new(key, seq), false, true).unwrap();
        }
    }
    let before: Vec<Vec<Doc>> = (0..6).map(|key| index.lookup_by_key(&key, 0)).collect();

    index.resize(512).unwrap();

    assert!(index.capacity() >= 512);
    for key in 0..6 {
        assert_eq!(index.lookup_by_key(&key, 0), before[key as usize]);
    }
    index.validate();
}

#[test]
fn test_resize_too_small_is_rejected() {
    let mut index = doc_index(1, 16);
    for key in 0..10 {
        index.insert(Doc::new(key, key), false, true).unwrap();
    }

    let err = index.resize(1).unwrap_err();
    assert!(matches!(err, IndexError::ResizeTooSmall { used: 10, .. }));

    // the failed resize left the index fully usable
    assert_eq!(index.size(), 10);
    index.validate();
}

#[test]
fn test_remove_then_reinsert_restores_group() {
    let mut index = doc_index(1, 16);
    let docs: Vec<Doc> = (0..3).map(|seq| Doc::new(4, seq)).collect();
    for doc in &docs {
        index.insert(doc.clone(), false, true).unwrap();
    }

    index.remove(&docs[1]);
    index.insert(docs[1].clone(), false, true).unwrap();

    let mut group = index.lookup_by_key(&4, 0);
    group.sort_by_key(|doc| doc.seq);
    assert_eq!(group, docs);
    assert_eq!(index.size(), 3);
    index.validate();
}

#[test]
fn test_iterate_visits_every_record_once() {
    let mut index = doc_index(2, 16);
    for key in 0..5 {
        for seq in 0..2 {
            index.insert(Doc::new(key, seq), false, true).unwrap();
        }
    }

    let mut seen = Vec::new();
    index.iterate(|doc| seen.push(doc.clone()));
    seen.sort_by_key(|doc| (doc.key, doc.seq));

    let mut expected = Vec::new();
    for key in 0..5 {
        for seq in 0..2 {
            expected.push(Doc::new(key, seq));
        }
    }
    assert_eq!(seen, expected);
}

#[test]
fn test_stats_counters() {
    let mut index = doc_index(1, 16);
    index.insert(Doc::new(1, 1), false, true).unwrap();
    index.insert(Doc::new(1, 2), false, true).unwrap();
    index.lookup(&Doc::new(1, 1));
    index.lookup_by_key(&1, 0);
    index.remove(&Doc::new(1, 2));

    let stats = index.stats();
    assert_eq!(stats.inserts, 2);
    assert_eq!(stats.lookups, 2);
    assert_eq!(stats.removes, 1);
    assert_eq!(stats.records, 1);
    assert_eq!(stats.allocated_slots, 16);
}
