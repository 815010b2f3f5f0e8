#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sombra_btree_leaf::primitives::pager::{MemPageStore, PageStore};
use sombra_btree_leaf::storage::btree::{
    BTreeIndex, IndexOptions, IndexRow, InsertOutcome, KeyPosCodec, LeafPage, MemRowTable,
    RemoveOutcome,
};
use sombra_btree_leaf::types::{PageId, Result, TableId};

type Leaf = LeafPage<KeyPosCodec>;
type Entry = (Option<Vec<u8>>, u64);

fn entry(row: &IndexRow) -> Entry {
    (row.key.clone(), row.pos.0)
}

/// Leaves of a one-level tree kept in key order by the test itself.
struct Harness {
    index: Arc<BTreeIndex<KeyPosCodec>>,
    store: Arc<MemPageStore>,
    leaves: Vec<Leaf>,
}

impl Harness {
    fn new(page_size: usize) -> Result<Self> {
        let store = Arc::new(MemPageStore::new(page_size)?);
        let codec = KeyPosCodec::new(TableId(11), Arc::new(MemRowTable::new()));
        let index = BTreeIndex::new(
            codec,
            store.clone(),
            IndexOptions::default().check_invariants(true),
        )?;
        let root = index.create_root_leaf()?;
        Ok(Self {
            index,
            store,
            leaves: vec![root],
        })
    }

    fn route(&mut self, row: &IndexRow) -> Result<usize> {
        let target = entry(row);
        let last = self.leaves.len() - 1;
        for (idx, leaf) in self.leaves.iter_mut().enumerate().take(last) {
            let count = leaf.entry_count();
            if target <= entry(leaf.row(count - 1)?) {
                return Ok(idx);
            }
        }
        Ok(last)
    }

    fn insert(&mut self, row: IndexRow) -> Result<()> {
        let mut idx = self.route(&row)?;
        loop {
            match self.leaves[idx].add_row_try(row.clone())? {
                InsertOutcome::Inserted => return Ok(()),
                InsertOutcome::SplitRequired(split_point) => {
                    let mut right = self.leaves[idx].split(split_point)?;
                    let goes_right = entry(&row) >= entry(right.row(0)?);
                    self.leaves.insert(idx + 1, right);
                    if goes_right {
                        idx += 1;
                    }
                }
            }
        }
    }

    fn remove(&mut self, row: &IndexRow) -> Result<()> {
        let idx = self.route(row)?;
        match self.leaves[idx].remove(row)? {
            RemoveOutcome::PageEmptied(removed) => {
                assert_eq!(&removed, row);
                if self.leaves.len() > 1 {
                    self.leaves.remove(idx);
                } else {
                    // a root leaf cannot become empty through remove; rebuild it
                    self.leaves[0] = self.index.create_root_leaf()?;
                }
            }
            RemoveOutcome::LastRowChanged(new_last) => {
                let leaf = &mut self.leaves[idx];
                let count = leaf.entry_count();
                assert_eq!(leaf.row(count - 1)?, &new_last);
            }
            RemoveOutcome::Unchanged => {}
        }
        Ok(())
    }

    fn contents(&mut self) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        for leaf in &mut self.leaves {
            assert!(leaf.entry_count() > 0, "leaf {} left empty", leaf.id());
            out.extend(leaf.collect_rows()?.iter().map(entry));
        }
        Ok(out)
    }
}

#[test]
fn seeded_inserts_split_into_ordered_leaves() -> Result<()> {
    let mut harness = Harness::new(256)?;
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED_1EAF);
    let mut reference = BTreeSet::new();

    for pos in 0..800u64 {
        let len = rng.gen_range(1..24);
        let key: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'z')).collect();
        let row = IndexRow::new(key, pos);
        reference.insert(entry(&row));
        harness.insert(row)?;
    }

    let contents = harness.contents()?;
    assert_eq!(contents, reference.into_iter().collect::<Vec<_>>());
    assert!(harness.leaves.len() > 10);
    let stats = harness.index.stats().snapshot();
    assert_eq!(stats.splits as usize, harness.leaves.len() - 1);
    assert!(stats.split_signals >= stats.splits);
    assert_eq!(stats.compactions, 0);
    Ok(())
}

#[test]
fn mixed_workload_survives_write_and_reload() -> Result<()> {
    let mut harness = Harness::new(128)?;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut reference: BTreeSet<Entry> = BTreeSet::new();
    let mut live: Vec<IndexRow> = Vec::new();

    for pos in 0..1500u64 {
        if !live.is_empty() && rng.gen_bool(0.3) {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            reference.remove(&entry(&victim));
            harness.remove(&victim)?;
        } else {
            let key = if rng.gen_bool(0.05) {
                None
            } else {
                Some(rng.gen_range(0u32..400).to_be_bytes().to_vec())
            };
            let row = IndexRow { key, pos: pos.into() };
            reference.insert(entry(&row));
            live.push(row.clone());
            harness.insert(row)?;
        }
    }
    assert_eq!(harness.contents()?, reference.iter().cloned().collect::<Vec<_>>());

    let ids: Vec<PageId> = harness.leaves.iter().map(|leaf| leaf.id()).collect();
    for leaf in &mut harness.leaves {
        leaf.write()?;
        assert!(!leaf.is_dirty());
    }
    let dirty = harness.store.dirty_pages();
    assert!(ids.iter().all(|id| !dirty.contains(id)));
    let mut reloaded = Vec::new();
    for id in ids {
        let mut leaf = harness.index.load_leaf(id)?;
        reloaded.extend(leaf.collect_rows()?.iter().map(entry));
    }
    assert_eq!(reloaded, reference.into_iter().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn split_pages_are_fresh_store_pages() -> Result<()> {
    let mut harness = Harness::new(128)?;
    for pos in 0..40u64 {
        harness.insert(IndexRow::new(format!("row-{pos:03}"), pos))?;
    }
    let mut ids: Vec<u32> = harness.leaves.iter().map(|leaf| leaf.id().0).collect();
    ids.sort_unstable();
    let expected: Vec<u32> = (1..=ids.len() as u32).collect();
    assert_eq!(ids, expected);
    assert_eq!(harness.store.stats().allocated, ids.len() as u64);
    Ok(())
}
