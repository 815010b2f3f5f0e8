#![allow(missing_docs)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use sombra_btree_leaf::primitives::pager::{FilePageStore, PageStore};
use sombra_btree_leaf::storage::btree::{
    BTreeIndex, IndexOptions, IndexRow, InsertOutcome, KeyPosCodec, MemRowTable, RowMode,
};
use sombra_btree_leaf::types::{PageId, Result, SombraError, TableId};
use tempfile::tempdir;

const PAGE_SIZE: usize = 128;

fn open_index(
    path: &Path,
    table: &Arc<MemRowTable>,
) -> Result<(Arc<BTreeIndex<KeyPosCodec>>, Arc<FilePageStore>)> {
    let store = Arc::new(FilePageStore::open(path, PAGE_SIZE)?);
    let codec = KeyPosCodec::new(TableId(21), table.clone());
    let index = BTreeIndex::new(codec, store.clone(), IndexOptions::default())?;
    Ok((index, store))
}

#[test]
fn split_leaves_survive_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("leaves.idx");
    let table = Arc::new(MemRowTable::new());
    let rows: Vec<IndexRow> = (0..12u64)
        .map(|pos| IndexRow::new(format!("key-{pos:02}"), pos * 10))
        .collect();

    let (left_id, right_id, split_at) = {
        let (index, store) = open_index(&path, &table)?;
        let mut left = index.create_root_leaf()?;
        let mut pending = rows.iter();
        let split_at = loop {
            let row = pending.next().expect("page fills before rows run out");
            match left.add_row_try(row.clone())? {
                InsertOutcome::Inserted => continue,
                InsertOutcome::SplitRequired(k) => {
                    let mut right = left.split(k)?;
                    assert_eq!(right.add_row_try(row.clone())?, InsertOutcome::Inserted);
                    for rest in pending.by_ref() {
                        assert_eq!(right.add_row_try(rest.clone())?, InsertOutcome::Inserted);
                        if right.free_space() < 40 {
                            break;
                        }
                    }
                    right.write()?;
                    break (k, right.id());
                }
            }
        };
        left.write()?;
        store.sync()?;
        assert!(store.dirty_pages().is_empty());
        (left.id(), split_at.1, split_at.0)
    };

    assert_eq!(fs::metadata(&path)?.len(), 3 * PAGE_SIZE as u64);
    let (index, store) = open_index(&path, &table)?;
    assert_eq!(store.page_count(), 3);
    let mut left = index.load_leaf(left_id)?;
    let mut right = index.load_leaf(right_id)?;
    assert!(left.is_root());
    assert_eq!(left.mode(), RowMode::Full);
    let left_rows = left.collect_rows()?;
    let right_rows = right.collect_rows()?;
    assert_eq!(left_rows, rows[..split_at].to_vec());
    assert_eq!(right_rows[..], rows[split_at..split_at + right_rows.len()]);
    Ok(())
}

#[test]
fn compacted_leaf_resolves_rows_after_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("compact.idx");
    let table = Arc::new(MemRowTable::new());
    let small = IndexRow::new("small", 1);
    let wide = IndexRow::new(vec![b'w'; 100], 2);
    table.insert(&small);
    table.insert(&wide);

    let id = {
        let (index, _store) = open_index(&path, &table)?;
        let mut leaf = index.create_root_leaf()?;
        assert_eq!(leaf.add_row_try(small.clone())?, InsertOutcome::Inserted);
        assert_eq!(leaf.add_row_try(wide.clone())?, InsertOutcome::Inserted);
        assert_eq!(leaf.mode(), RowMode::PositionOnly);
        leaf.write()?;
        leaf.id()
    };

    let (index, _store) = open_index(&path, &table)?;
    let mut leaf = index.load_leaf(id)?;
    assert_eq!(leaf.mode(), RowMode::PositionOnly);
    assert_eq!(leaf.collect_rows()?, vec![small, wide.clone()]);

    table.remove(wide.pos);
    let mut leaf = index.load_leaf(id)?;
    assert!(leaf.row(0).is_ok());
    assert!(leaf.row(1).unwrap_err().is_corruption());
    Ok(())
}

#[test]
fn reserved_and_unallocated_pages_are_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("empty.idx");
    let (index, store) = open_index(&path, &Arc::new(MemRowTable::new()))?;
    assert!(matches!(
        index.load_leaf(PageId(0)),
        Err(SombraError::Invalid(_))
    ));
    assert!(matches!(
        index.load_leaf(PageId(5)),
        Err(SombraError::Invalid(_))
    ));
    let blank = store.allocate_page()?;
    assert!(matches!(
        index.load_leaf(blank),
        Err(SombraError::Corruption(_))
    ));
    Ok(())
}

#[test]
fn misaligned_file_is_corruption() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("torn.idx");
    fs::write(&path, vec![0u8; PAGE_SIZE + 7])?;
    assert!(matches!(
        FilePageStore::open(&path, PAGE_SIZE),
        Err(SombraError::Corruption(_))
    ));
    Ok(())
}
