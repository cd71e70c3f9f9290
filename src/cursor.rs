//! Position within a table's B-tree, used for both point lookup and
//! leaf-local scanning.
//!
//! A cursor is always bound to a single leaf page: `advance` walks cells
//! within that leaf and sets `end_of_table` once it runs out, it never
//! chases a sibling pointer (leaves don't carry one here). Visiting every
//! leaf in key order is the executor's job, done by walking the tree and
//! opening a fresh cursor per leaf via [`Cursor::at_leaf_start`].

use crate::error::StorageError;
use crate::node::{LeafNode, Node, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS};
use crate::row::ROW_SIZE;
use crate::table::Table;

pub struct Cursor<'a> {
    table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Descends from the root looking for `key`. Lands on the cell that
    /// holds `key` if present, or the cell it would occupy otherwise.
    /// `end_of_table` is set when that slot is past the last cell.
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, StorageError> {
        let mut page_num = table.root_page_num;

        loop {
            let page = table.pager.get_page(page_num)?;
            match Node::from_page(page) {
                Node::Leaf(leaf) => {
                    let cell_num = leaf.find_key_slot(key);
                    let end_of_table = cell_num >= leaf.num_cells();
                    return Ok(Cursor {
                        table,
                        page_num,
                        cell_num,
                        end_of_table,
                    });
                }
                Node::Internal(internal) => {
                    let child_num = internal.find_child(key);
                    page_num = internal.child(child_num);
                }
            }
        }
    }

    /// A cursor positioned at the first cell of the leaf at `page_num`.
    /// The caller is responsible for knowing `page_num` names a leaf.
    pub fn at_leaf_start(table: &'a mut Table, page_num: u32) -> Result<Self, StorageError> {
        let page = table.pager.get_page(page_num)?;
        let leaf = LeafNode::new(page);
        let end_of_table = leaf.num_cells() == 0;
        Ok(Cursor {
            table,
            page_num,
            cell_num: 0,
            end_of_table,
        })
    }

    /// The row bytes at the cursor's current position.
    pub fn value(&mut self) -> Result<&[u8], StorageError> {
        let page = self.table.pager.get_page(self.page_num)?;
        Ok(LeafNode::new(page).value(self.cell_num))
    }

    /// Moves one cell forward within the current leaf. Never follows a
    /// sibling: once past the last cell, `end_of_table` is set and stays
    /// set until the cursor is repositioned with [`Cursor::find`] or
    /// [`Cursor::at_leaf_start`].
    pub fn advance(&mut self) -> Result<(), StorageError> {
        self.cell_num += 1;
        let page = self.table.pager.get_page(self.page_num)?;
        let leaf = LeafNode::new(page);
        if self.cell_num >= leaf.num_cells() {
            self.end_of_table = true;
        }
        Ok(())
    }

    /// Inserts `row_bytes` at `key`'s sorted position in the leaf the
    /// cursor is bound to, splitting the leaf first if it's full.
    pub fn insert(&mut self, key: u32, row_bytes: &[u8]) -> Result<(), StorageError> {
        let page = self.table.pager.get_page(self.page_num)?;
        let mut leaf = LeafNode::new(page);
        let num_cells = leaf.num_cells();

        if (num_cells as usize) < LEAF_NODE_MAX_CELLS {
            for i in (self.cell_num..num_cells).rev() {
                let moved = leaf.value(i).to_vec();
                let moved_key = leaf.key(i);
                leaf.set_key(i + 1, moved_key);
                leaf.value_mut(i + 1).copy_from_slice(&moved);
            }
            leaf.set_num_cells(num_cells + 1);
            leaf.set_key(self.cell_num, key);
            leaf.value_mut(self.cell_num).copy_from_slice(row_bytes);
            return Ok(());
        }

        self.leaf_split_and_insert(key, row_bytes)
    }

    /// Splits a full leaf into two, distributing the existing cells plus
    /// the new one across both, then updates (or creates) the parent.
    fn leaf_split_and_insert(&mut self, key: u32, row_bytes: &[u8]) -> Result<(), StorageError> {
        let mut all_cells: Vec<(u32, [u8; ROW_SIZE])> =
            Vec::with_capacity(LEAF_NODE_MAX_CELLS + 1);
        {
            let old_page = self.table.pager.get_page(self.page_num)?;
            let old_leaf = LeafNode::new(old_page);
            let num_cells = old_leaf.num_cells();
            for i in 0..num_cells {
                if i == self.cell_num {
                    let mut buf = [0u8; ROW_SIZE];
                    buf.copy_from_slice(row_bytes);
                    all_cells.push((key, buf));
                }
                let mut buf = [0u8; ROW_SIZE];
                buf.copy_from_slice(old_leaf.value(i));
                all_cells.push((old_leaf.key(i), buf));
            }
            if self.cell_num == num_cells {
                let mut buf = [0u8; ROW_SIZE];
                buf.copy_from_slice(row_bytes);
                all_cells.push((key, buf));
            }
        }

        let old_page_num = self.page_num;
        let (was_root, old_parent) = {
            let old_page = self.table.pager.get_page(old_page_num)?;
            let old_leaf = LeafNode::new(old_page);
            (old_leaf.is_root(), old_leaf.parent())
        };

        let new_page_num = self.table.pager.allocate_new_page();

        {
            let old_page = self.table.pager.get_page(old_page_num)?;
            let mut old_leaf = LeafNode::new(old_page);
            old_leaf.initialize();
            old_leaf.set_is_root(false);
            old_leaf.set_parent(old_parent);
            old_leaf.set_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
            for (i, (cell_key, cell_value)) in
                all_cells[..LEAF_NODE_LEFT_SPLIT_COUNT].iter().enumerate()
            {
                old_leaf.set_key(i as u32, *cell_key);
                old_leaf.value_mut(i as u32).copy_from_slice(cell_value);
            }
        }

        {
            let new_page = self.table.pager.get_page(new_page_num)?;
            let mut new_leaf = LeafNode::new(new_page);
            new_leaf.initialize();
            new_leaf.set_is_root(false);
            new_leaf.set_parent(old_parent);
            let right_cells = &all_cells[LEAF_NODE_LEFT_SPLIT_COUNT..];
            new_leaf.set_num_cells(right_cells.len() as u32);
            for (i, (cell_key, cell_value)) in right_cells.iter().enumerate() {
                new_leaf.set_key(i as u32, *cell_key);
                new_leaf.value_mut(i as u32).copy_from_slice(cell_value);
            }
        }

        if was_root {
            self.table.create_new_root(new_page_num)
        } else {
            Err(StorageError::UnimplementedParentUpdate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use tempfile::NamedTempFile;

    fn insert_row(table: &mut Table, id: u32) {
        let mut cursor = Cursor::find(table, id).unwrap();
        let row = Row::new(id, "user", "user@example.com");
        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        cursor.insert(id, &buf).unwrap();
    }

    #[test]
    fn insert_and_find_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path().to_str().unwrap()).unwrap();

        insert_row(&mut table, 3);
        insert_row(&mut table, 1);
        insert_row(&mut table, 2);

        let mut cursor = Cursor::find(&mut table, 2).unwrap();
        assert!(!cursor.end_of_table);
        let row = Row::deserialize(cursor.value().unwrap());
        assert_eq!(row.id, 2);
    }

    #[test]
    fn scan_from_leaf_start_visits_cells_in_ascending_order() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path().to_str().unwrap()).unwrap();

        insert_row(&mut table, 5);
        insert_row(&mut table, 1);
        insert_row(&mut table, 3);

        let mut cursor = Cursor::at_leaf_start(&mut table, table.root_page_num).unwrap();
        let mut ids = Vec::new();
        while !cursor.end_of_table {
            ids.push(Row::deserialize(cursor.value().unwrap()).id);
            cursor.advance().unwrap();
        }
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn filling_a_leaf_past_capacity_splits_into_an_internal_root() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path().to_str().unwrap()).unwrap();

        for id in 1..=(LEAF_NODE_MAX_CELLS as u32 + 1) {
            insert_row(&mut table, id);
        }

        let page = table.pager.get_page(table.root_page_num).unwrap();
        match Node::from_page(page) {
            Node::Internal(internal) => assert_eq!(internal.num_keys(), 1),
            Node::Leaf(_) => panic!("expected root to have split into an internal node"),
        }
    }
}
