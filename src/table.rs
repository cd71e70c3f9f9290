use log::info;

use crate::error::StorageError;
use crate::node::{InternalNode, LeafNode, Node};
use crate::pager::{Pager, PAGE_SIZE};

/// Owns a pager and the page number of the B-tree root. The root page
/// number never changes -- splitting the root rewrites its bytes in
/// place as an internal node rather than reallocating it (see
/// [`Table::create_new_root`]).
pub struct Table {
    pub(crate) pager: Pager,
    pub root_page_num: u32,
}

impl Table {
    pub fn open(filename: &str) -> Result<Self, StorageError> {
        let mut pager = Pager::open(filename)?;
        let root_page_num = 0;

        if pager.num_pages() == 0 {
            let page = pager.get_page(root_page_num)?;
            let mut root = LeafNode::new(page);
            root.initialize();
            root.set_is_root(true);
            info!("initialized fresh database with an empty root leaf");
        } else {
            info!("opened existing database ({} page(s))", pager.num_pages());
        }

        Ok(Self {
            pager,
            root_page_num,
        })
    }

    /// Flushes every resident page and closes the backing file. Must be
    /// called before the process exits for the database to be durable;
    /// the `.exit` REPL command is the normal caller.
    pub fn close(&mut self) -> Result<(), StorageError> {
        self.pager.shutdown()?;
        info!("table closed");
        Ok(())
    }

    /// Direct page access for callers outside the crate, such as the
    /// `.btree`/`.constants` debug commands.
    pub fn page(&mut self, page_num: u32) -> Result<&mut [u8; PAGE_SIZE], StorageError> {
        self.pager.get_page(page_num)
    }

    /// Replaces the root leaf (which has just split) with an internal
    /// node pointing at a new left child (a copy of the old root) and
    /// `right_child_page_num`. The root page number itself never moves.
    pub(crate) fn create_new_root(
        &mut self,
        right_child_page_num: u32,
    ) -> Result<(), StorageError> {
        let left_child_page_num = self.pager.allocate_new_page();

        let root_snapshot: [u8; PAGE_SIZE] = *self.pager.get_page(self.root_page_num)?;
        let left_max_key = {
            let mut snapshot = root_snapshot;
            Node::from_page(&mut snapshot).max_key()
        };

        {
            let left_page = self.pager.get_page(left_child_page_num)?;
            *left_page = root_snapshot;
            Node::from_page(left_page).set_is_root(false);
        }

        {
            let root_page = self.pager.get_page(self.root_page_num)?;
            let mut root = InternalNode::new(root_page);
            root.initialize();
            root.set_is_root(true);
            root.set_num_keys(1);
            root.set_child(0, left_child_page_num);
            root.set_key(0, left_max_key);
            root.set_right_child(right_child_page_num);
        }

        log::debug!(
            "root split: left child at page {left_child_page_num} (max key {left_max_key}), right child at page {right_child_page_num}"
        );
        Ok(())
    }
}
