//! Typed projections over a raw 4096-byte page buffer.
//!
//! A page is either a leaf node (holds rows) or an internal node (routes
//! searches). Both share a six-byte common header; [`LeafNode`] and
//! [`InternalNode`] are thin, non-owning wrappers around `&mut [u8;
//! PAGE_SIZE]` that know how to read and write their half of the layout.
//! [`Node`] is the tagged union over the two, used wherever the caller
//! doesn't yet know which kind of page it holds.
use crate::pager::PAGE_SIZE;
use crate::row::ROW_SIZE;

// Common node header layout (6 bytes).
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_OFFSET: usize = 1;
pub const PARENT_POINTER_OFFSET: usize = 2;
pub const COMMON_NODE_HEADER_SIZE: usize = 6;

// Leaf node header layout.
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_HEADER_SIZE: usize = COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE;

// Leaf node body layout.
pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header layout.
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal node body layout.
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// The one-byte discriminant stored at `NODE_TYPE_OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

impl NodeType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => NodeType::Internal,
            1 => NodeType::Leaf,
            other => unreachable!("corrupt node type byte: {other}"),
        }
    }
}

/// Accessors shared by both node kinds: type, root flag, parent pointer.
/// Both [`LeafNode`] and [`InternalNode`] implement this by delegating to
/// the same offsets in their underlying buffer.
trait CommonHeader {
    fn page(&self) -> &[u8; PAGE_SIZE];
    fn page_mut(&mut self) -> &mut [u8; PAGE_SIZE];

    fn node_type(&self) -> NodeType {
        NodeType::from_byte(self.page()[NODE_TYPE_OFFSET])
    }

    fn set_node_type(&mut self, node_type: NodeType) {
        self.page_mut()[NODE_TYPE_OFFSET] = node_type as u8;
    }

    fn is_root(&self) -> bool {
        self.page()[IS_ROOT_OFFSET] != 0
    }

    fn set_is_root(&mut self, is_root: bool) {
        self.page_mut()[IS_ROOT_OFFSET] = is_root as u8;
    }

    fn parent(&self) -> u32 {
        read_u32(self.page(), PARENT_POINTER_OFFSET)
    }

    fn set_parent(&mut self, parent: u32) {
        write_u32(self.page_mut(), PARENT_POINTER_OFFSET, parent);
    }
}

fn read_u32(page: &[u8; PAGE_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes(page[offset..offset + 4].try_into().expect("4 bytes"))
}

fn write_u32(page: &mut [u8; PAGE_SIZE], offset: usize, value: u32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// A leaf page: a packed, ascending-by-key array of (key, row) cells.
pub struct LeafNode<'a> {
    page: &'a mut [u8; PAGE_SIZE],
}

impl CommonHeader for LeafNode<'_> {
    fn page(&self) -> &[u8; PAGE_SIZE] {
        self.page
    }
    fn page_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        self.page
    }
}

impl<'a> LeafNode<'a> {
    pub fn new(page: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { page }
    }

    /// Resets the page to an empty leaf: zeroed body, `node_type = Leaf`,
    /// `is_root = false`, `num_cells = 0`. Callers set `is_root`/`parent`
    /// afterward if needed.
    pub fn initialize(&mut self) {
        self.page.fill(0);
        self.set_node_type(NodeType::Leaf);
        self.set_is_root(false);
        self.set_num_cells(0);
    }

    pub fn is_root(&self) -> bool {
        CommonHeader::is_root(self)
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        CommonHeader::set_is_root(self, is_root)
    }

    pub fn parent(&self) -> u32 {
        CommonHeader::parent(self)
    }

    pub fn set_parent(&mut self, parent: u32) {
        CommonHeader::set_parent(self, parent)
    }

    pub fn num_cells(&self) -> u32 {
        read_u32(self.page, LEAF_NODE_NUM_CELLS_OFFSET)
    }

    pub fn set_num_cells(&mut self, num_cells: u32) {
        write_u32(self.page, LEAF_NODE_NUM_CELLS_OFFSET, num_cells)
    }

    fn cell_offset(cell_num: u32) -> usize {
        LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE
    }

    pub fn key(&self, cell_num: u32) -> u32 {
        read_u32(self.page, Self::cell_offset(cell_num))
    }

    pub fn set_key(&mut self, cell_num: u32, key: u32) {
        write_u32(self.page, Self::cell_offset(cell_num), key)
    }

    pub fn value(&self, cell_num: u32) -> &[u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        &self.page[start..start + LEAF_NODE_VALUE_SIZE]
    }

    pub fn value_mut(&mut self, cell_num: u32) -> &mut [u8] {
        let start = Self::cell_offset(cell_num) + LEAF_NODE_KEY_SIZE;
        &mut self.page[start..start + LEAF_NODE_VALUE_SIZE]
    }

    /// The largest key stored in this leaf.
    ///
    /// # Panics
    /// Panics if the leaf is empty.
    pub fn max_key(&self) -> u32 {
        self.key(self.num_cells() - 1)
    }

    /// Binary search for `key`. Returns the index at which it exists, or
    /// the index at which it would be inserted to keep cells sorted.
    pub fn find_key_slot(&self, key: u32) -> u32 {
        let mut lo = 0u32;
        let mut hi = self.num_cells();
        while lo != hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) >= key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

/// An internal page: `num_keys` routing cells plus a dedicated right
/// child pointer. `child(i)` returns `right_child` when `i == num_keys`.
pub struct InternalNode<'a> {
    page: &'a mut [u8; PAGE_SIZE],
}

impl CommonHeader for InternalNode<'_> {
    fn page(&self) -> &[u8; PAGE_SIZE] {
        self.page
    }
    fn page_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        self.page
    }
}

impl<'a> InternalNode<'a> {
    pub fn new(page: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { page }
    }

    /// Resets the page to an empty internal node: zeroed body,
    /// `node_type = Internal`, `is_root = false`, `num_keys = 0`.
    pub fn initialize(&mut self) {
        self.page.fill(0);
        self.set_node_type(NodeType::Internal);
        self.set_is_root(false);
        self.set_num_keys(0);
    }

    pub fn is_root(&self) -> bool {
        CommonHeader::is_root(self)
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        CommonHeader::set_is_root(self, is_root)
    }

    pub fn parent(&self) -> u32 {
        CommonHeader::parent(self)
    }

    pub fn set_parent(&mut self, parent: u32) {
        CommonHeader::set_parent(self, parent)
    }

    pub fn num_keys(&self) -> u32 {
        read_u32(self.page, INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn set_num_keys(&mut self, num_keys: u32) {
        write_u32(self.page, INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys)
    }

    pub fn right_child(&self) -> u32 {
        read_u32(self.page, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    pub fn set_right_child(&mut self, page_num: u32) {
        write_u32(self.page, INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num)
    }

    fn cell_offset(cell_num: u32) -> usize {
        INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE
    }

    pub fn child(&self, child_num: u32) -> u32 {
        let num_keys = self.num_keys();
        if child_num > num_keys {
            unreachable!("child index {child_num} > num_keys {num_keys}");
        } else if child_num == num_keys {
            self.right_child()
        } else {
            read_u32(self.page, Self::cell_offset(child_num))
        }
    }

    pub fn set_child(&mut self, child_num: u32, page_num: u32) {
        let offset = Self::cell_offset(child_num);
        write_u32(self.page, offset, page_num)
    }

    pub fn key(&self, key_num: u32) -> u32 {
        let offset = Self::cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE;
        read_u32(self.page, offset)
    }

    pub fn set_key(&mut self, key_num: u32, key: u32) {
        let offset = Self::cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE;
        write_u32(self.page, offset, key)
    }

    /// The largest key reachable from this node's subtree.
    pub fn max_key(&self) -> u32 {
        self.key(self.num_keys() - 1)
    }

    /// Returns the smallest child index `i` with `key(i) >= key`, or
    /// `num_keys` (meaning "follow `right_child`") if none qualifies.
    pub fn find_child(&self, key: u32) -> u32 {
        let mut lo = 0u32;
        let mut hi = self.num_keys();
        while lo != hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) >= key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }
}

/// A page, dispatched on its stored `node_type` byte.
pub enum Node<'a> {
    Leaf(LeafNode<'a>),
    Internal(InternalNode<'a>),
}

impl<'a> Node<'a> {
    pub fn from_page(page: &'a mut [u8; PAGE_SIZE]) -> Self {
        match NodeType::from_byte(page[NODE_TYPE_OFFSET]) {
            NodeType::Leaf => Node::Leaf(LeafNode::new(page)),
            NodeType::Internal => Node::Internal(InternalNode::new(page)),
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Node::Leaf(n) => n.is_root(),
            Node::Internal(n) => n.is_root(),
        }
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        match self {
            Node::Leaf(n) => n.set_is_root(is_root),
            Node::Internal(n) => n.set_is_root(is_root),
        }
    }

    pub fn max_key(&self) -> u32 {
        match self {
            Node::Leaf(n) => n.max_key(),
            Node::Internal(n) => n.max_key(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_max_cells_matches_terminal_tutorial_budget() {
        assert_eq!(LEAF_NODE_HEADER_SIZE, 10);
        assert_eq!(LEAF_NODE_CELL_SIZE, 297);
        assert_eq!(LEAF_NODE_MAX_CELLS, 13);
    }

    #[test]
    fn leaf_accessors_round_trip() {
        let mut buf = [0u8; PAGE_SIZE];
        let mut leaf = LeafNode::new(&mut buf);
        leaf.initialize();
        leaf.set_is_root(true);
        leaf.set_num_cells(2);
        leaf.set_key(0, 5);
        leaf.value_mut(0).copy_from_slice(&[7u8; LEAF_NODE_VALUE_SIZE]);
        leaf.set_key(1, 9);

        assert!(leaf.is_root());
        assert_eq!(leaf.num_cells(), 2);
        assert_eq!(leaf.key(0), 5);
        assert_eq!(leaf.key(1), 9);
        assert_eq!(leaf.value(0), &[7u8; LEAF_NODE_VALUE_SIZE][..]);
        assert_eq!(leaf.max_key(), 9);
    }

    #[test]
    fn find_key_slot_locates_existing_and_missing_keys() {
        let mut buf = [0u8; PAGE_SIZE];
        let mut leaf = LeafNode::new(&mut buf);
        leaf.initialize();
        leaf.set_num_cells(3);
        leaf.set_key(0, 1);
        leaf.set_key(1, 3);
        leaf.set_key(2, 5);

        assert_eq!(leaf.find_key_slot(3), 1);
        assert_eq!(leaf.find_key_slot(4), 2);
        assert_eq!(leaf.find_key_slot(0), 0);
        assert_eq!(leaf.find_key_slot(9), 3);
    }

    #[test]
    fn internal_child_falls_back_to_right_child() {
        let mut buf = [0u8; PAGE_SIZE];
        let mut internal = InternalNode::new(&mut buf);
        internal.initialize();
        internal.set_num_keys(1);
        internal.set_child(0, 2);
        internal.set_key(0, 10);
        internal.set_right_child(3);

        assert_eq!(internal.child(0), 2);
        assert_eq!(internal.child(1), 3);
        assert_eq!(internal.find_child(5), 0);
        assert_eq!(internal.find_child(11), 1);
    }
}
