//! Document-level types: numbered blocks, hierarchy nodes and output records.

use serde::{Deserialize, Serialize};

use super::{Block, BlockLabel};

/// A block placed in the document-wide reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub block: Block,
    /// Dense, 0-based id in reading order. Assigned after duplicate suppression.
    pub block_id: usize,
    /// Whether the text is expected to continue in the next block
    pub merge_next: bool,
}

impl DocumentBlock {
    pub fn new(block: Block) -> Self {
        Self {
            block,
            block_id: 0,
            merge_next: false,
        }
    }

    pub fn label(&self) -> BlockLabel {
        self.block.label
    }

    pub fn text(&self) -> &str {
        &self.block.text
    }

    pub fn page_no(&self) -> u32 {
        self.block.page_no
    }
}

/// Parent/depth assignment for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub block_id: usize,
    /// -1 for roots, otherwise an earlier block id
    pub parent_id: i64,
    pub depth: usize,
}

impl HierarchyNode {
    pub fn root(block_id: usize) -> Self {
        Self {
            block_id,
            parent_id: -1,
            depth: 0,
        }
    }
}

/// One record of the final outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub block_id: usize,
    pub parent_id: i64,
    pub depth: usize,
    pub label: BlockLabel,
    pub text: String,
    /// Page number (1-indexed)
    pub page_no: u32,
}

impl OutlineEntry {
    /// Combine a document block with its hierarchy node.
    pub fn from_parts(block: &DocumentBlock, node: &HierarchyNode) -> Self {
        Self {
            block_id: block.block_id,
            parent_id: node.parent_id,
            depth: node.depth,
            label: block.label(),
            text: block.text().to_string(),
            page_no: block.page_no(),
        }
    }

    pub fn is_title(&self) -> bool {
        self.label == BlockLabel::Title
    }
}
