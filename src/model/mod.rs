//! Data model shared by every pipeline stage.
//!
//! Units flow out of extraction, regions and blocks out of segmentation,
//! document blocks and hierarchy nodes out of assembly, and outline entries
//! are what callers finally receive.

mod block;
mod document;
mod geometry;
mod page;
mod unit;

pub use block::{Block, BlockLabel, Region, RegionLabel};
pub use document::{DocumentBlock, HierarchyNode, OutlineEntry};
pub use geometry::{PageSize, Rect};
pub use page::{Classification, DiagnosticKind, DpiReport, PageClass, PageDiagnostic, PageResult};
pub use unit::{size_key, FontStyle, Unit, UnitOrdinal};
