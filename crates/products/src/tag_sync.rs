//! Tag-set reconciliation.
//!
//! Given the join rows a product currently has and the tag list a caller just
//! submitted, work out which links to create and which to delete so the
//! product ends up tagged with exactly the submitted set.

use catalog_core::{ProductTagId, TagId};

use crate::product::{ProductTag, TagIds};

/// Changes needed to bring a product's join rows in line with a tag list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSyncPlan {
    /// Tags to link, in submitted order.
    pub to_add: Vec<TagId>,
    /// Join rows to delete, in existing row order.
    pub to_remove: Vec<ProductTagId>,
}

impl TagSyncPlan {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

pub fn plan_tag_sync(existing: &[ProductTag], desired: &TagIds) -> TagSyncPlan {
    let to_add = desired
        .as_slice()
        .iter()
        .copied()
        .filter(|tag_id| !existing.iter().any(|row| row.tag_id == *tag_id))
        .collect();

    let to_remove = existing
        .iter()
        .filter(|row| !desired.contains(row.tag_id))
        .map(|row| row.id)
        .collect();

    TagSyncPlan { to_add, to_remove }
}
