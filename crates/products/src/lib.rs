//! Products domain module.
//!
//! This crate contains the catalog entities and the business rules around a
//! product's tag set, implemented purely as deterministic domain logic (no IO,
//! no HTTP, no storage).

pub mod product;
pub mod tag_sync;

pub use product::{
    Category, NewProduct, Product, ProductChanges, ProductDetails, ProductTag, Tag, TagIds,
};
pub use tag_sync::{plan_tag_sync, TagSyncPlan};
