//! Demo reference data (categories and tags) for dev databases.

use catalog_core::{CategoryId, TagId};
use catalog_products::{Category, Tag};

const CATEGORIES: &[&str] = &["Shirts", "Shorts", "Music", "Hats", "Shoes"];

const TAGS: &[&str] = &[
    "rock music",
    "pop music",
    "blue",
    "red",
    "green",
    "white",
    "gold",
    "pop culture",
];

pub fn demo_categories() -> Vec<Category> {
    CATEGORIES
        .iter()
        .zip(1..)
        .map(|(name, id)| Category {
            id: CategoryId::new(id),
            name: (*name).to_string(),
        })
        .collect()
}

pub fn demo_tags() -> Vec<Tag> {
    TAGS.iter()
        .zip(1..)
        .map(|(name, id)| Tag {
            id: TagId::new(id),
            name: (*name).to_string(),
        })
        .collect()
}
