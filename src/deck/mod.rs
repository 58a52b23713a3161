pub mod models;

pub use models::{sort_items, DeckSortOrder, Item, ItemStatus};
