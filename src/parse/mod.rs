pub mod item_level;
pub mod item_string;

pub use item_level::{DerivedItemLevel, ItemLevelCurve, ItemLevelResolver};
pub use item_string::{ItemString, ItemStringType};
