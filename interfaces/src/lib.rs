pub mod defs;

pub use defs::{MediaItem, MediaKind, Page, UnknownMediaKind};
