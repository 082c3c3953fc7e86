pub mod commands;
pub mod date;
pub mod entry;
pub mod store;

pub use date::EntryDate;
pub use entry::DiaryEntry;
pub use store::{ContentStore, FileContentStore, MemoryContentStore};
