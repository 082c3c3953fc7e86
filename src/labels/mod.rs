pub mod codec;
pub mod commands;
pub mod models;
pub mod repository;

pub use models::{Label, LabelCatalog, LabelInput, LabelUpdate};
pub use repository::LabelRepository;
