mod container;
mod page;
mod text;

pub use container::ContainerMetaValidator;
pub use page::PageMetaValidator;
pub use text::TextMetaValidator;
