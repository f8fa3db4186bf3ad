pub mod catalog;
pub mod sample_loader;

pub use catalog::{Catalog, CollectionEntry, SampleEntry};
pub use sample_loader::{AssetSource, DirAssets, SampleLoader};
