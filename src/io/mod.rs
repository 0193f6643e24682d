//! I/O modules for persisting scenes and locating their source rasters

pub mod npy;
pub mod store;
pub mod cache;
pub mod catalog;
pub mod raster;

pub use store::{SceneStore, StatusRecord};
pub use cache::{Freshness, PipelineStage, ProcessingProfile, SceneCache, SceneKey};
pub use catalog::{SceneCatalog, SceneEntry};
pub use raster::RasterSource;
