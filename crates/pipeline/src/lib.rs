//! # STPGIS Pipeline
//!
//! Request-level flows that chain the engine stages: alignment, weighted
//! overlay, constraints, boundary clipping, zone statistics and styling,
//! then hand the finished raster and style to a [`Publisher`].
//!
//! ```ignore
//! use stpgis_pipeline::{DirectoryPublisher, EngineConfig, PriorityMapper, PriorityRequest};
//!
//! let config = EngineConfig::from_file("engine.json")?;
//! let publisher = DirectoryPublisher::new("/srv/layers");
//! let map = PriorityMapper::new(&config, &publisher).create_priority_map(&request)?;
//! ```

pub mod catchment;
pub mod category;
pub mod config;
mod flow;
pub mod priority;
pub mod publish;
pub mod scratch;
pub mod suitability;

pub use catchment::{catchment_villages, CatchmentSelection, CatchmentVillage};
pub use category::{CategoryMapper, CategoryRaster, PublishedLayer};
pub use config::EngineConfig;
pub use priority::{PriorityMap, PriorityMapper, PriorityRequest};
pub use publish::{DirectoryPublisher, Publisher};
pub use scratch::Scratch;
pub use suitability::{SuitabilityMap, SuitabilityMapper, SuitabilityRequest};

/// A criterion raster and its overlay weight
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeightedLayer {
    pub path: std::path::PathBuf,
    pub weight: f64,
}

impl WeightedLayer {
    pub fn new(path: impl Into<std::path::PathBuf>, weight: f64) -> Self {
        Self {
            path: path.into(),
            weight,
        }
    }
}
