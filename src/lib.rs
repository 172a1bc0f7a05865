//! Microsim VDS - volumetric preview and chunk serving for simulated microscopy
//!
//! Turns a simulated (C, Z, Y, X) intensity volume into what a remote viewer
//! needs: per-channel statistics for contrast controls, a color composite
//! preview of the middle depth slice, single-chunk zarr-style metadata and
//! raw (channel, depth) planes fetched on demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use microsim_vds::{Pipeline, PhantomSimulator, ResultCache, SimulationConfig};
//! use std::sync::Arc;
//!
//! # fn example() -> microsim_vds::Result<()> {
//! let pipeline = Pipeline::new(Arc::new(PhantomSimulator::new()), Arc::new(ResultCache::default()));
//!
//! let config = SimulationConfig::new(serde_json::json!({"shape": [2, 3, 64, 64]}));
//! let response = pipeline.simulate(&config)?;
//! println!("preview from depth {}", response.depth_index_used);
//!
//! // Raw little-endian float32 plane for channel 1, depth 2
//! let plane = pipeline.fetch_slice(1, 2)?;
//! assert_eq!(plane.len(), 64 * 64 * 4);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod preview;
pub mod server;
pub mod simulation;
pub mod stats;
pub mod types;
pub mod utils;
pub mod volume;

// Re-exports
pub use archive::{ArchiveExport, ArchiveMetadata, ArchivePayload, VolumeInfo};
pub use cache::{CacheEntry, CachedResult, ResultCache};
pub use config::ServerConfig;
pub use error::{ConditionKind, Result, VolumeError};
pub use pipeline::{FallbackSummary, Pipeline, PipelineOptions, SimulationResponse};
pub use preview::{CompositePreview, Palette};
pub use simulation::{PhantomConfig, PhantomSimulator, SimulationConfig, Simulator};
pub use stats::ChannelStatistics;
pub use types::{Dimension, ElementType, VolumeShape};
pub use volume::{RawVolume, Volume};

/// Version of this crate
pub const MICROSIM_VDS_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!MICROSIM_VDS_VERSION.is_empty());
    }
}
