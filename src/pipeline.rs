//! Simulate-and-respond orchestration
//!
//! A cycle runs the simulator, canonicalizes its output, computes channel
//! statistics and the composite preview, exports the archive and finally
//! publishes the volume to the result cache. Any failure aborts the whole
//! cycle; nothing is retried.

use crate::archive::{self, ArchiveExport, VolumeInfo};
use crate::cache::{CachedResult, ResultCache};
use crate::error::{Result, VolumeError};
use crate::preview::{CompositePreview, Palette};
use crate::simulation::{SimulationConfig, Simulator};
use crate::stats::ChannelStatistics;
use crate::types::{Dimension, VolumeShape};
use crate::utils::format_bytes;
use crate::volume::{RawVolume, Volume};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Options controlling the simulate response
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Embed every voxel in the archive payload
    pub include_payload: bool,
    pub palette: Palette,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            include_payload: true,
            palette: Palette::default(),
        }
    }
}

/// Result of one simulate cycle
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResponse {
    pub shape: VolumeShape,
    pub dims: [&'static str; 4],
    pub dtype: String,
    #[serde(rename = "zarr")]
    pub archive: ArchiveExport,
    /// PNG bytes; base64 encoded on the wire
    #[serde(rename = "preview_png_b64", serialize_with = "serialize_base64")]
    pub preview_png: Vec<u8>,
    pub stats: Vec<ChannelStatistics>,
    #[serde(rename = "z_slice_used")]
    pub depth_index_used: usize,
    #[serde(rename = "elapsed_s")]
    pub elapsed_seconds: f64,
    pub run_id: Uuid,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// Statistics of the static fallback volume
#[derive(Debug, Clone, Serialize)]
pub struct FallbackSummary {
    pub shape: VolumeShape,
    pub dims: [&'static str; 4],
    pub stats: Vec<ChannelStatistics>,
    #[serde(rename = "elapsed_s")]
    pub elapsed_seconds: f64,
    /// Metadata only; viewers fetch planes individually
    pub zarr: ArchiveExport,
}

/// Everything derived from a canonical volume in one cycle
struct Processed {
    volume: Arc<Volume>,
    stats: Vec<ChannelStatistics>,
    preview: CompositePreview,
    preview_png: Vec<u8>,
    archive: ArchiveExport,
}

/// Orchestrates simulation, analysis and caching
pub struct Pipeline {
    simulator: Arc<dyn Simulator>,
    cache: Arc<ResultCache>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(simulator: Arc<dyn Simulator>, cache: Arc<ResultCache>) -> Self {
        Self::with_options(simulator, cache, PipelineOptions::default())
    }

    pub fn with_options(
        simulator: Arc<dyn Simulator>,
        cache: Arc<ResultCache>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            simulator,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn simulator(&self) -> &Arc<dyn Simulator> {
        &self.simulator
    }

    /// Run one simulate cycle and publish its volume
    pub fn simulate(&self, config: &SimulationConfig) -> Result<SimulationResponse> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();

        let raw = self.simulator.run(config).map_err(|err| match err {
            VolumeError::InvalidInput(_) => {
                warn!(%run_id, error = %err, "simulation rejected configuration");
                err
            }
            other => other.into_processing_failure(),
        })?;
        let source_type = raw.element_type();

        let processed = self.process(raw).map_err(|err| {
            let err = err.into_processing_failure();
            error!(%run_id, error = %err, "processing simulated volume failed");
            err
        })?;

        let shape = processed.volume.shape();
        self.cache
            .set(CachedResult::new(Arc::clone(&processed.volume), run_id));

        let elapsed_seconds = started.elapsed().as_secs_f64();
        info!(
            %run_id,
            %shape,
            source_dtype = %source_type,
            size = %format_bytes(processed.volume.size_bytes()),
            elapsed_s = elapsed_seconds,
            "simulation complete"
        );

        Ok(SimulationResponse {
            shape,
            dims: Dimension::labels(),
            dtype: processed.volume.element_type().name().to_string(),
            archive: processed.archive,
            preview_png: processed.preview_png,
            stats: processed.stats,
            depth_index_used: processed.preview.depth_index,
            elapsed_seconds,
            run_id,
        })
    }

    fn process(&self, raw: RawVolume) -> Result<Processed> {
        let volume = Arc::new(raw.canonicalize()?);
        let stats = ChannelStatistics::per_channel(&volume);
        let preview = CompositePreview::render(&volume, &self.options.palette)?;
        let preview_png = preview.to_png()?;
        let archive = if self.options.include_payload {
            archive::export(Arc::clone(&volume))
        } else {
            archive::export_metadata_only(&volume)
        };
        Ok(Processed {
            volume,
            stats,
            preview,
            preview_png,
            archive,
        })
    }

    /// Raw bytes of one plane of the current volume
    pub fn fetch_slice(&self, channel: usize, depth: usize) -> Result<Bytes> {
        let volume = self.cache.get();
        let bytes = archive::fetch_slice(&volume, channel, depth)?;
        debug!(channel, depth, len = bytes.len(), "served slice");
        Ok(bytes)
    }

    /// Shape, element type and chunking of the current volume
    pub fn describe_current(&self) -> VolumeInfo {
        let volume = self.cache.get();
        VolumeInfo::from(&archive::describe(&volume))
    }

    /// Statistics of the fallback volume, regardless of cache state
    pub fn fallback_preview_stats(&self) -> FallbackSummary {
        let started = Instant::now();
        let volume = self.cache.fallback();
        let stats = ChannelStatistics::per_channel(&volume);
        FallbackSummary {
            shape: volume.shape(),
            dims: Dimension::labels(),
            stats,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            zarr: archive::export_metadata_only(&volume),
        }
    }
}
