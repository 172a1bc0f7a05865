//! Chunk store adapter - presents a volume as a minimal zarr-style array
//!
//! The whole volume is stored as a single chunk. Viewers address data either
//! through the archive metadata or as individual (channel, depth) planes.

use crate::error::{Result, VolumeError};
use crate::types::{ElementType, VolumeShape};
use crate::utils::f32_to_le_bytes;
use crate::volume::Volume;
use bytes::Bytes;
use ndarray::{ArrayView, Axis, IxDyn};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage order of voxel data (row-major)
pub const STORAGE_ORDER: &str = "C";

/// Separator between chunk indices in chunk keys
pub const DIMENSION_SEPARATOR: &str = ".";

/// Array metadata in the layout of a zarr v2 `.zarray` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Full array shape (C, Z, Y, X)
    pub shape: VolumeShape,

    /// Chunk shape; always equal to `shape`
    pub chunks: VolumeShape,

    /// Element type name
    pub dtype: String,

    /// Storage order
    pub order: String,

    pub fill_value: f32,

    /// Always `None`: no filters are applied
    pub filters: Option<Vec<serde_json::Value>>,

    /// Always `None`: chunks are stored uncompressed
    pub compressor: Option<serde_json::Value>,

    pub dimension_separator: String,
}

impl ArchiveMetadata {
    /// Single-chunk metadata for a shape in the canonical element type
    pub fn single_chunk(shape: VolumeShape) -> Self {
        Self {
            shape,
            chunks: shape,
            dtype: ElementType::CANONICAL.name().to_string(),
            order: STORAGE_ORDER.to_string(),
            fill_value: 0.0,
            filters: None,
            compressor: None,
            dimension_separator: DIMENSION_SEPARATOR.to_string(),
        }
    }

    /// Number of chunks along each axis
    pub fn chunk_grid(&self) -> [usize; 4] {
        let shape = self.shape.dims();
        let chunks = self.chunks.dims();
        std::array::from_fn(|i| shape[i].div_ceil(chunks[i]))
    }

    /// Total number of chunks
    pub fn total_chunks(&self) -> usize {
        self.chunk_grid().iter().product()
    }

    /// Key of the chunk at the given chunk coordinates, e.g. `0.0.0.0`
    pub fn chunk_key(&self, coords: [usize; 4]) -> Result<String> {
        let grid = self.chunk_grid();
        if coords.iter().zip(grid.iter()).any(|(&c, &g)| c >= g) {
            return Err(VolumeError::InvalidDimensions(format!(
                "chunk {:?} outside chunk grid {:?}",
                coords, grid
            )));
        }
        Ok(coords
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(&self.dimension_separator))
    }

    /// Size in bytes of one chunk
    pub fn chunk_size_bytes(&self) -> usize {
        self.chunks.total_voxels() * ElementType::CANONICAL.size_in_bytes()
    }
}

/// Describe a volume as a single-chunk archive
pub fn describe(volume: &Volume) -> ArchiveMetadata {
    ArchiveMetadata::single_chunk(volume.shape())
}

/// Voxel data of an exported archive, serialized as nested lists
#[derive(Debug, Clone)]
pub enum ArchivePayload {
    /// Every voxel, nested (C, Z, Y, X)
    Full(Arc<Volume>),
    /// Data left out of the response; serialized as an empty list
    Omitted,
}

impl Serialize for ArchivePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ArchivePayload::Full(volume) => {
                NestedArray(volume.data().view().into_dyn()).serialize(serializer)
            }
            ArchivePayload::Omitted => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

/// Serializes an n-dimensional view as nested sequences without copying
struct NestedArray<'a>(ArrayView<'a, f32, IxDyn>);

impl Serialize for NestedArray<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let view = &self.0;
        if view.ndim() == 0 {
            return serializer.serialize_f32(view.iter().next().copied().unwrap_or_default());
        }
        let len = view.len_of(Axis(0));
        let mut seq = serializer.serialize_seq(Some(len))?;
        if view.ndim() == 1 {
            for value in view.iter() {
                seq.serialize_element(value)?;
            }
        } else {
            for sub in view.axis_iter(Axis(0)) {
                seq.serialize_element(&NestedArray(sub))?;
            }
        }
        seq.end()
    }
}

/// Metadata plus voxel payload, as embedded in simulate responses
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveExport {
    pub zarray: ArchiveMetadata,
    pub data: ArchivePayload,
}

/// Export a volume with its full nested payload
pub fn export(volume: Arc<Volume>) -> ArchiveExport {
    ArchiveExport {
        zarray: describe(&volume),
        data: ArchivePayload::Full(volume),
    }
}

/// Export only the metadata; the payload serializes as an empty list
pub fn export_metadata_only(volume: &Volume) -> ArchiveExport {
    ArchiveExport {
        zarray: describe(volume),
        data: ArchivePayload::Omitted,
    }
}

/// Raw bytes of the (Y, X) plane at `channel`, `depth`
///
/// Values are little-endian canonical floats in row-major order, with no
/// framing or compression.
pub fn fetch_slice(volume: &Volume, channel: usize, depth: usize) -> Result<Bytes> {
    let shape = volume.shape();
    if !shape.contains_plane(channel, depth) {
        return Err(VolumeError::OutOfRange {
            channel,
            depth,
            shape,
        });
    }

    let plane = volume.plane(channel, depth);
    let bytes = match plane.as_slice() {
        Some(values) => f32_to_le_bytes(values),
        None => f32_to_le_bytes(&plane.iter().copied().collect::<Vec<_>>()),
    };
    Ok(Bytes::from(bytes))
}

/// Byte length of one plane of a shape
pub fn slice_len_bytes(shape: VolumeShape) -> usize {
    shape.plane_len() * ElementType::CANONICAL.size_in_bytes()
}

/// Summary of the volume currently being served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub shape: VolumeShape,
    pub dtype: String,
    /// Chunk shape; equal to `shape`
    pub chunks: VolumeShape,
}

impl From<&ArchiveMetadata> for VolumeInfo {
    fn from(meta: &ArchiveMetadata) -> Self {
        Self {
            shape: meta.shape,
            dtype: meta.dtype.clone(),
            chunks: meta.chunks,
        }
    }
}
