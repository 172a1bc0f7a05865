//! Core data types for volume handling

use crate::error::{Result, VolumeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element types a simulation may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 32-bit integer
    I32,
    /// 32-bit floating point (canonical)
    F32,
    /// 64-bit floating point
    F64,
}

impl ElementType {
    /// The type every volume is normalized to before processing
    pub const CANONICAL: ElementType = ElementType::F32;

    /// Size in bytes of this element type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::I32 | ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    /// Name as understood by array-format viewers
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::U8 => "uint8",
            ElementType::U16 => "uint16",
            ElementType::I32 => "int32",
            ElementType::F32 => "float32",
            ElementType::F64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axes of a volume, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Channel
    C = 0,
    /// Depth
    Z = 1,
    /// Height
    Y = 2,
    /// Width
    X = 3,
}

impl Dimension {
    /// All axes in storage order
    pub const ALL: [Dimension; 4] = [Dimension::C, Dimension::Z, Dimension::Y, Dimension::X];

    /// Convert from usize index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Convert to usize index
    pub fn to_index(&self) -> usize {
        *self as usize
    }

    /// Single-letter axis label
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::C => "C",
            Dimension::Z => "Z",
            Dimension::Y => "Y",
            Dimension::X => "X",
        }
    }

    /// Labels for all axes in storage order
    pub fn labels() -> [&'static str; 4] {
        Self::ALL.map(|d| d.label())
    }
}

/// Extents of a (C, Z, Y, X) volume; every axis is at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[usize; 4]", try_from = "[usize; 4]")]
pub struct VolumeShape {
    dims: [usize; 4],
}

impl VolumeShape {
    /// Create a new shape, rejecting empty axes
    pub fn new(channels: usize, depth: usize, height: usize, width: usize) -> Result<Self> {
        Self::from_dims([channels, depth, height, width])
    }

    /// Create a shape from a (C, Z, Y, X) array
    pub fn from_dims(dims: [usize; 4]) -> Result<Self> {
        if let Some(axis) = dims.iter().position(|&d| d == 0) {
            return Err(VolumeError::InvalidDimensions(format!(
                "axis {} has zero extent in {:?}",
                Dimension::ALL[axis].label(),
                dims
            )));
        }
        Ok(Self { dims })
    }

    /// Shape from extents already known to be non-zero
    pub(crate) const fn from_dims_unchecked(dims: [usize; 4]) -> Self {
        Self { dims }
    }

    /// Get the extent along an axis
    pub fn get(&self, dim: Dimension) -> usize {
        self.dims[dim.to_index()]
    }

    pub fn channels(&self) -> usize {
        self.dims[0]
    }

    pub fn depth(&self) -> usize {
        self.dims[1]
    }

    pub fn height(&self) -> usize {
        self.dims[2]
    }

    pub fn width(&self) -> usize {
        self.dims[3]
    }

    /// Get all dimensions
    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    /// Number of voxels in a single (Y, X) plane
    pub fn plane_len(&self) -> usize {
        self.height() * self.width()
    }

    /// Total number of voxels
    pub fn total_voxels(&self) -> usize {
        self.dims.iter().product()
    }

    /// Index of the middle depth plane used for previews
    pub fn middle_depth(&self) -> usize {
        self.depth() / 2
    }

    /// Check whether a (channel, depth) plane address exists
    pub fn contains_plane(&self, channel: usize, depth: usize) -> bool {
        channel < self.channels() && depth < self.depth()
    }
}

impl From<VolumeShape> for [usize; 4] {
    fn from(shape: VolumeShape) -> Self {
        shape.dims
    }
}

impl TryFrom<[usize; 4]> for VolumeShape {
    type Error = VolumeError;

    fn try_from(dims: [usize; 4]) -> Result<Self> {
        Self::from_dims(dims)
    }
}

impl fmt::Display for VolumeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}
