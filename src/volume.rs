//! Volume containers and element-type canonicalization

use crate::error::Result;
use crate::types::{ElementType, VolumeShape};
use ndarray::{s, Array4, ArrayView2, ArrayView3};
use num_traits::AsPrimitive;

/// Extents of the fallback test volume
pub const TEST_VOLUME_DIMS: [usize; 4] = [2, 4, 64, 64];

/// Volume as produced by a simulator, in whatever element type it chose
#[derive(Debug, Clone)]
pub enum RawVolume {
    U8(Array4<u8>),
    U16(Array4<u16>),
    I32(Array4<i32>),
    F32(Array4<f32>),
    F64(Array4<f64>),
}

impl RawVolume {
    /// Element type of the raw data
    pub fn element_type(&self) -> ElementType {
        match self {
            RawVolume::U8(_) => ElementType::U8,
            RawVolume::U16(_) => ElementType::U16,
            RawVolume::I32(_) => ElementType::I32,
            RawVolume::F32(_) => ElementType::F32,
            RawVolume::F64(_) => ElementType::F64,
        }
    }

    /// Convert to the canonical 32-bit float volume
    pub fn canonicalize(self) -> Result<Volume> {
        match self {
            RawVolume::U8(a) => Volume::from_array(cast(&a)),
            RawVolume::U16(a) => Volume::from_array(cast(&a)),
            RawVolume::I32(a) => Volume::from_array(cast(&a)),
            RawVolume::F32(a) => Volume::from_array(a),
            RawVolume::F64(a) => Volume::from_array(cast(&a)),
        }
    }
}

fn cast<T>(array: &Array4<T>) -> Array4<f32>
where
    T: AsPrimitive<f32>,
{
    array.mapv(|v| v.as_())
}

/// A (C, Z, Y, X) volume in the canonical element type
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array4<f32>,
    shape: VolumeShape,
}

impl Volume {
    /// Wrap an array, rejecting empty axes
    pub fn from_array(data: Array4<f32>) -> Result<Self> {
        let (c, z, y, x) = data.dim();
        let shape = VolumeShape::new(c, z, y, x)?;
        // Plane extraction relies on row-major order.
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self { data, shape })
    }

    /// Build a volume by evaluating `f(c, z, y, x)` at every voxel
    pub fn from_fn<F>(shape: VolumeShape, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize, usize) -> f32,
    {
        let [c, z, y, x] = shape.dims();
        let data = Array4::from_shape_fn((c, z, y, x), |(ci, zi, yi, xi)| f(ci, zi, yi, xi));
        Self { data, shape }
    }

    /// The deterministic 2-channel test pattern served before any simulation
    ///
    /// Channel 0 is a linear gradient across x, y and depth; channel 1 is a
    /// radial decay from the plane centre that brightens with depth.
    pub fn test_pattern() -> Self {
        let [_, _, y, x] = TEST_VOLUME_DIMS;
        let shape = VolumeShape::from_dims_unchecked(TEST_VOLUME_DIMS);
        let (cy, cx) = ((y / 2) as f64, (x / 2) as f64);

        Self::from_fn(shape, |ci, zi, yi, xi| {
            let (zf, yf, xf) = (zi as f64, yi as f64, xi as f64);
            let value = match ci {
                0 => (xf + yf + zf * 10.0) / 200.0,
                _ => {
                    let dist = ((yf - cy).powi(2) + (xf - cx).powi(2)).sqrt();
                    (-dist / 10.0).exp() * (1.0 + zf * 0.2)
                }
            };
            value as f32
        })
    }

    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    /// Always the canonical type
    pub fn element_type(&self) -> ElementType {
        ElementType::CANONICAL
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    /// All depths of one channel, (Z, Y, X)
    pub fn channel(&self, channel: usize) -> ArrayView3<'_, f32> {
        self.data.slice(s![channel, .., .., ..])
    }

    /// All channels at one depth, (C, Y, X)
    pub fn depth_slice(&self, depth: usize) -> ArrayView3<'_, f32> {
        self.data.slice(s![.., depth, .., ..])
    }

    /// A single (Y, X) plane
    pub fn plane(&self, channel: usize, depth: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![channel, depth, .., ..])
    }

    /// Size in bytes of the voxel data
    pub fn size_bytes(&self) -> usize {
        self.shape.total_voxels() * self.element_type().size_in_bytes()
    }
}
