//! Color composite previews of a single depth slice
//!
//! Every channel is normalized between its 1st and 99th percentile, tinted
//! with a fixed palette color and summed additively into one RGB image.

use crate::error::{Result, VolumeError};
use crate::stats::SortedSample;
use crate::volume::Volume;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use std::io::Cursor;

/// RGB color with components in [0, 1]
pub type Color = [f32; 3];

/// Ordered channel colors; channel `i` is drawn with color `i`
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub const RED: Color = [1.0, 0.2, 0.2];
    pub const GREEN: Color = [0.2, 1.0, 0.2];
    pub const BLUE: Color = [0.2, 0.2, 1.0];
    pub const MAGENTA: Color = [1.0, 0.2, 1.0];
    pub const YELLOW: Color = [1.0, 1.0, 0.2];
    pub const CYAN: Color = [0.2, 1.0, 1.0];
    pub const WHITE: Color = [1.0, 1.0, 1.0];

    /// Create a palette; components are clamped to [0, 1]
    pub fn new(colors: Vec<Color>) -> Self {
        let colors = colors
            .into_iter()
            .map(|c| c.map(|v| v.clamp(0.0, 1.0)))
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color for a channel, if the palette covers it
    pub fn color(&self, channel: usize) -> Option<Color> {
        self.colors.get(channel).copied()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(vec![
            Self::RED,
            Self::GREEN,
            Self::BLUE,
            Self::MAGENTA,
            Self::YELLOW,
            Self::CYAN,
            Self::WHITE,
        ])
    }
}

/// Normalize one channel plane for display
///
/// Channels whose maximum is not positive are passed through unscaled.
/// Otherwise values are stretched between the 1st and 99th percentile, or
/// divided by the maximum when those percentiles coincide. Non-finite voxels
/// contribute nothing.
pub fn normalize_channel(plane: ArrayView2<'_, f32>) -> Array2<f32> {
    let sample = SortedSample::from_values(plane.iter().copied());
    let scale: Box<dyn Fn(f32) -> f32> = match sample.max() {
        Some(max) if max > 0.0 => {
            let p1 = sample.percentile(1.0).unwrap_or(0.0);
            let p99 = sample.percentile(99.0).unwrap_or(max);
            if p99 > p1 {
                let range = p99 - p1;
                Box::new(move |v| ((f64::from(v) - p1) / range).clamp(0.0, 1.0) as f32)
            } else {
                Box::new(move |v| (f64::from(v) / max) as f32)
            }
        }
        _ => Box::new(|v| v),
    };

    plane.mapv(|v| if v.is_finite() { scale(v) } else { 0.0 })
}

/// Blend a (C, Y, X) slice into a (Y, X, 3) composite with values in [0, 1]
///
/// Channels beyond the palette length are dropped.
pub fn composite(slice: ArrayView3<'_, f32>, palette: &Palette) -> Array3<f32> {
    let (_, height, width) = slice.dim();
    let mut out = Array3::<f32>::zeros((height, width, 3));

    for (ci, plane) in slice.axis_iter(Axis(0)).enumerate() {
        let Some(color) = palette.color(ci) else {
            break;
        };
        let norm = normalize_channel(plane);
        for (k, &component) in color.iter().enumerate() {
            let mut target = out.index_axis_mut(Axis(2), k);
            target.scaled_add(component, &norm);
        }
    }

    out.mapv_inplace(|v| v.clamp(0.0, 1.0));
    out
}

/// Quantize a (Y, X, 3) composite in [0, 1] to 8-bit RGB
pub fn quantize(composite: &Array3<f32>) -> Result<RgbImage> {
    let (height, width, _) = composite.dim();
    let pixels: Vec<u8> = composite
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        VolumeError::ImageEncoding(format!("buffer does not fit {}x{} RGB image", width, height))
    })
}

/// Rendered composite of one depth slice
#[derive(Debug, Clone)]
pub struct CompositePreview {
    /// Depth index the preview was taken from
    pub depth_index: usize,
    pub image: RgbImage,
}

impl CompositePreview {
    /// Render the middle depth slice of a volume
    pub fn render(volume: &Volume, palette: &Palette) -> Result<Self> {
        let depth_index = volume.shape().middle_depth();
        Self::render_depth(volume, depth_index, palette)
    }

    /// Render a specific depth slice
    pub fn render_depth(volume: &Volume, depth_index: usize, palette: &Palette) -> Result<Self> {
        if depth_index >= volume.shape().depth() {
            return Err(VolumeError::OutOfRange {
                channel: 0,
                depth: depth_index,
                shape: volume.shape(),
            });
        }
        let blended = composite(volume.depth_slice(depth_index), palette);
        Ok(Self {
            depth_index,
            image: quantize(&blended)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Encode as base64 PNG for embedding in JSON
    pub fn to_png_base64(&self) -> Result<String> {
        Ok(BASE64.encode(self.to_png()?))
    }
}
