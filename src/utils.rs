//! Utility functions

use crate::error::{Result, VolumeError};

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Convert floats to little-endian bytes
pub fn f32_to_le_bytes(data: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * F32_SIZE);
    for value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert little-endian bytes back to floats
pub fn le_bytes_to_f32(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % F32_SIZE != 0 {
        return Err(VolumeError::InvalidDimensions(format!(
            "byte length {} not aligned with float32 size",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(F32_SIZE)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
