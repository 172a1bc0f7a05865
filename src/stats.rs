//! Per-channel summary statistics for contrast and histogram controls

use crate::volume::Volume;
use serde::{Deserialize, Serialize};

/// Finite values of a sample, sorted ascending
#[derive(Debug, Clone)]
pub struct SortedSample {
    values: Vec<f64>,
}

impl SortedSample {
    /// Collect the finite values of `values`; NaN and infinities are dropped
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut values: Vec<f64> = values
            .into_iter()
            .filter(|v| v.is_finite())
            .map(f64::from)
            .collect();
        values.sort_unstable_by(f64::total_cmp);
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Percentile `p` in [0, 100], interpolating linearly between the two
    /// nearest order statistics
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let n = self.values.len();
        if n == 0 {
            return None;
        }
        let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let (a, b) = (self.values[lo], self.values[hi]);
        let frac = rank - lo as f64;
        // Keep the result inside [a, b] despite rounding.
        Some((a + (b - a) * frac).clamp(a, b))
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let var = self
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.values.len() as f64;
        Some(var.sqrt())
    }
}

/// Summary statistics of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub p1: f64,
    pub p5: f64,
    pub p95: f64,
    pub p99: f64,
}

impl ChannelStatistics {
    /// Record reported for a channel without a single finite value
    pub const DEGENERATE: ChannelStatistics = ChannelStatistics {
        min: 0.0,
        max: 1.0,
        mean: 0.0,
        std: 0.0,
        p1: 0.0,
        p5: 0.0,
        p95: 1.0,
        p99: 1.0,
    };

    /// Compute statistics over a channel's voxel values
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        Self::from_sample(&SortedSample::from_values(values))
    }

    /// Compute statistics from an already sorted sample
    pub fn from_sample(sample: &SortedSample) -> Self {
        let compute = || {
            let min = sample.min()?;
            let max = sample.max()?;
            // Summation error must not push the mean past the extremes.
            let mean = sample.mean()?.clamp(min, max);
            Some(Self {
                min,
                max,
                mean,
                std: sample.std_dev()?,
                p1: sample.percentile(1.0)?,
                p5: sample.percentile(5.0)?,
                p95: sample.percentile(95.0)?,
                p99: sample.percentile(99.0)?,
            })
        };
        compute().unwrap_or(Self::DEGENERATE)
    }

    /// Statistics for every channel of a volume, in channel order
    pub fn per_channel(volume: &Volume) -> Vec<Self> {
        (0..volume.shape().channels())
            .map(|c| Self::from_values(volume.channel(c).iter().copied()))
            .collect()
    }

    /// Whether the percentile ordering invariants hold
    pub fn is_ordered(&self) -> bool {
        self.min <= self.p1
            && self.p1 <= self.p5
            && self.p5 <= self.p95
            && self.p95 <= self.p99
            && self.p99 <= self.max
            && self.min <= self.mean
            && self.mean <= self.max
    }
}
