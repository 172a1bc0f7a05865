//! End-to-end tests of the simulate cycle against a synthetic simulator

use approx::assert_relative_eq;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use microsim_vds::utils::le_bytes_to_f32;
use microsim_vds::{
    ChannelStatistics, Pipeline, RawVolume, ResultCache, SimulationConfig, Simulator, VolumeError,
};
use ndarray::Array4;
use serde_json::json;
use std::sync::Arc;

/// Channel- and depth-dependent linear ramps, produced in double precision
struct RampSimulator;

fn ramp_volume(c: usize, z: usize, y: usize, x: usize) -> Array4<f64> {
    let lin = |i: usize, n: usize| i as f64 / (n - 1) as f64;
    Array4::from_shape_fn((c, z, y, x), |(ci, zi, yi, xi)| {
        (ci + 1) as f64 * (0.3 + 0.7 * (0.4 * lin(yi, y) + 0.6 * lin(xi, x))) + 0.1 * zi as f64
    })
}

impl Simulator for RampSimulator {
    fn run(&self, config: &SimulationConfig) -> microsim_vds::Result<RawVolume> {
        if config.as_value().get("reject").is_some() {
            return Err(VolumeError::InvalidInput("bad sim params".to_string()));
        }
        Ok(RawVolume::F64(ramp_volume(2, 3, 8, 10)))
    }

    fn schema(&self) -> serde_json::Value {
        json!({"title": "Simulation", "type": "object"})
    }
}

fn pipeline() -> Pipeline {
    Pipeline::new(Arc::new(RampSimulator), Arc::new(ResultCache::default()))
}

#[test]
fn test_simulate_end_to_end() {
    let pipeline = pipeline();
    let response = pipeline
        .simulate(&SimulationConfig::new(json!({"whatever": 1})))
        .unwrap();

    assert_eq!(response.shape.dims(), [2, 3, 8, 10]);
    assert_eq!(response.dims, ["C", "Z", "Y", "X"]);
    assert_eq!(response.dtype, "float32");
    assert_eq!(response.depth_index_used, 1);
    assert!(response.elapsed_seconds >= 0.0);

    assert_eq!(response.stats.len(), 2);
    for stats in &response.stats {
        assert!(stats.max > stats.min);
        assert!(stats.is_ordered(), "unordered statistics: {stats:?}");
        assert!(stats.p95 >= stats.mean && stats.mean >= stats.p5);
    }
    // Channel 1 is twice channel 0 before the depth offset.
    assert_relative_eq!(response.stats[0].min, 0.3, epsilon = 1e-6);
    assert_relative_eq!(response.stats[1].min, 0.6, epsilon = 1e-6);

    let preview = image::load_from_memory(&response.preview_png).unwrap().to_rgb8();
    assert_eq!(preview.dimensions(), (10, 8));
}

#[test]
fn test_simulate_response_json_layout() {
    let response = pipeline()
        .simulate(&SimulationConfig::new(json!({})))
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["shape"], json!([2, 3, 8, 10]));
    assert_eq!(json["zarr"]["zarray"]["shape"], json!([2, 3, 8, 10]));
    assert_eq!(json["zarr"]["zarray"]["chunks"], json!([2, 3, 8, 10]));
    assert_eq!(json["zarr"]["zarray"]["dtype"], "float32");
    assert_eq!(json["zarr"]["data"][1][2][7].as_array().unwrap().len(), 10);
    assert_eq!(json["z_slice_used"], 1);
    assert!(json["elapsed_s"].as_f64().unwrap() >= 0.0);

    let png = BASE64
        .decode(json["preview_png_b64"].as_str().unwrap())
        .unwrap();
    assert_eq!(png, response.preview_png);

    for stats in json["stats"].as_array().unwrap() {
        for key in ["min", "max", "mean", "std", "p1", "p5", "p95", "p99"] {
            assert!(stats[key].is_f64(), "missing {key}");
        }
    }
}

#[test]
fn test_slices_follow_cache() {
    let pipeline = pipeline();

    // Before any simulation the fallback volume is served.
    assert_eq!(pipeline.fetch_slice(0, 0).unwrap().len(), 64 * 64 * 4);
    assert!(pipeline.fetch_slice(1, 3).is_ok());

    pipeline.simulate(&SimulationConfig::new(json!({}))).unwrap();

    let bytes = pipeline.fetch_slice(1, 2).unwrap();
    assert_eq!(bytes.len(), 8 * 10 * 4);
    let values = le_bytes_to_f32(&bytes).unwrap();
    let expected = ramp_volume(2, 3, 8, 10);
    for (i, value) in values.iter().enumerate() {
        assert_eq!(*value, expected[[1, 2, i / 10, i % 10]] as f32);
    }

    // Boundary indices
    assert!(pipeline.fetch_slice(1, 2).is_ok());
    assert!(matches!(
        pipeline.fetch_slice(2, 0),
        Err(VolumeError::OutOfRange { channel: 2, depth: 0, .. })
    ));
    assert!(matches!(
        pipeline.fetch_slice(0, 3),
        Err(VolumeError::OutOfRange { channel: 0, depth: 3, .. })
    ));
}

#[test]
fn test_rejected_simulation_keeps_previous_result() {
    let pipeline = pipeline();
    pipeline.simulate(&SimulationConfig::new(json!({}))).unwrap();
    let before = pipeline.describe_current();

    let err = pipeline
        .simulate(&SimulationConfig::new(json!({"reject": true})))
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid simulation parameters:"));
    assert_eq!(pipeline.describe_current(), before);
}

#[test]
fn test_fallback_summary() {
    let summary = pipeline().fallback_preview_stats();
    assert_eq!(summary.shape.dims(), [2, 4, 64, 64]);
    assert_eq!(summary.stats.len(), 2);
    assert!(summary.stats.iter().all(ChannelStatistics::is_ordered));
    assert_ne!(summary.stats[0], ChannelStatistics::DEGENERATE);
}
