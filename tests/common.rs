/// Shared helpers: synthetic shots and on-disk stores.
use std::path::Path;

use serde_json::{json, Value};

/// Irregular time base: `n` samples from `t0`, nominal step `dt`, with a
/// deterministic jitter of up to 30 % of a step.
#[allow(unused)]
pub fn jittered_time(t0: f64, dt: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| t0 + i as f64 * dt + ((i * 7919) % 10) as f64 * 0.03 * dt)
        .collect()
}

#[allow(unused)]
/// Legacy-layout JSON record with every channel sampled on `time`.
pub fn legacy_record(time: &[f64], disruption: Value, channels: &[&str]) -> Value {
    let mut sig = serde_json::Map::new();
    sig.insert("time".into(), json!(time));
    for (k, ch) in channels.iter().enumerate() {
        let signal: Vec<f64> = time.iter().map(|t| (k + 1) as f64 * t).collect();
        sig.insert((*ch).into(), json!({ "signal": signal }));
    }
    json!({
        "SIG": sig,
        "objDIS": { "disr_ipla_td": [[0.0], [disruption]] },
        "Discharge": {
            "Ramp_up": [40.0, 45.0],
            "Flat_top": [45.0, 58.0],
            "Ramp_down": [58.0, 70.0]
        }
    })
}

#[allow(unused)]
/// Write `record` as `<dir>/<name>`.
pub fn write_record(dir: &Path, name: &str, record: &Value) {
    std::fs::write(dir.join(name), serde_json::to_vec(record).unwrap()).unwrap();
}

#[allow(unused)]
/// Maximum absolute difference between two slices.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
