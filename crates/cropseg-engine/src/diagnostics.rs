//! Session diagnostics: how often the session re-encoded, and how long the
//! inference engine took.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Running counters for one [`Session`](crate::Session).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    /// Successful encodes.
    pub encodes: u64,
    /// Prompts served from the existing encoding.
    pub reuses: u64,
    /// Prompts that grew the encoded region to the viewport.
    pub extends: u64,
    /// Prompts that moved the encoded region.
    pub recrops: u64,
    /// Successful predictions.
    pub predictions: u64,
    /// Failed encode or predict calls.
    pub failures: u64,
    /// Wall-clock time spent in encode calls, failed ones included.
    #[serde(with = "duration_serde")]
    pub encode_time: Duration,
    /// Wall-clock time spent in predict calls, failed ones included.
    #[serde(with = "duration_serde")]
    pub predict_time: Duration,
}

impl SessionDiagnostics {
    /// Mean duration of an encode call, or `None` before the first one.
    #[must_use]
    pub fn mean_encode_time(&self) -> Option<Duration> {
        let calls = u32::try_from(self.encodes).ok().filter(|&n| n > 0)?;
        Some(self.encode_time / calls)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Session Diagnostics Report\n{}", "=".repeat(48)));
        lines.push(format!(
            "{:<14} {:>8} {:>12}",
            "Call", "Count", "Total"
        ));
        lines.push("-".repeat(48));
        lines.push(format!(
            "{:<14} {:>8} {:>10.3}ms",
            "encode",
            self.encodes,
            duration_ms(self.encode_time),
        ));
        lines.push(format!(
            "{:<14} {:>8} {:>10.3}ms",
            "predict",
            self.predictions,
            duration_ms(self.predict_time),
        ));
        lines.push(String::new());
        lines.push(format!(
            "Decisions: reuse {}  |  extend {}  |  recrop {}",
            self.reuses, self.extends, self.recrops,
        ));
        if self.failures > 0 {
            lines.push(format!("Failures: {}", self.failures));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
