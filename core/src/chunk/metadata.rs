use crate::prelude::{AimError, AimResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Acquisition metadata accompanying a PSD chunk.
///
/// Fixed schema with explicit optional fields; keys the schema does not
/// know land in the `extra` side table so newer acquisition records stay
/// readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    /// Resolution bandwidth in Hz.
    pub rbw: Option<f64>,
    /// View bandwidth in Hz.
    pub vbw: Option<f64>,
    pub freq_start: Option<f64>,
    pub freq_stop: Option<f64>,
    pub freq_span: Option<f64>,
    pub freq_center: Option<f64>,
    pub psd_unit: Option<String>,
    pub ref_level: Option<f64>,
    pub avg: Option<bool>,
    pub maxh: Option<bool>,
    pub avg_maxh_count: Option<u64>,
    pub sweep_time_s: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ChunkMetadata {
    /// Parses a one-line JSON metadata record as persisted alongside a
    /// measurement grid.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text.trim())
    }

    pub fn is_empty(&self) -> bool {
        *self == ChunkMetadata::default()
    }

    /// Frequency span in Hz, required by bin-spacing computations.
    pub fn require_freq_span(&self) -> AimResult<f64> {
        self.freq_span.ok_or(AimError::MissingMetadata("freq_span"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_parses_known_and_unknown_keys() {
        let text = r#"{"rbw": 10000.0, "vbw": 10000.0, "freq_span": 5000000.0,
                       "psd_unit": "dBm", "avg": true, "avg_maxh_count": 20,
                       "duration_s": 421.7}"#;
        let meta = ChunkMetadata::from_json_str(text).unwrap();
        assert_eq!(meta.rbw, Some(10000.0));
        assert_eq!(meta.psd_unit.as_deref(), Some("dBm"));
        assert_eq!(meta.avg_maxh_count, Some(20));
        assert!(meta.extra.contains_key("duration_s"));
    }

    #[test]
    fn missing_span_is_an_explicit_error() {
        let meta = ChunkMetadata::default();
        assert!(matches!(
            meta.require_freq_span(),
            Err(AimError::MissingMetadata("freq_span"))
        ));
    }

    #[test]
    fn garbage_text_fails_to_parse() {
        assert!(ChunkMetadata::from_json_str("not a record").is_err());
    }
}
