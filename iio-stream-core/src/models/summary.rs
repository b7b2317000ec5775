use serde::{Deserialize, Serialize};

/// Summary of a streaming session that ended cleanly.
///
/// Serializable for the JSON sidecar written by `storage::summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub id: String,
    pub part: String,
    pub device: String,
    pub started_at: String,
    pub duration_secs: f64,
    pub buffers_captured: u64,
    pub samples_captured: u64,
}

impl StreamSummary {
    /// Starts a summary for a session that begins streaming now.
    pub fn begin(part: &str, device: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            part: part.to_string(),
            device: device.to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
            duration_secs: 0.0,
            buffers_captured: 0,
            samples_captured: 0,
        }
    }

    /// Average samples per captured buffer.
    pub fn samples_per_buffer(&self) -> f64 {
        if self.buffers_captured == 0 {
            return 0.0;
        }
        self.samples_captured as f64 / self.buffers_captured as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_stamps_id_and_time() {
        let summary = StreamSummary::begin("AD7768", "axi-ad7768-adc");

        assert_eq!(summary.id.len(), 36);
        assert!(chrono::DateTime::parse_from_rfc3339(&summary.started_at).is_ok());
        assert_eq!(summary.buffers_captured, 0);
    }

    #[test]
    fn samples_per_buffer() {
        let mut summary = StreamSummary::begin("AD7606B", "axi-ad7606-adc");
        assert_eq!(summary.samples_per_buffer(), 0.0);

        summary.buffers_captured = 4;
        summary.samples_captured = 1600;
        assert_eq!(summary.samples_per_buffer(), 400.0);
    }
}
