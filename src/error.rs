use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Error fetching {resource}: {status_text} ({status})")]
    RequestFailed {
        resource: &'static str,
        status: u16,
        status_text: String,
    },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid window: endTime {end_time} is before startTime {start_time}")]
    InvalidWindow { start_time: i64, end_time: i64 },

    #[error("Sensor ID is required")]
    InvalidSensorId,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the request never left the client.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidWindow { .. } | ClientError::InvalidSensorId
        )
    }
}
