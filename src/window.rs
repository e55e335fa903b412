use crate::error::ClientError;
use chrono::Utc;
use serde::Serialize;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Inclusive `[start_time, end_time]` range in Unix milliseconds.
///
/// This is the only window shape the retrieval client accepts. Relative
/// "hours back" input is converted here, before it reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryWindow {
    start_time: i64,
    end_time: i64,
}

impl QueryWindow {
    pub fn new(start_time: i64, end_time: i64) -> Result<Self, ClientError> {
        if end_time < start_time {
            return Err(ClientError::InvalidWindow {
                start_time,
                end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn last_hours(hours: u32, now_ms: i64) -> Self {
        let span = i64::from(hours).saturating_mul(MILLIS_PER_HOUR);
        Self {
            start_time: now_ms.saturating_sub(span),
            end_time: now_ms,
        }
    }

    pub fn trailing_hours(hours: u32) -> Self {
        Self::last_hours(hours, Utc::now().timestamp_millis())
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("startTime", self.start_time.to_string()),
            ("endTime", self.end_time.to_string()),
        ]
    }
}
