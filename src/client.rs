use crate::config::{parse_base_url, ClientConfig};
use crate::error::ClientError;
use crate::model::{RawSensorData, SensorData};
use crate::window::QueryWindow;
use anyhow::Result;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

const SENSORS_RESOURCE: &str = "sensor IDs";
const READINGS_RESOURCE: &str = "sensor data";

/// HTTP client for the dashboard API.
///
/// Both operations propagate every failure (transport, status, body) to the
/// caller; nothing is swallowed into an empty result.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, http: Client) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_sensors(&self) -> Result<Vec<String>, ClientError> {
        let url = self.endpoint(&["sensors"]);
        tracing::debug!(url = %url, "fetching sensor ids");
        let ids = self
            .get_body(url, SENSORS_RESOURCE)
            .await
            .and_then(|body| Ok(serde_json::from_slice::<Vec<String>>(&body)?))
            .inspect_err(|err| tracing::warn!(error = %err, "failed to fetch sensor ids"))?;
        Ok(ids)
    }

    pub async fn fetch_sensor_data(
        &self,
        sensor_id: &str,
        window: QueryWindow,
    ) -> Result<SensorData, ClientError> {
        if sensor_id.trim().is_empty() {
            return Err(ClientError::InvalidSensorId);
        }

        let mut url = self.endpoint(&["readings", sensor_id]);
        url.query_pairs_mut().extend_pairs(window.query_pairs());
        tracing::debug!(
            sensor_id,
            start_time = window.start_time(),
            end_time = window.end_time(),
            "fetching sensor data"
        );

        let raw = self
            .get_body(url, READINGS_RESOURCE)
            .await
            .and_then(|body| Ok(RawSensorData::from_slice(&body)?))
            .inspect_err(|err| {
                tracing::warn!(sensor_id, error = %err, "failed to fetch sensor data")
            })?;
        let data = raw.normalize();
        tracing::debug!(sensor_id, points = data.data_points.len(), "sensor data loaded");
        Ok(data)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // base_url went through parse_base_url, so it always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_body(&self, url: Url, resource: &'static str) -> Result<Bytes, ClientError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::RequestFailed {
                resource,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(response.bytes().await?)
    }
}
