use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw sample as reported by a hydrometer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    pub gravity: f64,
    pub tilt: f64,
    pub temp: f64,
    pub volt: f64,
    /// Seconds between samples.
    pub interval: i64,
}

/// A reading as relayed by a gateway. Only seen on the raw ingest side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub reading: Reading,
    pub gateway_id: String,
    pub gateway_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub gravity: f64,
    pub tilt: f64,
    pub temp: f64,
    pub volt: f64,
    pub interval: i64,
}

impl DataPoint {
    pub fn from_reading(reading: &Reading, timestamp: i64) -> Self {
        Self {
            timestamp,
            gravity: reading.gravity,
            tilt: reading.tilt,
            temp: reading.temp,
            volt: reading.volt,
            interval: reading.interval,
        }
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

/// Readings for one sensor over one query window.
///
/// Only produced by [`RawSensorData::normalize`], so `data_points` is always
/// present and ordered by ascending timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    pub sensor_id: String,
    pub gateway_id: String,
    pub gateway_name: String,
    pub data_points: Vec<DataPoint>,
}

impl SensorData {
    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }

    pub fn latest(&self) -> Option<&DataPoint> {
        self.data_points.last()
    }
}

/// Body of `GET /readings/{sensorId}` as the server sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensorData {
    pub sensor_id: String,
    #[serde(default)]
    pub gateway_id: String,
    #[serde(default)]
    pub gateway_name: String,
    #[serde(default)]
    pub data_points: Option<Vec<DataPoint>>,
}

impl RawSensorData {
    /// Decodes a readings body. Only a JSON object is accepted; the derived
    /// impl alone would also take an array and fill fields by position.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let object: Map<String, Value> = serde_json::from_slice(body)?;
        serde_json::from_value(Value::Object(object))
    }

    pub fn normalize(self) -> SensorData {
        let mut data_points = self.data_points.unwrap_or_default();
        // stable: equal timestamps keep server order
        data_points.sort_by_key(|point| point.timestamp);
        SensorData {
            sensor_id: self.sensor_id,
            gateway_id: self.gateway_id,
            gateway_name: self.gateway_name,
            data_points,
        }
    }
}
