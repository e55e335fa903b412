//! In-process fake of the dashboard API for client and orchestration tests.

use crate::client::ApiClient;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ReadingsReply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl ReadingsReply {
    pub fn ok(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReadingsRequest {
    pub sensor_id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

struct FakeState {
    sensors: (StatusCode, String),
    readings: HashMap<String, ReadingsReply>,
    requests: Vec<ReadingsRequest>,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeApi {
    base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState {
            sensors: (StatusCode::OK, "[]".to_string()),
            readings: HashMap::new(),
            requests: Vec::new(),
        }));
        let app = Router::new()
            .route("/api/sensors", get(sensors))
            .route("/api/readings/{sensor_id}", get(readings))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake api");
        let addr = listener.local_addr().expect("fake api addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
            server,
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url, reqwest::Client::new()).expect("fake api client")
    }

    pub fn set_sensors(&self, status: StatusCode, body: &str) {
        self.state.lock().unwrap().sensors = (status, body.to_string());
    }

    pub fn set_readings(&self, sensor_id: &str, reply: ReadingsReply) {
        self.state
            .lock()
            .unwrap()
            .readings
            .insert(sensor_id.to_string(), reply);
    }

    pub fn readings_requests(&self) -> Vec<ReadingsRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn sensors(State(state): State<Shared>) -> Response {
    let (status, body) = state.lock().unwrap().sensors.clone();
    json_response(status, body)
}

async fn readings(
    State(state): State<Shared>,
    Path(sensor_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let reply = {
        let mut guard = state.lock().unwrap();
        guard.requests.push(ReadingsRequest {
            sensor_id: sensor_id.clone(),
            start_time: params.get("startTime").cloned(),
            end_time: params.get("endTime").cloned(),
        });
        guard.readings.get(&sensor_id).cloned()
    };
    let Some(reply) = reply else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    json_response(reply.status, reply.body)
}
