//! Observable dashboard state.
//!
//! Each container is a `tokio::sync::watch` channel, so any number of
//! observers can subscribe and see the latest value without polling. All
//! writes go through [`DashboardStore::update`], which serializes writers and
//! lets a multi-container change land as one step.

use crate::model::SensorData;
use crate::window::QueryWindow;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

pub struct DashboardStore {
    // guards writers and holds the fetch generation
    update_lock: Mutex<u64>,
    sensors: watch::Sender<Vec<String>>,
    selected_sensor_id: watch::Sender<Option<String>>,
    query_window: watch::Sender<QueryWindow>,
    sensor_data: watch::Sender<Option<Arc<SensorData>>>,
    loading: watch::Sender<bool>,
    error_message: watch::Sender<Option<String>>,
}

/// Point-in-time copy of every container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub sensors: Vec<String>,
    pub selected_sensor_id: Option<String>,
    pub query_window: QueryWindow,
    pub sensor_data: Option<SensorData>,
    pub loading: bool,
    pub error_message: Option<String>,
}

/// Write access handed out by [`DashboardStore::update`].
pub struct StoreTxn<'a> {
    store: &'a DashboardStore,
    generation: &'a mut u64,
}

impl DashboardStore {
    pub fn new(query_window: QueryWindow) -> Self {
        Self {
            update_lock: Mutex::new(0),
            sensors: watch::channel(Vec::new()).0,
            selected_sensor_id: watch::channel(None).0,
            query_window: watch::channel(query_window).0,
            sensor_data: watch::channel(None).0,
            loading: watch::channel(false).0,
            error_message: watch::channel(None).0,
        }
    }

    pub fn update<R>(&self, apply: impl FnOnce(&mut StoreTxn<'_>) -> R) -> R {
        let mut guard = self
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut txn = StoreTxn {
            store: self,
            generation: &mut *guard,
        };
        apply(&mut txn)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.update(|txn| DashboardSnapshot {
            sensors: txn.store.sensors(),
            selected_sensor_id: txn.selected_sensor_id(),
            query_window: txn.query_window(),
            sensor_data: txn.store.sensor_data().as_deref().cloned(),
            loading: txn.store.loading(),
            error_message: txn.store.error_message(),
        })
    }

    pub fn sensors(&self) -> Vec<String> {
        self.sensors.borrow().clone()
    }

    pub fn selected_sensor_id(&self) -> Option<String> {
        self.selected_sensor_id.borrow().clone()
    }

    pub fn query_window(&self) -> QueryWindow {
        *self.query_window.borrow()
    }

    pub fn sensor_data(&self) -> Option<Arc<SensorData>> {
        self.sensor_data.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error_message.borrow().clone()
    }

    pub fn subscribe_sensors(&self) -> watch::Receiver<Vec<String>> {
        self.sensors.subscribe()
    }

    pub fn subscribe_selected_sensor_id(&self) -> watch::Receiver<Option<String>> {
        self.selected_sensor_id.subscribe()
    }

    pub fn subscribe_query_window(&self) -> watch::Receiver<QueryWindow> {
        self.query_window.subscribe()
    }

    pub fn subscribe_sensor_data(&self) -> watch::Receiver<Option<Arc<SensorData>>> {
        self.sensor_data.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn subscribe_error_message(&self) -> watch::Receiver<Option<String>> {
        self.error_message.subscribe()
    }
}

impl StoreTxn<'_> {
    pub fn generation(&self) -> u64 {
        *self.generation
    }

    /// Invalidates every fetch started before this call.
    pub fn next_generation(&mut self) -> u64 {
        *self.generation = self.generation.wrapping_add(1);
        *self.generation
    }

    pub fn selected_sensor_id(&self) -> Option<String> {
        self.store.selected_sensor_id()
    }

    pub fn query_window(&self) -> QueryWindow {
        self.store.query_window()
    }

    pub fn set_sensors(&mut self, sensors: Vec<String>) {
        replace_if_changed(&self.store.sensors, sensors);
    }

    pub fn set_selected_sensor_id(&mut self, sensor_id: Option<String>) {
        replace_if_changed(&self.store.selected_sensor_id, sensor_id);
    }

    pub fn set_query_window(&mut self, window: QueryWindow) {
        replace_if_changed(&self.store.query_window, window);
    }

    pub fn set_sensor_data(&mut self, data: Option<Arc<SensorData>>) {
        self.store.sensor_data.send_replace(data);
    }

    pub fn set_loading(&mut self, loading: bool) {
        replace_if_changed(&self.store.loading, loading);
    }

    pub fn set_error_message(&mut self, message: Option<String>) {
        replace_if_changed(&self.store.error_message, message);
    }
}

fn replace_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DashboardStore {
        DashboardStore::new(QueryWindow::new(0, 1_000).unwrap())
    }

    fn data(sensor_id: &str) -> Arc<SensorData> {
        Arc::new(SensorData {
            sensor_id: sensor_id.to_string(),
            gateway_id: "gw1".to_string(),
            gateway_name: "Kitchen".to_string(),
            data_points: Vec::new(),
        })
    }

    #[test]
    fn starts_empty() {
        let store = store();
        let snapshot = store.snapshot();
        assert!(snapshot.sensors.is_empty());
        assert_eq!(snapshot.selected_sensor_id, None);
        assert_eq!(snapshot.sensor_data, None);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.error_message, None);
        assert_eq!(snapshot.query_window.end_time(), 1_000);
    }

    #[test]
    fn subscribers_see_latest_value() {
        let store = store();
        let mut loading = store.subscribe_loading();
        let mut selected = store.subscribe_selected_sensor_id();

        store.update(|txn| {
            txn.set_selected_sensor_id(Some("tilt-1".to_string()));
            txn.set_loading(true);
        });

        assert!(loading.has_changed().unwrap());
        assert!(*loading.borrow_and_update());
        assert_eq!(selected.borrow_and_update().as_deref(), Some("tilt-1"));
    }

    #[test]
    fn unchanged_values_do_not_notify() {
        let store = store();
        let mut loading = store.subscribe_loading();
        store.update(|txn| txn.set_loading(false));
        assert!(!loading.has_changed().unwrap());
    }

    #[test]
    fn sensor_data_is_replaced_whole() {
        let store = store();
        let mut rx = store.subscribe_sensor_data();
        store.update(|txn| txn.set_sensor_data(Some(data("tilt-1"))));
        store.update(|txn| txn.set_sensor_data(Some(data("tilt-2"))));

        assert!(rx.has_changed().unwrap());
        let current = rx.borrow_and_update().clone();
        assert_eq!(current.map(|d| d.sensor_id.clone()).as_deref(), Some("tilt-2"));
    }

    #[test]
    fn generation_advances_per_call() {
        let store = store();
        let first = store.update(|txn| txn.next_generation());
        let second = store.update(|txn| txn.next_generation());
        assert_eq!(second, first + 1);
        assert_eq!(store.update(|txn| txn.generation()), second);
    }

    #[test]
    fn snapshot_serializes_for_renderers() {
        let store = store();
        store.update(|txn| {
            txn.set_sensors(vec!["tilt-1".to_string()]);
            txn.set_error_message(Some("Error fetching sensor data: Not Found (404)".to_string()));
        });
        let value = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(value["sensors"], serde_json::json!(["tilt-1"]));
        assert_eq!(value["queryWindow"]["startTime"], 0);
        assert_eq!(value["loading"], false);
        assert!(value["errorMessage"].as_str().unwrap().contains("404"));
    }
}
