//! Fetch orchestration: drives the store through loading, result and error
//! for every selection or window change.

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::store::DashboardStore;
use crate::window::QueryWindow;
use anyhow::Result;
use std::sync::Arc;


/// How a readings fetch ended from the store's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed(String),
    /// A newer selection or window change started before this one resolved;
    /// its result was dropped.
    Superseded,
    NoSelection,
}

struct FetchTicket {
    generation: u64,
    sensor_id: String,
    window: QueryWindow,
}

/// Clears `loading` when a fetch future is dropped before it resolves.
/// A guard from a superseded generation leaves the flag alone.
struct LoadingGuard<'a> {
    store: &'a DashboardStore,
    generation: u64,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(store: &'a DashboardStore, generation: u64) -> Self {
        Self {
            store,
            generation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let generation = self.generation;
        self.store.update(|txn| {
            if txn.generation() == generation {
                tracing::debug!(generation, "sensor data fetch cancelled");
                txn.set_loading(false);
            }
        });
    }
}

#[derive(Clone)]
pub struct Dashboard {
    client: ApiClient,
    store: Arc<DashboardStore>,
}

impl Dashboard {
    pub fn new(client: ApiClient, store: Arc<DashboardStore>) -> Self {
        Self { client, store }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = ApiClient::from_config(config)?;
        let window = QueryWindow::trailing_hours(config.default_window_hours);
        Ok(Self::new(client, Arc::new(DashboardStore::new(window))))
    }

    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.store
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Refreshes the sensor list. A failure is written to `error_message`
    /// and also returned.
    pub async fn load_sensors(&self) -> Result<Vec<String>, ClientError> {
        match self.client.list_sensors().await {
            Ok(ids) => {
                tracing::info!(count = ids.len(), "sensor list loaded");
                self.store.update(|txn| txn.set_sensors(ids.clone()));
                Ok(ids)
            }
            Err(err) => {
                self.store
                    .update(|txn| txn.set_error_message(Some(err.to_string())));
                Err(err)
            }
        }
    }

    /// Initial load: sensor list, then the first sensor if none is selected.
    pub async fn initialize(&self) -> Result<FetchOutcome, ClientError> {
        let ids = self.load_sensors().await?;
        let first = self.store.update(|txn| match txn.selected_sensor_id() {
            Some(_) => None,
            None => ids.first().cloned(),
        });
        match first {
            Some(sensor_id) => Ok(self.select_sensor(&sensor_id).await),
            None => Ok(self.refresh().await),
        }
    }

    /// One load cycle. With an explicit sensor the list is still refreshed,
    /// but a list failure is only logged: the requested sensor is fetched
    /// regardless. Without one this is [`Dashboard::initialize`].
    pub async fn load(&self, sensor_id: Option<&str>) -> Result<FetchOutcome, ClientError> {
        let Some(sensor_id) = sensor_id else {
            return self.initialize().await;
        };
        if let Err(err) = self.load_sensors().await {
            tracing::warn!(sensor_id, error = %err, "sensor list unavailable, loading requested sensor");
        }
        Ok(self.select_sensor(sensor_id).await)
    }

    /// An empty id clears the selection.
    pub async fn select_sensor(&self, sensor_id: &str) -> FetchOutcome {
        let sensor_id = sensor_id.trim();
        let selection = (!sensor_id.is_empty()).then(|| sensor_id.to_string());
        self.store
            .update(|txn| txn.set_selected_sensor_id(selection));
        self.refresh().await
    }

    pub async fn set_window(&self, window: QueryWindow) -> FetchOutcome {
        self.store.update(|txn| txn.set_query_window(window));
        self.refresh().await
    }

    pub async fn set_hours_back(&self, hours: u32) -> FetchOutcome {
        self.set_window(QueryWindow::trailing_hours(hours)).await
    }

    /// Fetches readings for the current selection and window.
    ///
    /// Every call starts a new generation. The result is applied only if no
    /// later call has started by the time it resolves, so the store always
    /// ends up reflecting the most recent trigger. On failure `sensor_data`
    /// keeps its previous value. Dropping the future mid-fetch clears
    /// `loading` unless a newer fetch has already taken over.
    pub async fn refresh(&self) -> FetchOutcome {
        let ticket = self.store.update(|txn| {
            let generation = txn.next_generation();
            match txn.selected_sensor_id() {
                Some(sensor_id) => {
                    txn.set_loading(true);
                    txn.set_error_message(None);
                    Some(FetchTicket {
                        generation,
                        sensor_id,
                        window: txn.query_window(),
                    })
                }
                None => {
                    txn.set_loading(false);
                    None
                }
            }
        });
        let Some(ticket) = ticket else {
            return FetchOutcome::NoSelection;
        };

        let guard = LoadingGuard::new(&self.store, ticket.generation);
        let result = self
            .client
            .fetch_sensor_data(&ticket.sensor_id, ticket.window)
            .await;
        guard.disarm();

        self.store.update(|txn| {
            if txn.generation() != ticket.generation {
                tracing::debug!(
                    sensor_id = %ticket.sensor_id,
                    generation = ticket.generation,
                    current = txn.generation(),
                    "discarding stale sensor data response"
                );
                return FetchOutcome::Superseded;
            }
            match result {
                Ok(data) => {
                    txn.set_sensor_data(Some(Arc::new(data)));
                    txn.set_error_message(None);
                    txn.set_loading(false);
                    FetchOutcome::Applied
                }
                Err(err) => {
                    let message = err.to_string();
                    txn.set_error_message(Some(message.clone()));
                    txn.set_loading(false);
                    FetchOutcome::Failed(message)
                }
            }
        })
    }
}
