//! Station name ↔ telecode lookup.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::Telecode;

use super::client::{StationClient, StationEntry};
use super::error::StationError;

/// Thread-safe bidirectional station lookup.
///
/// Loaded once at startup from the station list asset and held in
/// memory; `refresh` replaces the mapping in place.
#[derive(Clone)]
pub struct StationDirectory {
    inner: Arc<RwLock<StationMaps>>,
    client: StationClient,
}

#[derive(Default)]
struct StationMaps {
    code_by_name: HashMap<String, Telecode>,
    name_by_code: HashMap<Telecode, String>,
}

impl StationDirectory {
    /// Create a new directory by fetching the station list.
    ///
    /// This will fail if the endpoint is unreachable.
    pub async fn fetch(client: StationClient) -> Result<Self, StationError> {
        let stations = client.fetch_all().await?;
        let maps = build_maps(stations);

        Ok(Self {
            inner: Arc::new(RwLock::new(maps)),
            client,
        })
    }

    /// Create an empty directory (for tests).
    pub fn empty(client: StationClient) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StationMaps::default())),
            client,
        }
    }

    /// Look up a telecode by station display name.
    pub async fn code_of(&self, name: &str) -> Option<Telecode> {
        let guard = self.inner.read().await;
        guard.code_by_name.get(name).copied()
    }

    /// Look up a station display name by telecode.
    pub async fn name_of(&self, code: Telecode) -> Option<String> {
        let guard = self.inner.read().await;
        guard.name_by_code.get(&code).cloned()
    }

    /// Number of stations in the directory.
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.name_by_code.len()
    }

    /// Whether the directory is empty.
    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.name_by_code.is_empty()
    }

    /// Re-fetch the station list.
    ///
    /// On success, replaces the current mapping. On failure, the existing
    /// mapping is preserved and the error is returned.
    pub async fn refresh(&self) -> Result<usize, StationError> {
        let stations = self.client.fetch_all().await?;
        let maps = build_maps(stations);
        let count = maps.name_by_code.len();

        let mut guard = self.inner.write().await;
        *guard = maps;

        Ok(count)
    }

    /// Insert a station directly (for tests).
    #[cfg(test)]
    pub(crate) async fn insert(&self, name: &str, code: Telecode) {
        let mut guard = self.inner.write().await;
        guard.code_by_name.insert(name.to_string(), code);
        guard.name_by_code.insert(code, name.to_string());
    }
}

/// Build the bidirectional maps from parsed entries.
fn build_maps(stations: Vec<StationEntry>) -> StationMaps {
    let mut maps = StationMaps::default();
    for station in stations {
        maps.code_by_name.insert(station.name.clone(), station.telecode);
        maps.name_by_code.insert(station.telecode, station.name);
    }
    maps
}
