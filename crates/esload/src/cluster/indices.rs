//! 🗂️ Index manager: exists, create, delete. The three verbs of index lifecycle.
//!
//! Every one of them runs the liveness check first. If the cluster isn't answering
//! `HEAD /`, there is no point asking it about indices, and we say `Connection` instead.

use std::path::Path;

use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::cluster::ClusterClient;
use crate::errors::{ClusterError, LoadError};
use crate::loaders::load_config;

/// ⚠️ Delete treats these as "nothing to delete", not as failure.
const BENIGN_DELETE_STATUSES: [u16; 2] = [400, 404];

/// 📜 An index name plus the body used to create it. Read fresh per creation, never cached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDescriptor {
    pub name: String,
    pub body: Option<Map<String, Value>>,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// 📂 Build a descriptor from the settings file (required) and mapping file (optional).
    ///
    /// 💀 Either file failing to load is a `LoadError::Config`. No defaulting.
    pub async fn load(
        name: impl Into<String>,
        settings_file: &Path,
        mapping_file: Option<&Path>,
    ) -> Result<Self, LoadError> {
        let mut body = Map::new();
        body.insert(
            "settings".to_string(),
            Value::Object(load_config(settings_file).await?),
        );
        if let Some(mapping_file) = mapping_file {
            body.insert(
                "mappings".to_string(),
                Value::Object(load_config(mapping_file).await?),
            );
        }
        Ok(Self::new(name).with_body(body))
    }
}

/// 🗂️ Index lifecycle operations over a shared `ClusterClient`.
#[derive(Debug, Clone)]
pub struct IndexManager {
    client: ClusterClient,
}

impl IndexManager {
    pub fn new(client: ClusterClient) -> Self {
        Self { client }
    }

    /// 🔎 `HEAD /{index}`: 200 is yes, 404 is no, anything else is the cluster having a moment.
    pub async fn exists(&self, index: &str) -> Result<bool, ClusterError> {
        self.client.ensure_connected().await?;

        let response = self
            .client
            .send(self.client.index_request(Method::HEAD, index)?)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ClusterError::index(index, status.as_u16(), "")),
        }
    }

    /// 🏗️ `PUT /{index}` with the descriptor's body.
    ///
    /// Not idempotent. Creating an index that already exists gets the cluster's own
    /// conflict error back, wrapped as `ClusterError::Index`.
    pub async fn create(&self, descriptor: &IndexDescriptor) -> Result<(), ClusterError> {
        self.client.ensure_connected().await?;

        let mut request = self.client.index_request(Method::PUT, &descriptor.name)?;
        if let Some(ref body) = descriptor.body {
            request = request.json(body);
        }

        let response = self.client.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterError::index(&descriptor.name, status.as_u16(), body));
        }

        info!("🏗️ created index '{}'", descriptor.name);
        Ok(())
    }

    /// 🗑️ `DELETE /{index}`. Not-found (and a bad-request) counts as already gone.
    pub async fn delete(&self, index: &str) -> Result<(), ClusterError> {
        self.client.ensure_connected().await?;

        let response = self
            .client
            .send(self.client.index_request(Method::DELETE, index)?)
            .await?;
        let status = response.status();

        if status.is_success() {
            info!("🗑️ index '{}' deleted", index);
            Ok(())
        } else if BENIGN_DELETE_STATUSES.contains(&status.as_u16()) {
            debug!("🤷 index '{}' was not there to delete ({})", index, status);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClusterError::index(index, status.as_u16(), body))
        }
    }
}
