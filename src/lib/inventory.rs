use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::lib::error::{InventoryError, Result};

/// Kind of fleet resource the optimizer can analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instance,
    Volume,
}

impl ResourceKind {
    /// Path segment used by the inventory service
    pub fn as_query(&self) -> &'static str {
        match self {
            ResourceKind::Instance => "instances",
            ResourceKind::Volume => "volumes",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Instance => write!(f, "instance"),
            ResourceKind::Volume => write!(f, "volume"),
        }
    }
}

/// Lifecycle state as reported by the inventory service.
///
/// Only Running instances and Unattached volumes are eligible for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Running,
    Stopped,
    Attached,
    Unattached,
}

/// One utilization observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UtilizationSample {
    pub timestamp: DateTime<Utc>,
    pub percent: f64,
}

/// One observed compute instance or volume at analysis time.
///
/// Built fresh per analysis run from the inventory service and never
/// mutated afterwards. `utilization` is empty at inventory time; the
/// analysis passes fetch the series from the metrics source themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSample {
    pub id: String,
    pub kind: ResourceKind,
    pub type_class: String,
    pub state: ResourceState,
    /// Populated for volumes, used by the storage cost model
    pub size_gb: Option<u64>,
    pub utilization: Vec<UtilizationSample>,
}

/// Narrow read interface over the fleet inventory collaborator
pub trait InventoryProvider {
    fn list_resources(
        &self,
        kind: ResourceKind,
    ) -> impl Future<Output = Result<Vec<ResourceSample>>> + Send;
}

/// Wire format of the inventory service's resource listing
#[derive(Debug, Deserialize)]
struct InventoryResponse {
    resources: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    id: String,
    #[serde(rename = "type")]
    type_class: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    size_gb: Option<u64>,
    #[serde(default)]
    attachments: Vec<String>,
}

impl ResourceRecord {
    /// Map a wire record into the analysis data model.
    ///
    /// Instance state comes from the reported lifecycle string; volume
    /// state is derived from the attachment list, an empty list meaning
    /// the volume is unattached.
    fn into_sample(self, kind: ResourceKind) -> ResourceSample {
        let state = match kind {
            ResourceKind::Instance => {
                if self.state.as_deref() == Some("running") {
                    ResourceState::Running
                } else {
                    ResourceState::Stopped
                }
            }
            ResourceKind::Volume => {
                if self.attachments.is_empty() {
                    ResourceState::Unattached
                } else {
                    ResourceState::Attached
                }
            }
        };

        ResourceSample {
            id: self.id,
            kind,
            type_class: self.type_class,
            state,
            size_gb: self.size_gb,
            utilization: Vec::new(),
        }
    }
}

/// HTTP client for the fleet inventory service
pub struct InventoryClient {
    client: Client,
    endpoint: Url,
}

impl InventoryClient {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| InventoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    fn listing_url(&self, kind: ResourceKind) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(&format!(
            "{}/v1/resources",
            url.path().trim_end_matches('/')
        ));
        url.query_pairs_mut().append_pair("kind", kind.as_query());
        url
    }
}

impl InventoryProvider for InventoryClient {
    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceSample>> {
        let url = self.listing_url(kind);
        debug!("Listing {kind} resources from {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InventoryError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InventoryError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ))
            .into());
        }

        let listing: InventoryResponse = response
            .json()
            .await
            .map_err(|e| InventoryError::InvalidResponse(e.to_string()))?;

        let samples: Vec<ResourceSample> = listing
            .resources
            .into_iter()
            .map(|record| record.into_sample(kind))
            .collect();

        info!("Retrieved {} {kind} resources", samples.len());
        Ok(samples)
    }
}
