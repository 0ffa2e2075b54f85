// Persisted record of one created resource.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleetprov_api::ApiCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::LifecycleStatus;

/// What the store remembers about a resource between runs.
///
/// `response` is the creation response with every sensitive field removed;
/// those fields survive only as SHA-256 digests in `sensitive_digests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub logical_name: String,
    pub service: String,
    /// The creation action that produced this record.
    pub action: String,
    pub physical_id: String,
    /// Digest of the create action and its resolved parameters.
    pub fingerprint: String,
    pub response: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sensitive_digests: BTreeMap<String, String>,
    /// Fully resolved calls to run before `delete`, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_delete: Vec<ApiCall>,
    /// Fully resolved teardown call, if the resource has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<ApiCall>,
    /// Set when the resource exists remotely but its teardown calls could
    /// not be resolved. Such a record is never treated as settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LifecycleStatus>,
    /// Position in creation order; teardown walks it backwards.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn label(&self) -> String {
        format!("{}:{}", self.service, self.action)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
