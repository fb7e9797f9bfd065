//! Customer lifecycle management.
//!
//! Thin orchestration over [`RecordStore`]: token generation on create and
//! rotate, override validation, and derived (never persisted) subscribe
//! URLs. Constructed once at process start and passed by handle to the
//! HTTP layer and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::{CustomerPatch, CustomerRecord, NodeGroup, OverrideNodes};
use crate::store::RecordStore;
use crate::token::{TOKEN_LENGTH, generate_token};

/// Fields supplied when creating a customer; the token is generated.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub nodes: NodeGroup,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub ip_source: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub primary_display_name: Option<String>,
    #[serde(default)]
    pub backup_display_name: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, nodes: NodeGroup) -> Self {
        Self {
            name: name.into(),
            nodes,
            enabled: true,
            ip_source: None,
            expires_at: None,
            remark: None,
            primary_display_name: None,
            backup_display_name: None,
        }
    }
}

/// Result of a token rotation.
#[derive(Debug, Clone, Serialize)]
pub struct RotatedToken {
    pub old_token: String,
    pub new_token: String,
    #[serde(skip)]
    pub record: CustomerRecord,
}

/// Derived subscription URLs for a token; computed, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeUrls {
    pub v2rayn: String,
    pub clash: String,
}

impl SubscribeUrls {
    pub fn new(base_url: &str, token: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            v2rayn: format!("{base}/s/{token}/v2rayn"),
            clash: format!("{base}/s/{token}/clash"),
        }
    }
}

/// Customer lifecycle operations over a [`RecordStore`].
#[derive(Debug)]
pub struct CustomerManager {
    store: RecordStore,
}

impl CustomerManager {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Create a customer with a freshly generated token.
    pub fn create(&self, new: NewCustomer) -> Result<CustomerRecord, StoreError> {
        let now = Utc::now();
        let record = CustomerRecord {
            token: generate_token(TOKEN_LENGTH),
            name: new.name,
            enabled: new.enabled,
            nodes: new.nodes,
            override_nodes: None,
            ip_source: new.ip_source,
            expires_at: new.expires_at,
            remark: new.remark,
            primary_display_name: new.primary_display_name,
            backup_display_name: new.backup_display_name,
            created_at: now,
            updated_at: now,
        };
        self.store.create(record)
    }

    pub fn get(&self, token: &str) -> Result<Option<CustomerRecord>, StoreError> {
        self.store.get_by_token(token)
    }

    pub fn list(&self) -> Result<Vec<CustomerRecord>, StoreError> {
        self.store.list_all()
    }

    pub fn update(&self, token: &str, patch: &CustomerPatch) -> Result<CustomerRecord, StoreError> {
        self.store.update(token, patch)
    }

    /// Rotate the customer's token to a freshly generated one.
    pub fn rotate(&self, token: &str) -> Result<RotatedToken, StoreError> {
        let new_token = generate_token(TOKEN_LENGTH);
        let record = self.store.rotate_token(token, &new_token)?;
        Ok(RotatedToken {
            old_token: token.to_string(),
            new_token,
            record,
        })
    }

    /// Set an override; rejects one with neither slot populated.
    pub fn set_override(
        &self,
        token: &str,
        override_nodes: OverrideNodes,
    ) -> Result<CustomerRecord, StoreError> {
        if override_nodes.is_empty() {
            return Err(StoreError::EmptyOverride);
        }
        self.store.set_override(token, override_nodes)
    }

    pub fn clear_override(&self, token: &str) -> Result<CustomerRecord, StoreError> {
        self.store.clear_override(token)
    }

    pub fn delete(&self, token: &str) -> Result<bool, StoreError> {
        self.store.delete(token)
    }
}
