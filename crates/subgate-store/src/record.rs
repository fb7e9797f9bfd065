//! Customer record data model and the pure override resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subgate_link::ProxyDescriptor;

/// One proxy endpoint as stored on a customer record.
///
/// `share` is the opaque protocol URI handed out to aggregated-link
/// subscribers. `descriptor`, when present, always wins over re-deriving
/// from `share`; it is how undecodable schemes (vless/trojan/http) become
/// renderable in the structured format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub share: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<ProxyDescriptor>,
}

impl Node {
    pub fn new(share: impl Into<String>) -> Self {
        Self {
            share: share.into(),
            descriptor: None,
        }
    }

    pub fn with_descriptor(share: impl Into<String>, descriptor: ProxyDescriptor) -> Self {
        Self {
            share: share.into(),
            descriptor: Some(descriptor),
        }
    }
}

/// The two endpoint roles every customer has, both always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub primary: Node,
    pub backup: Node,
}

/// Temporary per-slot replacement endpoints.
///
/// At least one of `primary`/`backup` is set on any stored override; the
/// lifecycle manager rejects empty ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverrideNodes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OverrideNodes {
    /// True when neither slot is set.
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.backup.is_none()
    }
}

/// Endpoint role selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Backup,
}

impl Slot {
    /// Fixed rendering order.
    pub const ALL: [Slot; 2] = [Slot::Primary, Slot::Backup];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Primary => "primary",
            Slot::Backup => "backup",
        }
    }
}

/// One customer, identified by a unique secret token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub token: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub nodes: NodeGroup,
    #[serde(
        rename = "override",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub override_nodes: Option<OverrideNodes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl CustomerRecord {
    /// Resolve the node in effect for a slot, honoring any override.
    ///
    /// Total: the base node for each slot is always present.
    pub fn effective_node(&self, slot: Slot) -> &Node {
        let overridden = self.override_nodes.as_ref().and_then(|o| match slot {
            Slot::Primary => o.primary.as_ref(),
            Slot::Backup => o.backup.as_ref(),
        });
        overridden.unwrap_or(match slot {
            Slot::Primary => &self.nodes.primary,
            Slot::Backup => &self.nodes.backup,
        })
    }

    /// Display name used when rendering a slot, falling back to the
    /// customer name.
    pub fn display_name(&self, slot: Slot) -> &str {
        let specific = match slot {
            Slot::Primary => self.primary_display_name.as_deref(),
            Slot::Backup => self.backup_display_name.as_deref(),
        };
        specific.unwrap_or(&self.name)
    }

    pub fn has_override(&self) -> bool {
        self.override_nodes.is_some()
    }
}

/// The persisted collection document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordCollection {
    #[serde(default)]
    pub customers: Vec<CustomerRecord>,
}

/// Partial update for a customer record.
///
/// Only the supplied fields are merged; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub nodes: Option<NodeGroup>,
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

impl CustomerPatch {
    /// Merge the supplied fields into `record`.
    pub(crate) fn apply(&self, record: &mut CustomerRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(enabled) = self.enabled {
            record.enabled = enabled;
        }
        if let Some(nodes) = &self.nodes {
            record.nodes = nodes.clone();
        }
        if let Some(ip_source) = &self.ip_source {
            record.ip_source = Some(ip_source.clone());
        }
        if let Some(expires_at) = self.expires_at {
            record.expires_at = Some(expires_at);
        }
        if let Some(remark) = &self.remark {
            record.remark = Some(remark.clone());
        }
        if let Some(name) = &self.primary_display_name {
            record.primary_display_name = Some(name.clone());
        }
        if let Some(name) = &self.backup_display_name {
            record.backup_display_name = Some(name.clone());
        }
    }
}
