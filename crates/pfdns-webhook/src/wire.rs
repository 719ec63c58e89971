//! external-dns webhook wire types
//!
//! The webhook client is lenient about what it sends: empty lists may arrive
//! as `null` and change lists with either capitalized or camelCase keys.
//! Everything is optional on the way in.

use pfdns_core::record::{Changes, Endpoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Media type of every webhook request and response body
pub const MEDIA_TYPE: &str = "application/external.dns.webhook+json;version=1";

/// Endpoint as exchanged with external-dns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEndpoint {
    #[serde(default)]
    pub dns_name: String,

    #[serde(default)]
    pub targets: Option<Vec<String>>,

    #[serde(default)]
    pub record_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,

    #[serde(default, rename = "recordTTL", skip_serializing_if = "Option::is_none")]
    pub record_ttl: Option<i64>,

    #[serde(default, skip_serializing_if = "no_labels")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_specific: Option<Vec<ProviderSpecificProperty>>,
}

fn no_labels(labels: &Option<BTreeMap<String, String>>) -> bool {
    labels.as_ref().is_none_or(BTreeMap::is_empty)
}

/// Provider-specific key/value pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpecificProperty {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl From<WireEndpoint> for Endpoint {
    fn from(wire: WireEndpoint) -> Self {
        Endpoint {
            name: wire.dns_name,
            record_type: wire.record_type,
            targets: wire.targets.unwrap_or_default(),
            labels: wire.labels.unwrap_or_default(),
        }
    }
}

impl From<Endpoint> for WireEndpoint {
    fn from(endpoint: Endpoint) -> Self {
        WireEndpoint {
            dns_name: endpoint.name,
            targets: Some(endpoint.targets),
            record_type: endpoint.record_type,
            labels: Some(endpoint.labels),
            ..WireEndpoint::default()
        }
    }
}

/// Body of `POST /records`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChanges {
    #[serde(default, alias = "Create")]
    pub create: Option<Vec<WireEndpoint>>,

    #[serde(default, alias = "UpdateOld")]
    pub update_old: Option<Vec<WireEndpoint>>,

    #[serde(default, alias = "UpdateNew")]
    pub update_new: Option<Vec<WireEndpoint>>,

    #[serde(default, alias = "Delete")]
    pub delete: Option<Vec<WireEndpoint>>,
}

impl From<WireChanges> for Changes {
    /// `updateOld` carries the previous state, which the reconciler does not need
    fn from(wire: WireChanges) -> Self {
        let convert = |list: Option<Vec<WireEndpoint>>| -> Vec<Endpoint> {
            list.unwrap_or_default().into_iter().map(Endpoint::from).collect()
        };

        Changes {
            create: convert(wire.create),
            update: convert(wire.update_new),
            delete: convert(wire.delete),
        }
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    pub filters: Vec<String>,
}
