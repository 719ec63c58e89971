//! Metadata carried in the host override description
//!
//! The remote schema has no room for record type, multiple targets or labels,
//! so they travel as a JSON object in the free-text `descr` field:
//!
//! ```json
//! {"dnsName":"txt.example.com","targets":["v=spf1 -all"],"labels":{"owner":"default"},"recordType":"TXT"}
//! ```
//!
//! Decoding is lenient. Descriptions written by hand or by other tools are
//! expected, and anything that is not such an object decodes to `None`.

use super::{Endpoint, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodedPayload<'a> {
    dns_name: &'a str,
    targets: &'a [String],
    #[serde(skip_serializing_if = "no_labels")]
    labels: &'a BTreeMap<String, String>,
    record_type: &'a str,
}

fn no_labels(labels: &&BTreeMap<String, String>) -> bool {
    labels.is_empty()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecodedPayload {
    #[serde(default)]
    record_type: Option<String>,
    #[serde(default)]
    targets: Option<Vec<String>>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

/// Attributes recovered from a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMetadata {
    /// Record type, `A` when the payload leaves it empty
    pub record_type: RecordType,
    /// Targets, the host's own address when the payload has none
    pub targets: Vec<String>,
    /// Labels, empty when absent
    pub labels: BTreeMap<String, String>,
}

/// Encode the endpoint attributes for the description field
pub fn encode(endpoint: &Endpoint) -> String {
    let payload = EncodedPayload {
        dns_name: &endpoint.name,
        targets: &endpoint.targets,
        labels: &endpoint.labels,
        record_type: &endpoint.record_type,
    };

    // Plain strings and string maps always serialize
    serde_json::to_string(&payload).unwrap_or_default()
}

/// Decode a description written by [`encode`]
///
/// `ip` is the host's address, used when the payload carries no targets.
/// Returns `None` for empty text, non-JSON text, JSON that is not an object of
/// the expected shape, and payloads naming a record type this system does not
/// manage.
pub fn decode(description: &str, ip: &str) -> Option<DecodedMetadata> {
    let trimmed = description.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }

    let payload: DecodedPayload = match serde_json::from_str(trimmed) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("Description is not a metadata payload: {}", e);
            return None;
        }
    };

    let record_type = match payload.record_type.as_deref() {
        None | Some("") => RecordType::A,
        Some(other) => match other.parse() {
            Ok(record_type) => record_type,
            Err(e) => {
                debug!("Ignoring metadata payload: {}", e);
                return None;
            }
        },
    };

    Some(DecodedMetadata {
        record_type,
        targets: payload.targets.unwrap_or_else(|| vec![ip.to_string()]),
        labels: payload.labels.unwrap_or_default(),
    })
}
