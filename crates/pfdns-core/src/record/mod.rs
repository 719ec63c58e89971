//! Record model: desired-state endpoints and their remote host override form
//!
//! - [`Endpoint`]: what the sync protocol asks for (name, type, targets, labels)
//! - [`HostRecord`]: what the remote store holds (host, domain, ip, description)
//! - [`HostKey`]: the `(host, domain)` identity used to match the two
//! - [`Changes`]: one batch of create/update/delete requests
//!
//! Conversions live in [`name`], [`metadata`] and [`mapper`].

pub mod mapper;
pub mod metadata;
pub mod name;
pub mod section;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use mapper::{to_endpoint, to_host_record};
pub use metadata::{DecodedMetadata, decode, encode};
pub use name::{join, split};
pub use section::HostOverrideSection;

/// Address written into `ip` for records that are not `A` records.
///
/// The remote schema requires a populated address on every host override.
pub const PLACEHOLDER_IP: &str = "127.0.0.1";

/// Supported DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Text record
    #[serde(rename = "TXT")]
    Txt,
}

impl RecordType {
    /// Wire spelling of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(RecordType::A),
            "TXT" => Ok(RecordType::Txt),
            other => Err(Error::unsupported_record_type(other)),
        }
    }
}

/// Desired-state DNS record
///
/// `record_type` is kept as the raw string received so that unsupported
/// types can be reported precisely by [`to_host_record`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Fully-qualified record name (e.g. "www.example.com")
    #[serde(rename = "dnsName")]
    pub name: String,

    /// Record type ("A", "TXT")
    #[serde(default)]
    pub record_type: String,

    /// Record targets, in order
    #[serde(default)]
    pub targets: Vec<String>,

    /// Free-form labels attached by the sync client
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Endpoint {
    /// Create a new endpoint without labels
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            labels: BTreeMap::new(),
        }
    }

    /// Endpoint carrying only a name, as used for deletions
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// A host override entry as stored by the remote appliance
///
/// Fields the core does not interpret are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Single host label, empty for the apex of `domain`
    #[serde(default)]
    pub host: String,

    /// Domain suffix
    #[serde(default)]
    pub domain: String,

    /// Address of the override
    #[serde(default)]
    pub ip: String,

    /// Free-text field carrying the encoded metadata
    #[serde(default, rename = "descr")]
    pub description: String,

    /// Remaining fields (aliases, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HostRecord {
    /// Create a new host record as it should look when first written
    pub fn new(
        host: impl Into<String>,
        domain: impl Into<String>,
        ip: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut extra = Map::new();
        // pfSense expects the element to be present on every override
        extra.insert("aliases".to_string(), Value::String(String::new()));

        Self {
            host: host.into(),
            domain: domain.into(),
            ip: ip.into(),
            description: description.into(),
            extra,
        }
    }

    /// Identity key of this record
    pub fn key(&self) -> HostKey {
        HostKey::of_record(self)
    }
}

/// Identity key `(host, domain)` shared by endpoints and host records
///
/// No case or trailing-dot normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostKey {
    /// Host label
    pub host: String,
    /// Domain suffix
    pub domain: String,
}

impl HostKey {
    /// Key of a record name
    ///
    /// # Errors
    ///
    /// [`Error::NameFormat`] when the name cannot be split.
    pub fn of_name(name: &str) -> Result<Self> {
        let (host, domain) = split(name)?;
        Ok(Self { host, domain })
    }

    /// Key of an existing host record
    ///
    /// The literal `host.domain` name is re-split so that entries authored by hand
    /// (e.g. host "router", domain "lan") key the same way as the endpoint that
    /// names them. Records whose name cannot take that path keep their literal pair.
    pub fn of_record(record: &HostRecord) -> Self {
        let literal = Self {
            host: record.host.clone(),
            domain: record.domain.clone(),
        };
        if literal.host.contains('.') || literal.domain.is_empty() {
            return literal;
        }
        Self::of_name(&literal.to_string()).unwrap_or(literal)
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            write!(f, "{}", self.domain)
        } else {
            write!(f, "{}.{}", self.host, self.domain)
        }
    }
}

/// One batch of requested changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    /// Endpoints to create
    #[serde(default)]
    pub create: Vec<Endpoint>,

    /// Endpoints to update (new desired state)
    #[serde(default)]
    pub update: Vec<Endpoint>,

    /// Endpoints to delete (only the name is used)
    #[serde(default)]
    pub delete: Vec<Endpoint>,
}

impl Changes {
    /// Whether the batch requests nothing at all
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Total number of requested changes
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("A".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("TXT".parse::<RecordType>().unwrap(), RecordType::Txt);

        let err = "MX".parse::<RecordType>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedRecordType(ref t) if t == "MX"));

        // No case folding
        assert!("txt".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_host_record_keeps_unknown_fields() {
        let json = serde_json::json!({
            "host": "nas",
            "domain": "home.lan",
            "ip": "10.0.0.5",
            "descr": "",
            "aliases": { "item": [{ "host": "files", "domain": "home.lan" }] }
        });

        let record: HostRecord = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(record.host, "nas");
        assert!(record.extra.contains_key("aliases"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_host_record_missing_fields_default_to_empty() {
        let record: HostRecord =
            serde_json::from_value(serde_json::json!({ "domain": "x.com", "ip": "1.1.1.1" }))
                .unwrap();
        assert_eq!(record.host, "");
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_new_host_record_has_empty_aliases() {
        let record = HostRecord::new("a", "x.com", "1.1.1.1", "");
        assert_eq!(record.extra.get("aliases"), Some(&Value::String(String::new())));
    }

    #[test]
    fn test_record_key_for_hand_authored_entry() {
        // A two-label name keys as an apex record, whichever way it was stored
        let record = HostRecord::new("router", "lan", "10.0.0.1", "");
        assert_eq!(record.key(), HostKey::of_name("router.lan").unwrap());
    }

    #[test]
    fn test_record_key_falls_back_to_literal_pair() {
        let record = HostRecord::new("a.b", "x.com", "10.0.0.1", "");
        assert_eq!(
            record.key(),
            HostKey {
                host: "a.b".to_string(),
                domain: "x.com".to_string()
            }
        );
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(Changes::default().is_empty());

        let changes = Changes {
            delete: vec![Endpoint::named("a.x.com")],
            ..Changes::default()
        };
        assert!(!changes.is_empty());
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_endpoint_wire_names() {
        let endpoint = Endpoint::new("a.x.com", "A", ["1.1.1.1"]).with_label("owner", "default");
        let json = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(json["dnsName"], "a.x.com");
        assert_eq!(json["recordType"], "A");
        assert_eq!(json["labels"]["owner"], "default");
    }
}
