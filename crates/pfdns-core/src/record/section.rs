//! The configuration section that holds the host overrides
//!
//! Only the `hosts` entry is interpreted. Every other key of the section
//! (ACLs, resolver options, ...) is carried through untouched, and the host
//! list is written back at the position it was read from.

use super::HostRecord;
use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Key of the host override list inside the section
pub const HOSTS_KEY: &str = "hosts";

/// A fetched configuration section
#[derive(Debug, Clone, PartialEq)]
pub struct HostOverrideSection {
    contents: Map<String, Value>,
}

impl HostOverrideSection {
    /// Wrap a fetched section value
    ///
    /// # Errors
    ///
    /// [`Error::Rpc`] when the value is not a structure.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(contents) => Ok(Self { contents }),
            // An empty section comes back as an empty string
            Value::String(s) if s.is_empty() => Ok(Self {
                contents: Map::new(),
            }),
            other => Err(Error::rpc(format!(
                "section is not a structure: {}",
                type_name(&other)
            ))),
        }
    }

    /// Host overrides currently in the section
    ///
    /// A missing or empty `hosts` entry means there are none.
    pub fn hosts(&self) -> Result<Vec<HostRecord>> {
        match self.contents.get(HOSTS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| serde_json::from_value(item.clone()).map_err(Error::from))
                .collect(),
            // A lone entry may be collapsed into a single structure
            Some(item @ Value::Object(_)) => Ok(vec![serde_json::from_value(item.clone())?]),
            Some(other) => Err(Error::rpc(format!(
                "'{}' is not a list of host overrides: {}",
                HOSTS_KEY,
                type_name(other)
            ))),
        }
    }

    /// Replace the host overrides, keeping the entry's position
    pub fn set_hosts(&mut self, hosts: &[HostRecord]) -> Result<()> {
        let hosts = hosts
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match self.contents.get_mut(HOSTS_KEY) {
            Some(slot) => *slot = Value::Array(hosts),
            None => {
                self.contents.insert(HOSTS_KEY.to_string(), Value::Array(hosts));
            }
        }
        Ok(())
    }

    /// Section contents as a value, ready to be persisted
    pub fn into_value(self) -> Value {
        Value::Object(self.contents)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "structure",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unbound() -> Value {
        json!({
            "enable": "",
            "dnssec": "",
            "hosts": [
                { "host": "nas", "domain": "home.lan", "ip": "10.0.0.5", "descr": "", "aliases": "" }
            ],
            "acls": [
                { "aclid": "0", "aclname": "lan", "aclaction": "allow",
                  "row": [{ "acl_network": "10.0.0.0", "mask": "24" }] }
            ],
            "port": "53"
        })
    }

    #[test]
    fn test_read_hosts() {
        let section = HostOverrideSection::from_value(unbound()).unwrap();
        let hosts = section.hosts().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].host, "nas");
    }

    #[test]
    fn test_missing_or_empty_hosts() {
        for value in [json!({}), json!({ "hosts": "" }), json!({ "hosts": null }), json!("")] {
            let section = HostOverrideSection::from_value(value).unwrap();
            assert!(section.hosts().unwrap().is_empty());
        }
    }

    #[test]
    fn test_single_host_structure() {
        let section = HostOverrideSection::from_value(json!({
            "hosts": { "host": "a", "domain": "x.com", "ip": "1.1.1.1", "descr": "" }
        }))
        .unwrap();
        assert_eq!(section.hosts().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_non_structures() {
        assert!(HostOverrideSection::from_value(json!([1, 2])).is_err());
        let section = HostOverrideSection::from_value(json!({ "hosts": 5 })).unwrap();
        assert!(section.hosts().is_err());
    }

    #[test]
    fn test_write_back_preserves_siblings_and_order() {
        let mut section = HostOverrideSection::from_value(unbound()).unwrap();
        let mut hosts = section.hosts().unwrap();
        hosts.push(HostRecord::new("a", "x.com", "1.1.1.1", ""));
        section.set_hosts(&hosts).unwrap();

        let value = section.into_value();
        let original = unbound();
        assert_eq!(value["acls"], original["acls"]);
        assert_eq!(value["port"], "53");
        assert_eq!(value["hosts"][0], original["hosts"][0]);
        assert_eq!(value["hosts"][1]["host"], "a");

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["enable", "dnssec", "hosts", "acls", "port"]);
    }

    #[test]
    fn test_write_back_adds_missing_hosts() {
        let mut section = HostOverrideSection::from_value(json!({ "enable": "" })).unwrap();
        section.set_hosts(&[HostRecord::new("", "x.com", "1.1.1.1", "")]).unwrap();
        assert_eq!(section.into_value()["hosts"][0]["domain"], "x.com");
    }
}
