//! Endpoint <-> HostRecord mapping

use super::{Endpoint, HostRecord, PLACEHOLDER_IP, RecordType, join, metadata, split};
use crate::error::{Error, Result};

/// Convert a desired-state endpoint into a host override
///
/// # Errors
///
/// - [`Error::UnsupportedRecordType`] for anything other than `A` and `TXT`
/// - [`Error::NameFormat`] when the name cannot be split
/// - [`Error::TargetCount`] for an `A` record without exactly one target
pub fn to_host_record(endpoint: &Endpoint) -> Result<HostRecord> {
    let record_type: RecordType = endpoint.record_type.parse()?;
    let (host, domain) = split(&endpoint.name)?;

    let ip = match record_type {
        RecordType::A => match endpoint.targets.as_slice() {
            [target] => target.clone(),
            targets => {
                return Err(Error::target_count(
                    &endpoint.name,
                    record_type.as_str(),
                    targets.len(),
                ));
            }
        },
        RecordType::Txt => PLACEHOLDER_IP.to_string(),
    };

    Ok(HostRecord::new(host, domain, ip, metadata::encode(endpoint)))
}

/// Convert a host override into an endpoint
///
/// Never fails: entries created by hand or by other tools map to a plain `A`
/// record pointing at their address.
pub fn to_endpoint(record: &HostRecord) -> Endpoint {
    // Hand-authored pairs such as ("router", "lan") are named by their key
    let name = join(&record.host, &record.domain).unwrap_or_else(|_| record.key().to_string());

    match metadata::decode(&record.description, &record.ip) {
        Some(decoded) => Endpoint {
            name,
            record_type: decoded.record_type.as_str().to_string(),
            targets: decoded.targets,
            labels: decoded.labels,
        },
        None => Endpoint::new(name, RecordType::A.as_str(), [record.ip.clone()]),
    }
}
