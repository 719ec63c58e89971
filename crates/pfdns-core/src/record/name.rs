//! Record name <-> (host, domain) conversion
//!
//! The remote schema stores a host override as a single host label plus a
//! domain suffix. A name is read as:
//!
//! ```text
//! example.com        -> host ""     domain "example.com"
//! www.example.com    -> host "www"  domain "example.com"
//! a.b.example.com    -> rejected (more than one sub-label)
//! example            -> rejected (no domain suffix)
//! ```
//!
//! The domain suffix is therefore always the two right-most labels of a name,
//! which makes [`split`] and [`join`] exact inverses over valid inputs.

use crate::error::{Error, Result};

/// Split a record name into `(host, domain)`
///
/// # Errors
///
/// [`Error::NameFormat`] when the name is empty, has empty labels, has no
/// domain suffix, or has more than one label in front of the suffix.
pub fn split(name: &str) -> Result<(String, String)> {
    if name.is_empty() {
        return Err(Error::name_format("record name is empty"));
    }

    let labels: Vec<&str> = name.split('.').collect();
    if labels.iter().any(|label| label.is_empty()) {
        return Err(Error::name_format(format!("{name}: empty label")));
    }

    match labels.len() {
        1 => Err(Error::name_format(format!(
            "{name}: no domain suffix, expected [<host>.]<domain>.<tld>"
        ))),
        2 => Ok((String::new(), name.to_string())),
        3 => {
            let (host, domain) = name
                .split_once('.')
                .ok_or_else(|| Error::name_format(format!("{name}: no domain suffix")))?;
            Ok((host.to_string(), domain.to_string()))
        }
        _ => Err(Error::name_format(format!(
            "{name}: only one label is allowed in front of the domain, got {:?}",
            &labels[..labels.len() - 2]
        ))),
    }
}

/// Join `(host, domain)` back into a record name
///
/// Accepts exactly the pairs [`split`] produces, so `split(join(h, d))`
/// is `(h, d)` whenever `join` succeeds.
///
/// # Errors
///
/// [`Error::NameFormat`] when `host` spans more than one label or `domain`
/// is not made of two non-empty labels.
pub fn join(host: &str, domain: &str) -> Result<String> {
    if host.contains('.') {
        return Err(Error::name_format(format!(
            "host can have only one label, got {:?}",
            host.split('.').collect::<Vec<_>>()
        )));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() != 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(Error::name_format(format!(
            "host {host:?}: domain {domain:?} must be <domain>.<tld>"
        )));
    }

    if host.is_empty() {
        Ok(domain.to_string())
    } else {
        Ok(format!("{host}.{domain}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_and_domain() {
        assert_eq!(
            split("www.example.com").unwrap(),
            ("www".to_string(), "example.com".to_string())
        );
    }

    #[test]
    fn test_split_bare_domain() {
        assert_eq!(
            split("example.com").unwrap(),
            (String::new(), "example.com".to_string())
        );
    }

    #[test]
    fn test_split_rejects_bad_names() {
        for name in [
            "",
            "example",
            "a.b.example.com",
            ".example.com",
            "www.example.com.",
            "www..com",
        ] {
            let err = split(name).unwrap_err();
            assert!(
                matches!(err, Error::NameFormat(_)),
                "{name:?} should be a name format error, got {err:?}"
            );
        }
    }

    #[test]
    fn test_join() {
        assert_eq!(join("www", "example.com").unwrap(), "www.example.com");
        assert_eq!(join("", "example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_join_rejects_dotted_host() {
        assert!(matches!(join("a.b", "example.com"), Err(Error::NameFormat(_))));
        assert!(matches!(join("a", ""), Err(Error::NameFormat(_))));
    }

    #[test]
    fn test_join_rejects_domains_split_cannot_produce() {
        for (host, domain) in [
            ("router", "lan"),
            ("", "lan"),
            ("www", "sub.example.com"),
            ("", "sub.example.com"),
            ("www", "example..com"),
            ("www", ".com"),
        ] {
            let err = join(host, domain).unwrap_err();
            assert!(
                matches!(err, Error::NameFormat(_)),
                "({host:?}, {domain:?}) should be a name format error, got {err:?}"
            );
        }
    }

    #[test]
    fn test_join_output_always_splits_back() {
        let hosts = ["", "www", "a-1", "router", "a.b"];
        let domains = ["", "lan", "example.com", "x.io", "sub.example.com", "a..b", "example.com."];

        for host in hosts {
            for domain in domains {
                if let Ok(name) = join(host, domain) {
                    assert_eq!(
                        split(&name).unwrap(),
                        (host.to_string(), domain.to_string()),
                        "join({host:?}, {domain:?}) = {name:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_join_split_inverse() {
        for name in ["example.com", "www.example.com", "a-1.x.io", "x.com"] {
            let (host, domain) = split(name).unwrap();
            assert_eq!(join(&host, &domain).unwrap(), name);
        }
    }

    #[test]
    fn test_split_join_inverse() {
        for (host, domain) in [("", "example.com"), ("www", "example.com"), ("b", "x.com")] {
            let name = join(host, domain).unwrap();
            assert_eq!(split(&name).unwrap(), (host.to_string(), domain.to_string()));
        }
    }
}
