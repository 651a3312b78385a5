//! # BuildRun Port and Volume Mappings
//!
//! File: cli/src/common/docker/mappings.rs
//!
//! ## Overview
//!
//! Parses the user-facing mapping syntax into typed values that the Docker
//! client layer turns into `HostConfig` entries:
//!
//! - ports: `internal[/mode]:external`, e.g. `80/tcp:8080`, `53/udp:5353`, `9000:9000`
//! - volumes: `external:internal[:ro|:rw]`, e.g. `~/data:/data`, `cache:/var/cache:ro`
//!
//! Parsing happens before the daemon is contacted, so a typo never leaves a
//! half-reconciled set of containers behind.
//!
use crate::core::error::{BuildRunError, Result};
use anyhow::anyhow;

const PORT_MODES: [&str; 3] = ["tcp", "udp", "sctp"];

/// A container port published on a host port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Docker's `port/proto` key, e.g. `80/tcp`.
    pub container_port: String,
    pub host_port: String,
}

/// A host path (or named volume) bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMapping {
    pub host: String,
    pub container: String,
    pub read_only: bool,
}

impl VolumeMapping {
    /// The `host:container:mode` form accepted in `HostConfig.binds`.
    pub fn to_bind(&self) -> String {
        let mode = if self.read_only { "ro" } else { "rw" };
        format!("{}:{}:{}", self.host, self.container, mode)
    }
}

fn invalid(msg: String) -> anyhow::Error {
    anyhow!(BuildRunError::InvalidArgument(msg))
}

/// Parses `internal[/mode]:external`. The mode defaults to `tcp`.
pub fn parse_port(spec: &str) -> Result<PortMapping> {
    let (internal, external) = spec.split_once(':').ok_or_else(|| {
        invalid(format!(
            "port mapping '{}' must look like internal/mode:external",
            spec
        ))
    })?;
    let (port, mode) = match internal.split_once('/') {
        Some((port, mode)) => (port, mode.to_lowercase()),
        None => (internal, "tcp".to_string()),
    };
    if port.parse::<u16>().is_err() {
        return Err(invalid(format!(
            "port mapping '{}': '{}' is not a valid container port",
            spec, port
        )));
    }
    if !PORT_MODES.contains(&mode.as_str()) {
        return Err(invalid(format!(
            "port mapping '{}': mode must be one of {}",
            spec,
            PORT_MODES.join(", ")
        )));
    }
    if external.parse::<u16>().is_err() {
        return Err(invalid(format!(
            "port mapping '{}': '{}' is not a valid host port",
            spec, external
        )));
    }
    Ok(PortMapping {
        container_port: format!("{}/{}", port, mode),
        host_port: external.to_string(),
    })
}

/// Parses `external:internal[:ro|:rw]`, expanding `~` in the external part.
pub fn parse_volume(spec: &str) -> Result<VolumeMapping> {
    let parts: Vec<&str> = spec.split(':').collect();
    let (host, container, read_only) = match parts.as_slice() {
        [host, container] => (*host, *container, false),
        [host, container, "ro"] => (*host, *container, true),
        [host, container, "rw"] => (*host, *container, false),
        _ => {
            return Err(invalid(format!(
                "volume mapping '{}' must look like external:internal[:ro|:rw]",
                spec
            )))
        }
    };
    if host.is_empty() {
        return Err(invalid(format!(
            "volume mapping '{}' has an empty external path",
            spec
        )));
    }
    if !container.starts_with('/') {
        return Err(invalid(format!(
            "volume mapping '{}': internal path must be absolute",
            spec
        )));
    }
    Ok(VolumeMapping {
        host: shellexpand::tilde(host).into_owned(),
        container: container.to_string(),
        read_only,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(err: anyhow::Error) -> Option<u16> {
        err.downcast_ref::<BuildRunError>().map(BuildRunError::code)
    }

    #[test]
    fn test_parse_port_with_mode() {
        let p = parse_port("80/tcp:8080").unwrap();
        assert_eq!(p.container_port, "80/tcp");
        assert_eq!(p.host_port, "8080");

        let p = parse_port("53/UDP:5353").unwrap();
        assert_eq!(p.container_port, "53/udp");
    }

    #[test]
    fn test_parse_port_defaults_to_tcp() {
        let p = parse_port("9000:9001").unwrap();
        assert_eq!(p.container_port, "9000/tcp");
        assert_eq!(p.host_port, "9001");
    }

    #[test]
    fn test_parse_port_rejects_garbage() {
        for bad in ["8080", "http:80", "80/icmp:80", "80/tcp:", "80/tcp:99999"] {
            let err = parse_port(bad).unwrap_err();
            assert_eq!(code_of(err), Some(107), "'{}' should be rejected", bad);
        }
    }

    #[test]
    fn test_parse_volume() {
        let v = parse_volume("/srv/data:/data").unwrap();
        assert_eq!(v.to_bind(), "/srv/data:/data:rw");

        let v = parse_volume("cache:/var/cache:ro").unwrap();
        assert!(v.read_only);
        assert_eq!(v.to_bind(), "cache:/var/cache:ro");
    }

    #[test]
    fn test_parse_volume_expands_tilde() {
        let v = parse_volume("~/code:/code").unwrap();
        assert!(!v.host.starts_with('~'));
        assert!(v.host.ends_with("code"));
    }

    #[test]
    fn test_parse_volume_rejects_garbage() {
        for bad in ["/only-one", ":/data", "/a:relative", "/a:/b:rx", "/a:/b:ro:x"] {
            let err = parse_volume(bad).unwrap_err();
            assert_eq!(code_of(err), Some(107), "'{}' should be rejected", bad);
        }
    }
}
