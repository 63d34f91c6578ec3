//! Network bindings
//!
//! Resolves which network host name and port a server uses for a Swift
//! service, from the `consumes_SWF_*` declarations of the network file.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// =============================================================================
// Service Types
// =============================================================================

/// Swift service a ring is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwiftService {
    Account,
    Container,
    Object,
    /// Replication network
    Replication,
}

impl SwiftService {
    /// Service serving a ring
    pub fn for_ring(ring_name: &str) -> Self {
        match ring_name {
            "account" => SwiftService::Account,
            "container" => SwiftService::Container,
            _ => SwiftService::Object,
        }
    }

    /// Key of the service's binding in the network file
    pub fn binding_key(&self) -> &'static str {
        match self {
            SwiftService::Account => "consumes_SWF_ACC",
            SwiftService::Container => "consumes_SWF_CON",
            SwiftService::Object => "consumes_SWF_OBJ",
            SwiftService::Replication => "consumes_SWF_RPC",
        }
    }
}

impl fmt::Display for SwiftService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binding_key())
    }
}

// =============================================================================
// File Format
// =============================================================================

/// One consumer endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Member {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub use_tls: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Members {
    #[serde(default)]
    private: Vec<Member>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Binding {
    #[serde(default)]
    members: Members,
}

// =============================================================================
// Network Bindings
// =============================================================================

/// Resolved network endpoint of a server for one service
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub network_hostname: String,
    pub port: Option<u16>,
    pub use_tls: bool,
}

/// Service-to-members table
#[derive(Debug, Clone, Default)]
pub struct NetworkBindings {
    members: BTreeMap<SwiftService, Vec<Member>>,
}

impl NetworkBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service: SwiftService, member: Member) {
        self.members.entry(service).or_default().push(member);
    }

    /// Parse a network file; unrelated top-level keys are ignored
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let document: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
        let mut bindings = Self::new();
        for service in [
            SwiftService::Account,
            SwiftService::Container,
            SwiftService::Object,
            SwiftService::Replication,
        ] {
            if let Some(value) = document.get(service.binding_key()) {
                let binding: Binding = serde_yaml::from_value(value.clone())?;
                bindings.members.insert(service, binding.members.private);
            }
        }
        Ok(bindings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Endpoint of `hostname` for `service`, if the service is wired to it
    pub fn resolve(&self, service: SwiftService, hostname: &str) -> Option<Endpoint> {
        let prefix = format!("{}-", hostname);
        self.members
            .get(&service)?
            .iter()
            .find(|m| m.host == hostname || m.host.starts_with(&prefix))
            .map(|m| Endpoint {
                network_hostname: m.host.clone(),
                port: m.port,
                use_tls: m.use_tls,
            })
    }

    /// Endpoint of `hostname` for the service of `ring_name`
    pub fn resolve_ring(&self, ring_name: &str, hostname: &str) -> Option<Endpoint> {
        self.resolve(SwiftService::for_ring(ring_name), hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = r#"
consumes_SWF_ACC:
  members:
    private:
      - host: ccp-c1-m1-mgmt
        port: 6002
        use_tls: false
consumes_SWF_OBJ:
  members:
    private:
      - host: ccp-c1-m1-obj
        port: 6000
      - host: ccp-c1-m10-obj
        port: 6000
consumes_FND_MDB:
  vips: [1, 2, 3]
"#;

    #[test]
    fn test_resolve_by_ring() {
        let bindings = NetworkBindings::from_yaml_str(NETWORK).unwrap();

        let acc = bindings.resolve_ring("account", "ccp-c1-m1").unwrap();
        assert_eq!(acc.network_hostname, "ccp-c1-m1-mgmt");
        assert_eq!(acc.port, Some(6002));

        let obj = bindings.resolve_ring("object-0", "ccp-c1-m1").unwrap();
        assert_eq!(obj.network_hostname, "ccp-c1-m1-obj");
    }

    #[test]
    fn test_unwired_service_is_none() {
        let bindings = NetworkBindings::from_yaml_str(NETWORK).unwrap();
        assert!(bindings.resolve_ring("container", "ccp-c1-m1").is_none());
        assert!(bindings.resolve_ring("account", "ccp-c1-m2").is_none());
        assert!(bindings.resolve(SwiftService::Replication, "ccp-c1-m1").is_none());
    }

    #[test]
    fn test_prefix_does_not_match_longer_names() {
        let bindings = NetworkBindings::from_yaml_str(NETWORK).unwrap();
        let obj = bindings.resolve_ring("object-0", "ccp-c1-m10").unwrap();
        assert_eq!(obj.network_hostname, "ccp-c1-m10-obj");
    }
}
