//! Static host table
//!
//! Parses an `/etc/hosts`-style file (`<ip> <hostname> [aliases...]`) used to
//! turn network host names into addresses.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

/// Hostname to address table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostsTable {
    by_name: BTreeMap<String, String>,
}

impl HostsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse hosts-file content; comments and malformed lines are ignored
    pub fn parse(content: &str) -> Self {
        let mut table = Self::new();
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(ip), Some(first)) = (fields.next(), fields.next()) else {
                debug!("Ignoring malformed hosts line: {}", line);
                continue;
            };
            if ip.parse::<IpAddr>().is_err() {
                debug!("Ignoring hosts line with invalid address: {}", line);
                continue;
            }
            for name in std::iter::once(first).chain(fields) {
                table.by_name.entry(name.to_string()).or_insert_with(|| ip.to_string());
            }
        }
        table
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Ok(Self::parse(&content))
    }

    pub fn insert(&mut self, name: impl Into<String>, ip: impl Into<String>) {
        self.by_name.insert(name.into(), ip.into());
    }

    /// Address of a host name
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every name and address under which a server may be known
    ///
    /// Includes the server name, the given address, every name sharing that
    /// address and every network-suffixed name (`<server>-<net>`) with its
    /// address.
    pub fn aliases(&self, server_name: &str, ip: &str) -> Vec<String> {
        let mut aliases = BTreeSet::new();
        aliases.insert(server_name.to_string());
        aliases.insert(ip.to_string());

        let prefix = format!("{}-", server_name);
        for (name, addr) in &self.by_name {
            if addr == ip || name == server_name || name.starts_with(&prefix) {
                aliases.insert(name.clone());
                aliases.insert(addr.clone());
            }
        }
        aliases.into_iter().collect()
    }
}
