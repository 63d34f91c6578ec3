//! Builder Directory Reader
//!
//! Discovers `<builder_dir>/region-<region>/<ring>.builder` files and reads
//! each one through the ring builder's listing mode.

use super::listing::parse_listing;
use crate::domain::ports::{ActualState, ActualStateReader, RingBuilderToolRef};
use crate::error::{Error, Result};
use crate::model::RingKey;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of per-region builder directories
pub const REGION_DIR_PREFIX: &str = "region-";

/// Extension of builder files
pub const BUILDER_EXTENSION: &str = "builder";

/// Directory holding one region's builder files
pub fn region_dir(builder_dir: &Path, region_name: &str) -> PathBuf {
    builder_dir.join(format!("{}{}", REGION_DIR_PREFIX, region_name))
}

/// Builder file of one ring
pub fn builder_path(builder_dir: &Path, key: &RingKey) -> PathBuf {
    region_dir(builder_dir, &key.region_name).join(format!("{}.{}", key.ring_name, BUILDER_EXTENSION))
}

/// Ring key encoded in a builder file path, if it follows the layout
pub fn ring_key_of(path: &Path) -> Option<RingKey> {
    let ring_name = path.file_stem()?.to_str()?;
    let region_dir = path.parent()?.file_name()?.to_str()?;
    let region_name = region_dir.strip_prefix(REGION_DIR_PREFIX)?;
    if region_name.is_empty() || ring_name.is_empty() {
        return None;
    }
    Some(RingKey::new(region_name, ring_name))
}

/// Reads actual state from a builder directory
pub struct BuilderDirReader {
    builder_dir: PathBuf,
    tool: RingBuilderToolRef,
}

impl BuilderDirReader {
    pub fn new(builder_dir: impl Into<PathBuf>, tool: RingBuilderToolRef) -> Self {
        Self {
            builder_dir: builder_dir.into(),
            tool,
        }
    }

    /// Builder files in deterministic order
    pub fn builder_files(&self) -> Result<Vec<PathBuf>> {
        if !self.builder_dir.exists() {
            debug!("Builder directory {:?} does not exist yet", self.builder_dir);
            return Ok(Vec::new());
        }
        let pattern = self
            .builder_dir
            .join(format!("{}*", REGION_DIR_PREFIX))
            .join(format!("*.{}", BUILDER_EXTENSION));
        let mut files = Vec::new();
        for entry in glob::glob(&pattern.to_string_lossy())? {
            files.push(entry.map_err(|e| Error::Io(e.into()))?);
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl ActualStateReader for BuilderDirReader {
    async fn read(&self) -> Result<ActualState> {
        let mut state = ActualState::default();

        for path in self.builder_files()? {
            let Some(key) = ring_key_of(&path) else {
                debug!("Ignoring {:?}: not a region builder file", path);
                continue;
            };
            let builder = path.display().to_string();

            let output = self.tool.run(&path, &[]).await?;
            if output.exit_code != 0 {
                return Err(Error::RingBuilderExit {
                    builder,
                    command: "list".into(),
                    code: output.exit_code,
                });
            }

            let listing = parse_listing(&builder, &key.region_name, &key.ring_name, &output.stdout)?;
            info!(
                "Read {} with {} devices (balance {:.2})",
                key,
                listing.devices.len(),
                listing.ring.balance.unwrap_or_default()
            );
            state.devices.extend(listing.devices);
            state.rings.insert(key, listing.ring);
        }

        Ok(state)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::ScriptedTool;
    use super::*;
    use crate::actual::listing::fixtures::listing;
    use crate::domain::ports::ToolOutput;
    use crate::model::device::fixtures::device;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let key = RingKey::new("region1", "object-0");
        let path = builder_path(Path::new("/etc/swiftlm/builder_dir"), &key);
        assert_eq!(path, PathBuf::from("/etc/swiftlm/builder_dir/region-region1/object-0.builder"));
        assert_eq!(ring_key_of(&path), Some(key));
        assert_eq!(ring_key_of(Path::new("/tmp/object.builder")), None);
    }

    #[tokio::test]
    async fn test_read_builder_dir() {
        let tmp = TempDir::new().unwrap();
        let key = RingKey::new("region1", "object-0");
        let path = builder_path(tmp.path(), &key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        let mut d = device("region1", "object-0", "10.0.0.1", "disk0");
        d.region_id = 1;
        d.zone_id = 1;
        d.weight = 20.0;

        let mut tool = ScriptedTool::default();
        tool.listings.insert(path.clone(), ToolOutput::success(listing(1024, 3.0, &[d.clone()])));
        let tool = Arc::new(tool);

        let reader = BuilderDirReader::new(tmp.path(), tool.clone());
        let state = reader.read().await.unwrap();
        assert_eq!(state.rings.len(), 1);
        assert_eq!(state.ring(&key).unwrap().partition_power, 10);
        assert_eq!(state.devices.len(), 1);
        assert!(state.devices[0].same_as(&d));
        assert_eq!(tool.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = builder_path(tmp.path(), &RingKey::new("region1", "account"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        let reader = BuilderDirReader::new(tmp.path(), Arc::new(ScriptedTool::default()));
        assert_matches!(reader.read().await, Err(Error::RingBuilderExit { code: 2, .. }));
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty_state() {
        let reader = BuilderDirReader::new("/nonexistent/builder_dir", Arc::new(ScriptedTool::default()));
        let state = reader.read().await.unwrap();
        assert!(state.rings.is_empty());
        assert!(state.devices.is_empty());
    }
}
