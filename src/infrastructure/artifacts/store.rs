use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::domain::errors::ArtifactError;
use crate::domain::models::{ArtifactRecord, FactoryRecord};

/// Aggregate factory list shared by every network
pub const FACTORIES_FILE: &str = "deployed_factories.json";

/// JSON files of deployed contracts, one per network plus the factory list
///
/// Each network writes only its own file, so concurrent network pipelines
/// never touch the same path. Files are replaced atomically (write to a
/// temporary sibling, then rename).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<chain_name>-deployed_contracts.json`
    pub fn network_path(&self, chain_name: &str) -> PathBuf {
        self.dir.join(format!("{chain_name}-deployed_contracts.json"))
    }

    pub fn factories_path(&self) -> PathBuf {
        self.dir.join(FACTORIES_FILE)
    }

    /// Replace the record list of one network
    pub async fn save_network(
        &self,
        chain_name: &str,
        records: &[ArtifactRecord],
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.network_path(chain_name);
        self.write_json(&path, records).await?;
        info!(network = chain_name, records = records.len(), path = %path.display(), "Saved deployed contracts");
        Ok(path)
    }

    /// Records of one network; empty when nothing was deployed yet
    pub async fn load_network(&self, chain_name: &str) -> Result<Vec<ArtifactRecord>, ArtifactError> {
        Ok(self
            .read_json(&self.network_path(chain_name))
            .await?
            .unwrap_or_default())
    }

    /// Merge `factories` into the aggregate file
    ///
    /// Entries of networks not in `factories` are kept, so a single-network
    /// run does not forget the factories of the others.
    pub async fn save_factories(&self, factories: &[FactoryRecord]) -> Result<PathBuf, ArtifactError> {
        let path = self.factories_path();
        let mut merged = self.load_factories().await?;
        for factory in factories {
            match merged.iter_mut().find(|f| f.chain_name == factory.chain_name) {
                Some(existing) => *existing = factory.clone(),
                None => merged.push(factory.clone()),
            }
        }
        self.write_json(&path, &merged).await?;
        info!(factories = merged.len(), path = %path.display(), "Saved deployed factories");
        Ok(path)
    }

    pub async fn load_factories(&self) -> Result<Vec<FactoryRecord>, ArtifactError> {
        Ok(self.read_json(&self.factories_path()).await?.unwrap_or_default())
    }

    /// Factory of `chain_name`: the network's own records first, then the aggregate file
    pub async fn factory(&self, chain_name: &str) -> Result<Option<FactoryRecord>, ArtifactError> {
        let records = self.load_network(chain_name).await?;
        if let Some(factory) = FactoryRecord::from_records(chain_name, &records) {
            return Ok(Some(factory));
        }
        Ok(self
            .load_factories()
            .await?
            .into_iter()
            .find(|f| f.chain_name == chain_name))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, ArtifactError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Artifact file does not exist yet");
                return Ok(None);
            }
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ArtifactError::Format {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), ArtifactError> {
        let io_error = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.dir).await.map_err(io_error)?;

        let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(io_error)?;
        fs::rename(&tmp, path).await.map_err(io_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, code_id: u64) -> ArtifactRecord {
        ArtifactRecord {
            name: name.to_string(),
            code_id,
            address: format!("juno1{name}"),
        }
    }

    #[tokio::test]
    async fn test_network_records_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let records = vec![record("factory", 1), record("manager", 2)];

        let path = store.save_network("junotestnet", &records).await.unwrap();
        assert!(path.ends_with("junotestnet-deployed_contracts.json"));
        assert_eq!(store.load_network("junotestnet").await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_file_layout_is_plain_triples() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .save_network("junotestnet", &[record("factory", 7)])
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.network_path("junotestnet")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"name": "factory", "code_id": 7, "address": "juno1factory"}])
        );
    }

    #[tokio::test]
    async fn test_missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("not-created"));
        assert!(store.load_network("junotestnet").await.unwrap().is_empty());
        assert!(store.load_factories().await.unwrap().is_empty());
        assert!(store.factory("junotestnet").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(store.network_path("junotestnet"), "{not json").unwrap();

        assert!(matches!(
            store.load_network("junotestnet").await,
            Err(ArtifactError::Format { .. })
        ));
    }

    #[tokio::test]
    async fn test_factories_are_merged_by_chain() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let juno = FactoryRecord {
            chain_name: "junotestnet".to_string(),
            code_id: 1,
            address: "juno1factory".to_string(),
        };
        let stars = FactoryRecord {
            chain_name: "stargazetestnet".to_string(),
            code_id: 4,
            address: "stars1factory".to_string(),
        };
        store.save_factories(&[juno, stars.clone()]).await.unwrap();

        let juno_again = FactoryRecord {
            chain_name: "junotestnet".to_string(),
            code_id: 9,
            address: "juno1newfactory".to_string(),
        };
        store.save_factories(&[juno_again.clone()]).await.unwrap();

        let factories = store.load_factories().await.unwrap();
        assert_eq!(factories, vec![juno_again.clone(), stars]);
        assert_eq!(store.factory("junotestnet").await.unwrap(), Some(juno_again));
    }
}
