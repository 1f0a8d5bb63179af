//! Build metadata of compiled contracts read from the artifacts directory.
//!
//! Wasm files are `<dir>/<prefix><contract>.wasm`, checksums come from the
//! optimizer's `checksums.txt` and versions from configuration.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::domain::errors::BuildInfoError;
use crate::domain::models::{ArtifactsConfig, ContractVersion, ContractsConfig};
use crate::domain::ports::{BuildSource, ModuleBuild};

/// Placeholder for provenance that could not be determined
pub const UNKNOWN: &str = "-";

/// `BuildSource` backed by the local artifacts directory
#[derive(Debug)]
pub struct ArtifactsBuildSource {
    artifacts: ArtifactsConfig,
    contracts: ContractsConfig,
    checksums: OnceCell<HashMap<String, String>>,
    commit_id: OnceCell<String>,
}

impl ArtifactsBuildSource {
    pub fn new(artifacts: ArtifactsConfig, contracts: ContractsConfig) -> Self {
        Self {
            artifacts,
            contracts,
            checksums: OnceCell::new(),
            commit_id: OnceCell::new(),
        }
    }

    pub fn wasm_path(&self, contract_name: &str) -> PathBuf {
        self.artifacts
            .dir
            .join(format!("{}{contract_name}.wasm", self.artifacts.wasm_prefix))
    }

    fn wasm_file_name(&self, contract_name: &str) -> String {
        format!("{}{contract_name}.wasm", self.artifacts.wasm_prefix)
    }

    async fn checksums(&self) -> Result<&HashMap<String, String>, BuildInfoError> {
        self.checksums
            .get_or_try_init(|| async {
                let path = self.artifacts.dir.join(&self.artifacts.checksum_file);
                match tokio::fs::read_to_string(&path).await {
                    Ok(content) => Ok(parse_checksums(&content)),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        warn!(path = %path.display(), "No checksum file, checksums are computed locally");
                        Ok(HashMap::new())
                    }
                    Err(source) => Err(BuildInfoError::Io { path, source }),
                }
            })
            .await
    }

    async fn commit_id(&self) -> &str {
        self.commit_id
            .get_or_init(|| async {
                match &self.contracts.commit_id {
                    Some(commit) if !commit.is_empty() => commit.clone(),
                    _ => git_head(&self.artifacts.dir).await.unwrap_or_else(|| UNKNOWN.to_string()),
                }
            })
            .await
    }
}

#[async_trait]
impl BuildSource for ArtifactsBuildSource {
    async fn module(&self, contract_name: &str) -> Result<ModuleBuild, BuildInfoError> {
        let version = self.version(contract_name)?;
        let path = self.wasm_path(contract_name);

        let wasm = match tokio::fs::read(&path).await {
            Ok(wasm) => wasm,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BuildInfoError::WasmNotFound(path));
            }
            Err(source) => return Err(BuildInfoError::Io { path, source }),
        };

        let checksum = match self.checksums().await?.get(&self.wasm_file_name(contract_name)) {
            Some(checksum) => checksum.clone(),
            None => hex::encode(Sha256::digest(&wasm)),
        };

        debug!(
            contract = contract_name,
            %version,
            bytes = wasm.len(),
            checksum = %checksum,
            "Loaded contract build"
        );

        Ok(ModuleBuild {
            contract_name: contract_name.to_string(),
            wasm,
            version,
            checksum,
            commit_id: self.commit_id().await.to_string(),
            changelog_url: self.contracts.changelog_url.clone(),
        })
    }

    fn version(&self, contract_name: &str) -> Result<ContractVersion, BuildInfoError> {
        let value = self
            .contracts
            .versions
            .get(contract_name)
            .unwrap_or(&self.contracts.default_version);
        value
            .parse()
            .map_err(|_| BuildInfoError::InvalidVersion {
                contract: contract_name.to_string(),
                value: value.clone(),
            })
    }
}

/// Parse `<sha256>  <file>` lines as written by the CosmWasm optimizer
///
/// Blank lines and lines without both fields are ignored. Keys are bare file
/// names, so `artifacts/x.wasm` and `x.wasm` match the same entry.
pub fn parse_checksums(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let checksum = fields.next()?;
            let file = fields.next()?;
            let file = file.trim_start_matches('*');
            let name = Path::new(file).file_name()?.to_str()?;
            Some((name.to_string(), checksum.to_lowercase()))
        })
        .collect()
}

async fn git_head(dir: &Path) -> Option<String> {
    let cwd = if dir.is_dir() { dir } else { Path::new(".") };
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(cwd)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!commit.is_empty()).then_some(commit)
}
