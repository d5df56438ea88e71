//! Remote asset catalog model.
//!
//! The manifest document is a JSON array of `{"path": …, "hash": …}` objects.
//! Parsing is all-or-nothing: a document with a missing field, a duplicate
//! path or a digest of the wrong shape is rejected as a whole.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::DigestAlgorithm;

/// One asset declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AssetDescriptor {
    /// Origin-relative path, unique within a manifest.
    pub path: String,
    /// Hex-encoded content digest.
    #[serde(rename = "hash")]
    pub digest: String,
}

/// A parsed, validated manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    assets: Vec<AssetDescriptor>,
    index: HashMap<String, usize>,
    version: String,
}

impl Manifest {
    /// Build a manifest from descriptors, validating every entry.
    pub fn new(assets: Vec<AssetDescriptor>, algorithm: DigestAlgorithm) -> Result<Self, Error> {
        let mut index = HashMap::with_capacity(assets.len());

        for (i, asset) in assets.iter().enumerate() {
            if asset.path.is_empty() {
                return Err(Error::InvalidInput(format!("entry {i}: empty path")));
            }
            if asset.path.starts_with('/') {
                return Err(Error::InvalidInput(format!("entry {i}: path must be origin-relative: {}", asset.path)));
            }
            if !algorithm.is_well_formed(&asset.digest) {
                return Err(Error::InvalidInput(format!(
                    "entry {i}: malformed {algorithm:?} digest for {}: {:?}",
                    asset.path, asset.digest
                )));
            }
            if index.insert(asset.path.clone(), i).is_some() {
                return Err(Error::InvalidInput(format!("duplicate path: {}", asset.path)));
            }
        }

        let canonical = serde_json::to_vec(&assets)?;
        let version = algorithm.digest(&canonical);

        Ok(Self { assets, index, version })
    }

    /// Parse and validate a manifest document.
    pub fn from_json(bytes: &[u8], algorithm: DigestAlgorithm) -> Result<Self, Error> {
        let assets: Vec<AssetDescriptor> = serde_json::from_slice(bytes)?;
        Self::new(assets, algorithm)
    }

    /// Canonical compact serialization; the input to [`Manifest::version`].
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.assets)?)
    }

    /// Deterministic version identity of this manifest's content.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    pub fn get(&self, path: &str) -> Option<&AssetDescriptor> {
        self.index.get(path).map(|&i| &self.assets[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
