use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One curated name equivalence. `from_name` and `to_name` are normalized
/// forms; applying an entry is a literal whole-string substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub from_name: String,
    pub to_name: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Versioned alias asset. Entries are append-only: new equivalences found by
/// the resolver are reviewed and added to the next artifact version, the file
/// is never rewritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasArtifact {
    pub version: u32,
    pub generated_at: String,
    pub entries: Vec<AliasEntry>,
}

/// Frozen substitution table used for the final deterministic match pass.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    by_from: HashMap<String, String>,
}

impl AliasMap {
    pub fn from_artifact(artifact: &AliasArtifact) -> Self {
        Self::from_entries(&artifact.entries)
    }

    pub fn from_entries(entries: &[AliasEntry]) -> Self {
        let mut by_from = HashMap::with_capacity(entries.len());
        for entry in entries {
            by_from.insert(entry.from_name.clone(), entry.to_name.clone());
        }
        Self { by_from }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve a normalized name through the table. Names without an entry
    /// come back unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.by_from.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_from.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_from.is_empty()
    }
}

/// Load the alias asset bundled with the binary.
pub fn load_bundled_alias_map() -> Result<AliasMap> {
    let raw = include_str!("../../assets/alias_map_v1.json");
    let artifact: AliasArtifact =
        serde_json::from_str(raw).context("parse bundled alias_map_v1 artifact")?;
    Ok(AliasMap::from_artifact(&artifact))
}
