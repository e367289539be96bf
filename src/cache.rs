//! Identity cache — encodes a DAG inside tree-shaped output.
//!
//! JSON documents have no cross-reference syntax, so an entity shared by
//! several parents (an organization, a subject referenced by many samples)
//! is embedded in full the first time it is emitted and referenced by `@id`
//! every time after that.
//!
//! ```text
//! get_or_create("Material:S1", build)   → Value::Node(full body)
//! get_or_create("Material:S1", build)   → Value::Ref({"@id": …}), build not run
//! ```
//!
//! One cache belongs to one conversion session. It is passed by `&mut`
//! into every builder and dropped when the session's document is done.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeKind, Value};
use crate::Result;

/// How repeated keys are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// First occurrence in full, later occurrences as references.
    #[default]
    Reference,
    /// Debug only: every occurrence is a full body. Output can grow
    /// without bound on shared entities.
    EmbedAlways,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub created: usize,
    pub referenced: usize,
}

/// Memoizes node creation by caller-supplied key.
#[derive(Debug, Default)]
pub struct IdentityCache {
    nodes: HashMap<String, Node>,
    mode: CacheMode,
    stats: CacheStats,
}

/// Build a cache key of the form `Kind:part:part`.
pub fn cache_key<I, S>(kind: NodeKind, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = kind.name().to_string();
    for part in parts {
        key.push(':');
        key.push_str(part.as_ref());
    }
    key
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: CacheMode) -> Self {
        Self { mode, ..Self::default() }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Return the full node on first sight of `key`, a reference afterwards.
    ///
    /// `builder` runs only for a key not seen before in this session. If it
    /// fails, nothing is stored.
    pub fn get_or_create<F>(&mut self, key: &str, builder: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Node>,
    {
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        let node = builder()?;
        self.stats.created += 1;
        self.nodes.insert(key.to_string(), node.clone());
        Ok(Value::Node(Box::new(node)))
    }

    /// The value a repeated `get_or_create(key, ..)` would return, without
    /// needing a builder. `None` for an unseen key.
    ///
    /// Builders whose inputs are themselves cached use this to skip that
    /// work for a key that is already known.
    pub fn lookup(&mut self, key: &str) -> Option<Value> {
        let existing = self.nodes.get(key)?;
        self.stats.referenced += 1;
        tracing::debug!(key, id = %existing.id(), "identity cache hit");
        Some(match self.mode {
            CacheMode::Reference => Value::Ref(existing.reference()),
            CacheMode::EmbedAlways => Value::Node(Box::new(existing.clone())),
        })
    }

    /// The node stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
