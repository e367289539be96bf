//! Node in the output graph.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::{NodeKind, PropertyMap, Value, DEFAULT_CONTEXT_PREFIX};
use crate::Result;

/// URI schemes whose values are stable enough to serve as node identity.
const IDENTITY_SCHEMES: [&str; 5] = ["http://", "https://", "s3://", "gs://", "ftp://"];

static NEXT_BLANK_ID: AtomicU64 = AtomicU64::new(1);

/// Node identity, serialized as `@id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a process-unique blank node identifier (`_:b<N>`).
    pub fn mint() -> Self {
        let n = NEXT_BLANK_ID.fetch_add(1, Ordering::Relaxed);
        Self(format!("_:b{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.starts_with("_:")
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal pointer to a node: identity only. Used to link without re-embedding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: NodeId,
}

/// True for strings with a scheme from [`IDENTITY_SCHEMES`].
pub fn is_identity_uri(s: &str) -> bool {
    IDENTITY_SCHEMES.iter().any(|scheme| {
        s.len() > scheme.len()
            && s.get(..scheme.len()).is_some_and(|p| p.eq_ignore_ascii_case(scheme))
    })
}

/// A typed node in the output graph.
///
/// The identity is fixed at creation; there is no setter for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    context: Option<String>,
    properties: PropertyMap,
}

impl Node {
    /// Create a node using the default DATS context prefix.
    pub fn create(kind: NodeKind, properties: PropertyMap, explicit_id: Option<NodeId>) -> Self {
        Self::create_in(DEFAULT_CONTEXT_PREFIX, kind, properties, explicit_id)
    }

    /// Create a node whose `@context` (if its kind has one) uses `context_prefix`.
    ///
    /// Identity: `explicit_id`, else the first absolute URI carried by an
    /// identifier-like property, else a freshly minted blank id.
    pub fn create_in(
        context_prefix: &str,
        kind: NodeKind,
        properties: PropertyMap,
        explicit_id: Option<NodeId>,
    ) -> Self {
        let id = explicit_id
            .or_else(|| uri_identity(kind, &properties))
            .unwrap_or_else(NodeId::mint);
        Self {
            id,
            kind,
            context: kind.context_uri(context_prefix),
            properties,
        }
    }

    /// Create a node from a kind name, failing on names outside the registry.
    pub fn create_named(kind: &str, properties: PropertyMap, explicit_id: Option<NodeId>) -> Result<Self> {
        let kind = NodeKind::from_name(kind)?;
        Ok(Self::create(kind, properties, explicit_id))
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key, value);
    }

    pub fn reference(&self) -> NodeRef {
        NodeRef { id: self.id.clone() }
    }
}

/// Adopt an externally issued URI as identity.
///
/// Properties are scanned in key order and the first identifier-like value
/// carrying a URI wins. Identifier-like: the `identifier` string itself, or an
/// Identifier-shaped map/node under any key whose own `identifier` is a
/// string. Identifier nodes never adopt their own value, otherwise they would
/// share `@id` with the entity they identify.
fn uri_identity(kind: NodeKind, properties: &PropertyMap) -> Option<NodeId> {
    properties.iter().find_map(|(key, value)| {
        let uri = match value {
            Value::String(s) if key == "identifier" && kind != NodeKind::Identifier => s.as_str(),
            Value::Map(m) => m.get("identifier")?.as_str()?,
            Value::Node(n) if is_identifier_kind(n.kind()) => n.get("identifier")?.as_str()?,
            _ => return None,
        };
        is_identity_uri(uri).then(|| NodeId::new(uri))
    })
}

fn is_identifier_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Identifier | NodeKind::AlternateIdentifier | NodeKind::RelatedIdentifier
    )
}
