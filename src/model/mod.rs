//! # DATS Graph Model
//!
//! Clean DTOs for the linked-data output: typed nodes, their identities,
//! and property values. These types cross every boundary:
//! builders ↔ identity cache ↔ export.
//!
//! Design rule: no file I/O, no parsing, no per-run state here.
//! The only global is the blank-node counter in `node`.

pub mod kind;
pub mod node;
pub mod value;
pub mod property_map;

pub use kind::{KindInfo, NodeKind, DEFAULT_CONTEXT_PREFIX};
pub use node::{is_identity_uri, Node, NodeId, NodeRef};
pub use value::Value;
pub use property_map::PropertyMap;
