//! # dats-graph — dbGaP study metadata as a DATS linked-data graph
//!
//! Reads a dbGaP release (XML data dictionaries, XML variable reports and,
//! optionally, access-restricted tab-delimited subject/sample tables) and
//! emits one DATS JSON-LD document.
//!
//! ## Design Principles
//!
//! 1. **Closed kinds**: every node is one of a fixed set of DATS kinds
//! 2. **Stable identity**: a node's `@id` is fixed at creation, and a shared
//!    entity is embedded once and referenced by `@id` afterwards
//! 3. **Fail loudly**: malformed input and conflicting attribute values stop
//!    the run; only an unresolvable column name is tolerated
//! 4. **No globals**: all per-run state lives in a [`Session`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use dats_graph::{ConvertConfig, Session, export};
//!
//! # fn example() -> dats_graph::Result<()> {
//! let mut session = Session::new(ConvertConfig::load()?);
//! let root = session.convert_study(Path::new("release/public"), Some(Path::new("release/restricted")))?;
//! export::write_document(&root, &mut std::io::stdout())?;
//! session.finish();
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Discover + classify | `study` | one [`StudyLayout`] per study |
//! | Catalog | `catalog` | [`VariableCatalog`] per study |
//! | Read + merge tables | `table` | one [`AttributeTable`] per entity type |
//! | Resolve columns | `resolve` | column → [`VariableDefinition`] |
//! | Build entities | `build` | [`Node`] tree, shared nodes via [`IdentityCache`] |
//! | Export | `export` | JSON-LD |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod cache;
pub mod study;
pub mod catalog;
pub mod resolve;
pub mod table;
pub mod build;
pub mod session;
pub mod config;
pub mod export;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Node, NodeId, NodeKind, NodeRef, PropertyMap, Value};

// ============================================================================
// Re-exports: Pipeline
// ============================================================================

pub use cache::{cache_key, CacheMode, CacheStats, IdentityCache};
pub use catalog::{VariableCatalog, VariableDefinition, VariableType};
pub use config::ConvertConfig;
pub use resolve::VariableResolver;
pub use session::Session;
pub use study::{classify, discover_metadata_files, FileGroups, RecordType, StudyLayout};
pub use table::{merge, merge_tables, AttributeRow, AttributeTable, Cell};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed input {}: {message}", .path.display())]
    StructuralParse { path: std::path::PathBuf, message: String },

    #[error("XML error in {}: {message}", .path.display())]
    Xml { path: std::path::PathBuf, message: String },

    #[error("Duplicate {kind}: {key}")]
    DuplicateKey { kind: String, key: String },

    #[error("Study {study_id}: {message}")]
    StudyStructure { study_id: String, message: String },

    #[error("Unresolved {kind} reference: {key}")]
    UnresolvedReference { kind: String, key: String },

    #[error("Conflicting values for {row_id}.{column}: '{existing}' vs '{incoming}'")]
    PropertyConflict { row_id: String, column: String, existing: String, incoming: String },

    #[error("Unknown DATS kind: {0}")]
    UnknownKind(String),

    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
