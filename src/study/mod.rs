//! Study file discovery and sub-study classification.

pub mod classify;
pub mod files;

pub use classify::{classify, classify_study, group_role, GroupRole, StudyLayout};
pub use files::{
    discover_metadata_files, Consent, FileGroups, FileType, MetadataFile, RecordFiles, RecordType,
};
