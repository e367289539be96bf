//! Conversion settings.
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `DATS_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `DATS_CACHE__MODE=embed_always`).

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheMode;
use crate::model::DEFAULT_CONTEXT_PREFIX;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub mode: CacheMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Base URL that kind context files are resolved against.
    pub context_uri_prefix: String,
    pub cache: CacheConfig,
    /// `identifierSource` written on every dbGaP identifier.
    pub identifier_source: String,
    pub subject_id_column: String,
    pub sample_id_column: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            context_uri_prefix: DEFAULT_CONTEXT_PREFIX.to_string(),
            cache: CacheConfig::default(),
            identifier_source: "dbGaP".to_string(),
            subject_id_column: "dbGaP_Subject_ID".to_string(),
            sample_id_column: "dbGaP_Sample_ID".to_string(),
        }
    }
}

impl ConvertConfig {
    /// Defaults overridden by `DATS_*` environment variables.
    pub fn load() -> Result<Self> {
        Ok(Self::figment(None).extract()?)
    }

    /// Defaults, then `path`, then the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::figment(Some(path)).extract()?)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("DATS_").split("__"))
    }
}
