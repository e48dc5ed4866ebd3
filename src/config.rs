//! Configuration for the decoder dictionary extraction core

use crate::error::{ErrorExt, Result, TelemetryError};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on the number of complex data types visited while expanding
/// one complex message entry. A partial type map is still usable, so hitting
/// the bound truncates the traversal instead of failing the pass.
pub const MAX_COMPLEX_TYPES: usize = 1000;

/// Tunables of the extraction core
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Traversal budget per complex message entry
    #[serde(default = "default_max_complex_types")]
    pub max_complex_types: usize,
}

fn default_max_complex_types() -> usize {
    MAX_COMPLEX_TYPES
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_complex_types: MAX_COMPLEX_TYPES,
        }
    }
}

/// Load configuration from the default locations
///
/// Priority (highest to lowest):
/// 1. Environment variables prefixed with `TELEMSRV_`
/// 2. Local overrides (config/local.*)
/// 3. Default config files (config/default.*)
/// 4. Default values
pub fn load_config<T>() -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let figment = Figment::new()
        .merge(Toml::file("config/default.toml"))
        .merge(Yaml::file("config/default.yaml"))
        .merge(Json::file("config/default.json"))
        .merge(Toml::file("config/local.toml"))
        .merge(Yaml::file("config/local.yaml"))
        .merge(Json::file("config/local.json"))
        .merge(Env::prefixed("TELEMSRV_"));

    figment.extract().config_error("Failed to load configuration")
}

/// Load configuration from a specific file
pub fn load_config_from_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| TelemetryError::config("Config file must have an extension".to_string()))?;

    let figment = match extension {
        "toml" => Figment::new().merge(Toml::file(path)),
        "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
        "json" => Figment::new().merge(Json::file(path)),
        _ => {
            return Err(TelemetryError::config(format!(
                "Unsupported config file format: {}",
                extension
            )))
        }
    };

    figment
        .extract()
        .config_error("Failed to load configuration from file")
}
