use super::AppConfig;
use crate::core::rag::NewStyleRecord;
use crate::errors::Error;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

/// Loads and parses the application configuration from a YAML file
pub fn load_app_config(file_path: &str) -> Result<AppConfig, Error> {
    let yaml_str = fs::read_to_string(file_path)?;
    let config: AppConfig = serde_yaml::from_str(&yaml_str)?;
    validate_config(&config)?;
    info!("Loaded configuration from {}", file_path);
    Ok(config)
}

/// Rejects numeric settings outside the range their consumers accept
pub fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let unit_fields = [
        ("critic.pass_threshold", config.critic.pass_threshold),
        ("retrieval.min_similarity", config.retrieval.min_similarity),
    ];
    for (name, value) in unit_fields {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::Config(format!(
                "{} must be within [0, 1], got {}",
                name, value
            )));
        }
    }
    if !(config.critic.jitter.is_finite() && config.critic.jitter >= 0.0) {
        return Err(Error::Config(format!(
            "critic.jitter must be a non-negative number, got {}",
            config.critic.jitter
        )));
    }
    if !(config.retrieval.distance_scale.is_finite() && config.retrieval.distance_scale > 0.0) {
        return Err(Error::Config(format!(
            "retrieval.distance_scale must be positive, got {}",
            config.retrieval.distance_scale
        )));
    }
    Ok(())
}

/// Uses the explicit path, else `<config_dir>/promptsmith/config.yaml` when it exists,
/// else the built-in defaults
pub fn resolve_config(explicit: Option<&str>) -> Result<AppConfig, Error> {
    if let Some(path) = explicit {
        return load_app_config(path);
    }
    let default_path: Option<PathBuf> =
        dirs::config_dir().map(|dir| dir.join("promptsmith").join("config.yaml"));
    match default_path {
        Some(path) if path.exists() => load_app_config(&path.to_string_lossy()),
        _ => {
            debug!("No configuration file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Loads extra style records; they are never system protected
pub fn load_style_catalog(file_path: &str) -> Result<Vec<NewStyleRecord>, Error> {
    let yaml_str = fs::read_to_string(file_path)?;
    let mut records: Vec<NewStyleRecord> = serde_yaml::from_str(&yaml_str)?;
    for record in records.iter_mut() {
        record.is_system_protected = false;
    }
    info!("Loaded {} styles from {}", records.len(), file_path);
    Ok(records)
}
