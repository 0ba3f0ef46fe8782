use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::analysis::InterventionThresholds;

const CONFIG_ENV: &str = "PUNTOROJO_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "puntorojo.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 18.4675,
            center_lon: -69.9312,
            zoom: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: PathBuf,
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("puntorojo-report.html"),
            preview_rows: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub thresholds: InterventionThresholds,
    pub map: MapConfig,
    pub report: ReportConfig,
    pub http: HttpConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from the file named by `PUNTOROJO_CONFIG`, else `puntorojo.toml`.
    ///
    /// A file named explicitly must exist; a missing default file means the
    /// built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let (path, explicit) = match env::var(CONFIG_ENV) {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        let cfg = Self::from_toml_str(&contents)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.report.preview_rows == 0 {
            anyhow::bail!("report.preview_rows must be at least 1");
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.thresholds.loss_pct, 45.0);
        assert_eq!(cfg.thresholds.loss_kwh, 500.0);
        assert_eq!(cfg.thresholds.direct_customers, 50);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [thresholds]
            loss_pct = 30.0

            [map]
            zoom = 14

            [metrics]
            bind_addr = "0.0.0.0:9100"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.thresholds.loss_pct, 30.0);
        assert_eq!(cfg.thresholds.direct_customers, 50);
        assert_eq!(cfg.map.zoom, 14);
        assert_eq!(cfg.map.center_lat, 18.4675);
        assert_eq!(cfg.metrics.unwrap().bind_addr, "0.0.0.0:9100");
    }

    #[test]
    fn zero_preview_rows_is_rejected() {
        assert!(AppConfig::from_toml_str("[report]\npreview_rows = 0\n").is_err());
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(AppConfig::from_toml_str("[thresholds]\nloss_pct = \"high\"\n").is_err());
    }
}
