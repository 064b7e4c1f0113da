//! Plugin configuration
//!
//! Two sources: the parameters entered in the host's hardware page and an
//! optional `husqvarna.json` file in the plugin home folder holding the
//! garden zones and the cutting height range.

use automower_api::Credentials;
use mower_poller::PollerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::zones::Zone;
use crate::{PluginError, Result};

/// Name of the optional advanced configuration file
pub const ADVANCED_CONFIG_FILE: &str = "husqvarna.json";

/// Parameters entered in the host's hardware page
#[derive(Debug, Clone)]
pub struct PluginParameters {
    pub client_id: String,
    pub client_secret: String,
    /// Update interval in minutes, as typed by the user ("1", "2,5", "7.5")
    pub update_interval: String,
    pub debug: bool,
}

impl PluginParameters {
    /// The update interval in minutes, accepting a decimal comma
    pub fn interval_minutes(&self) -> Result<f64> {
        let raw = self.update_interval.trim().replace(',', ".");
        let minutes: f64 = raw.parse().map_err(|_| {
            PluginError::Config(format!("Invalid update interval '{}'", self.update_interval))
        })?;

        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(PluginError::Config(format!(
                "Update interval must be a positive number of minutes, got '{}'",
                self.update_interval
            )));
        }
        Ok(minutes)
    }

    pub fn credentials(&self) -> Result<Credentials> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(PluginError::Config(
                "Client id and client secret are required".to_string(),
            ));
        }
        Ok(Credentials::new(self.client_id.trim(), self.client_secret.trim()))
    }
}

/// Settings of the host installation used for defaults
#[derive(Debug, Clone, Default)]
pub struct HostSettings {
    /// Installation title, used as the default zone name
    pub title: String,
    /// Installation location as `"latitude;longitude"`
    pub location: Option<String>,
}

impl HostSettings {
    /// The single zone derived from the host location, if it parses
    pub fn default_zones(&self) -> Vec<Zone> {
        let Some(location) = self.location.as_deref() else {
            return Vec::new();
        };

        let mut parts = location.split(';').map(|p| p.trim().parse::<f64>());
        match (parts.next(), parts.next()) {
            (Some(Ok(latitude)), Some(Ok(longitude))) => {
                vec![Zone::new(self.title.clone(), latitude, longitude)]
            }
            _ => {
                tracing::debug!("Host location '{}' is not a valid 'lat;lon' pair", location);
                Vec::new()
            }
        }
    }
}

/// Cutting height range shown on the cutting height selector, in cm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightRange {
    pub min: f64,
    pub max: f64,
    pub steps: u32,
}

impl Default for HeightRange {
    fn default() -> Self {
        Self {
            min: 2.0,
            max: 6.0,
            steps: 9,
        }
    }
}

impl HeightRange {
    /// Selector level names: `steps` heights from `min` to `max`
    pub fn level_names(&self) -> Vec<String> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![format!("{:.1}", self.min)],
            steps => {
                let step = (self.max - self.min) / f64::from(steps - 1);
                (0..steps)
                    .map(|i| format!("{:.1}", self.min + f64::from(i) * step))
                    .collect()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.steps == 0 || self.steps > 9 {
            return Err(PluginError::Config(format!(
                "Cutting height steps must be between 1 and 9, got {}",
                self.steps
            )));
        }
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(PluginError::Config(format!(
                "Cutting height min ({}) is above max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Contents of `husqvarna.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<Zone>>,

    #[serde(rename = "height_min_max (cm)", default)]
    pub height: HeightRange,
}

impl AdvancedConfig {
    /// Parse the file contents
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.height.validate()?;
        Ok(config)
    }

    /// Load `husqvarna.json` from `home`
    ///
    /// A missing or invalid file falls back to the defaults: one zone at the
    /// host location and the default height range.
    pub fn load(home: &Path, host: &HostSettings) -> Self {
        let path = home.join(ADVANCED_CONFIG_FILE);

        let loaded = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::error!(
                        "Error parsing configuration file {}: {}; using default zones and cutting height",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} not found, using default zones and cutting height", path.display());
                None
            }
            Err(e) => {
                tracing::error!(
                    "Error reading {}: {}; using default zones and cutting height",
                    path.display(),
                    e
                );
                None
            }
        };

        let mut config = loaded.unwrap_or_else(|| Self {
            zones: None,
            height: HeightRange::default(),
        });
        if config.zones.is_none() {
            config.zones = Some(host.default_zones());
        }

        tracing::debug!("Zones: {:?}, cutting height range: {:?}", config.zones, config.height);
        config
    }

    pub fn zones(&self) -> &[Zone] {
        self.zones.as_deref().unwrap_or(&[])
    }
}

/// Everything the plugin needs to start
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Name of the hardware entry, prefixed to every device name
    pub hardware_name: String,
    pub credentials: Credentials,
    pub poller: PollerConfig,
    pub advanced: AdvancedConfig,
    pub debug: bool,
}

impl PluginConfig {
    pub fn from_host(
        hardware_name: impl Into<String>,
        params: &PluginParameters,
        host: &HostSettings,
        home: &Path,
    ) -> Result<Self> {
        let poller = PollerConfig::with_interval_minutes(params.interval_minutes()?);
        poller.validate()?;

        Ok(Self {
            hardware_name: hardware_name.into(),
            credentials: params.credentials()?,
            poller,
            advanced: AdvancedConfig::load(home, host),
            debug: params.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mower_poller::PollerError;

    fn params(interval: &str) -> PluginParameters {
        PluginParameters {
            client_id: "app-id".to_string(),
            client_secret: "app-secret".to_string(),
            update_interval: interval.to_string(),
            debug: false,
        }
    }

    #[test]
    fn test_interval_accepts_decimal_comma() {
        assert_eq!(params("2,5").interval_minutes().unwrap(), 2.5);
        assert_eq!(params(" 7.5 ").interval_minutes().unwrap(), 7.5);
        assert_eq!(params("10").interval_minutes().unwrap(), 10.0);
    }

    #[test]
    fn test_oversized_interval_fails_configuration() {
        let home = tempfile::tempdir().unwrap();
        for interval in ["1e300", "1e14", "1000"] {
            let result = PluginConfig::from_host("Husqvarna", &params(interval), &HostSettings::default(), home.path());
            assert!(
                matches!(result, Err(PluginError::Poller(PollerError::Configuration(_)))),
                "interval {} accepted",
                interval
            );
        }
        assert!(PluginConfig::from_host("Husqvarna", &params("720"), &HostSettings::default(), home.path()).is_ok());
    }

    #[test]
    fn test_interval_rejects_garbage() {
        assert!(params("soon").interval_minutes().is_err());
        assert!(params("0").interval_minutes().is_err());
        assert!(params("-3").interval_minutes().is_err());
    }

    #[test]
    fn test_credentials_required() {
        let mut p = params("5");
        p.client_secret = "  ".to_string();
        assert!(matches!(p.credentials(), Err(PluginError::Config(_))));
    }

    #[test]
    fn test_default_zone_from_host_location() {
        let host = HostSettings {
            title: "Home".to_string(),
            location: Some("50.8503;4.3517".to_string()),
        };
        assert_eq!(host.default_zones(), vec![Zone::new("Home", 50.8503, 4.3517)]);

        let host = HostSettings {
            title: "Home".to_string(),
            location: Some("somewhere".to_string()),
        };
        assert!(host.default_zones().is_empty());
        assert!(HostSettings::default().default_zones().is_empty());
    }

    #[test]
    fn test_height_level_names() {
        let names = HeightRange::default().level_names();
        assert_eq!(names, vec!["2.0", "2.5", "3.0", "3.5", "4.0", "4.5", "5.0", "5.5", "6.0"]);

        let single = HeightRange { min: 3.0, max: 3.0, steps: 1 };
        assert_eq!(single.level_names(), vec!["3.0"]);
    }

    #[test]
    fn test_parse_advanced_config() {
        let json = r#"{
            "zones": [
                { "name": "FrontGarden", "latitude": 50.8503, "longitude": 4.3517 },
                { "name": "BackGarden", "latitude": 50.8400, "longitude": 4.3400 }
            ],
            "height_min_max (cm)": { "min": 3, "max": 7, "steps": 5 }
        }"#;

        let config = AdvancedConfig::from_json(json).unwrap();
        assert_eq!(config.zones().len(), 2);
        assert_eq!(config.height, HeightRange { min: 3.0, max: 7.0, steps: 5 });
    }

    #[test]
    fn test_invalid_height_range_rejected() {
        let json = r#"{"height_min_max (cm)": { "min": 6, "max": 2, "steps": 9 }}"#;
        assert!(AdvancedConfig::from_json(json).is_err());

        let json = r#"{"height_min_max (cm)": { "min": 2, "max": 6, "steps": 0 }}"#;
        assert!(AdvancedConfig::from_json(json).is_err());
    }
}
