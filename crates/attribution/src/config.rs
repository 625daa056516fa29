//! Deployment configuration shared by both beacons.

use serde::Deserialize;

use crate::cookie::COOKIE_LIFETIME_MS;
use crate::error::BeaconError;

pub const DEFAULT_PAGE_ID: &str = "phv1yfjl0dx8";
pub const DEFAULT_REPORT_ENDPOINT: &str = "https://jass-net.com/track.php";
pub const DEFAULT_RESOLUTION_ENDPOINT: &str = "https://jass-net.com/direct.php";
pub const DEFAULT_CONFIRMATION_PATH: &str = "./lptag.php";
/// Upper bound for `cookie_lifetime_ms`: one hundred years.
pub const MAX_COOKIE_LIFETIME_MS: i64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// Auxiliary click-id parameters forwarded to the resolution endpoint, in order.
pub const FORWARDED_CLICK_KEYS: [&str; 6] = ["gclid", "fbclid", "yclid", "ttclid", "ldtag_cl", "msi"];

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeaconConfig {
    /// Deployment identifier namespacing every storage key.
    pub page_id: String,
    /// Landing-URL key carrying the page identifier.
    pub page_key: String,
    /// Landing-URL key whose presence triggers resolution.
    pub impression_key: String,
    pub report_endpoint: String,
    pub resolution_endpoint: String,
    /// Same-origin path of the confirmation endpoint, relative to the landing page.
    pub confirmation_path: String,
    pub cookie_lifetime_ms: i64,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            page_id: DEFAULT_PAGE_ID.to_owned(),
            page_key: "p".to_owned(),
            impression_key: "im".to_owned(),
            report_endpoint: DEFAULT_REPORT_ENDPOINT.to_owned(),
            resolution_endpoint: DEFAULT_RESOLUTION_ENDPOINT.to_owned(),
            confirmation_path: DEFAULT_CONFIRMATION_PATH.to_owned(),
            cookie_lifetime_ms: COOKIE_LIFETIME_MS,
        }
    }
}

impl BeaconConfig {
    /// Parse a TOML document; missing fields keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, BeaconError> {
        let config: Self = toml::from_str(source).map_err(|error| BeaconError::Config(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BeaconError> {
        let required = [
            ("page_id", &self.page_id),
            ("page_key", &self.page_key),
            ("impression_key", &self.impression_key),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(BeaconError::Config(format!("`{field}` must not be empty")));
            }
        }
        if self.cookie_lifetime_ms <= 0 {
            return Err(BeaconError::Config("`cookie_lifetime_ms` must be positive".to_owned()));
        }
        if self.cookie_lifetime_ms > MAX_COOKIE_LIFETIME_MS {
            return Err(BeaconError::Config(format!(
                "`cookie_lifetime_ms` must not exceed {MAX_COOKIE_LIFETIME_MS}"
            )));
        }
        Ok(())
    }
}
