use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::types::OptionValue;

/// Curebit integration options. Loaded from host overrides, an optional
/// settings file and environment variables with the prefix `CUREBIT__`.
///
/// Host overrides use the dispatcher's camelCase option names (`siteId`,
/// `iframeWidth`, ...); file and environment sources use snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, alias = "siteId")]
    pub site_id: String,
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default, alias = "iframeBorder")]
    pub iframe_border: i64,
    #[serde(default = "default_dimension", alias = "iframeHeight")]
    pub iframe_height: OptionValue,
    #[serde(default = "default_dimension", alias = "iframeWidth")]
    pub iframe_width: OptionValue,
    #[serde(default = "default_responsive")]
    pub responsive: OptionValue,
    #[serde(default)]
    pub device: String,
    #[serde(default, alias = "iframeId")]
    pub iframe_id: Option<String>,
    /// CSS selector the provider mounts its iframe into.
    #[serde(default, alias = "iframeContainer")]
    pub iframe_container: Option<String>,
    #[serde(default = "default_script_src", alias = "scriptSrc")]
    pub script_src: String,
}

fn default_server() -> String {
    "https://www.curebit.com".to_string()
}
fn default_dimension() -> OptionValue {
    OptionValue::from(0)
}
fn default_responsive() -> OptionValue {
    OptionValue::Bool(true)
}
fn default_script_src() -> String {
    "//d2jjzw81hqbuqv.cloudfront.net/integration/curebit-1.0.min.js".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_id: String::new(),
            server: default_server(),
            iframe_border: 0,
            iframe_height: default_dimension(),
            iframe_width: default_dimension(),
            responsive: default_responsive(),
            device: String::new(),
            iframe_id: None,
            iframe_container: None,
            script_src: default_script_src(),
        }
    }
}

impl Settings {
    /// Merge caller-supplied overrides (a JSON object) over the defaults.
    pub fn from_overrides(overrides: serde_json::Value) -> BridgeResult<Self> {
        match overrides {
            serde_json::Value::Null => Ok(Self::default()),
            value => Ok(serde_json::from_value(value)?),
        }
    }

    /// Load settings from environment variables.
    pub fn load() -> BridgeResult<Self> {
        Self::load_from(None)
    }

    /// Load settings from an optional file, then environment variables.
    /// Environment values win over file values.
    pub fn load_from(path: Option<&Path>) -> BridgeResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CUREBIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let settings: Self = config.try_deserialize()?;
        debug!(file = ?path, site_id = %settings.site_id, "settings loaded");
        Ok(settings)
    }

    /// Check the options a live provider would reject.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.site_id.trim().is_empty() {
            return Err(BridgeError::Validation("site_id must not be empty".into()));
        }
        if !self.server.is_empty() {
            let parsed = url::Url::parse(&self.server).map_err(|e| {
                BridgeError::Validation(format!("server '{}' is not a valid URL: {e}", self.server))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(BridgeError::Validation(format!(
                    "server must use http or https, got '{}'",
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }
}
