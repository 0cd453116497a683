use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

const ENV_PREFIX: &str = "OAS";

/// Runtime settings, overridable through `OAS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub sitemap_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub results_dir: PathBuf,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sitemap_timeout_secs: 30,
            page_timeout_secs: 10,
            results_dir: PathBuf::from("results"),
            user_agent: default_user_agent(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let defaults = Settings::default();
        let settings = ::config::Config::builder()
            .set_default("sitemap_timeout_secs", defaults.sitemap_timeout_secs as i64)?
            .set_default("page_timeout_secs", defaults.page_timeout_secs as i64)?
            .set_default("results_dir", defaults.results_dir.to_string_lossy().to_string())?
            .set_default("user_agent", defaults.user_agent)?
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
