//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default username the bot posts replies under.
fn default_display_title() -> String {
    "Tömat Vörben".to_string()
}

/// Default title of the `whoami` reply field.
fn default_whoami_title() -> String {
    "I, Tömat Vörben".to_string()
}

/// Default body of the `whoami` reply field.
fn default_whoami_description() -> String {
    "The smell of a vampire, the touch of butterfly...".to_string()
}

/// Default timeout for a single list service request, in seconds.
fn default_list_api_timeout_secs() -> u64 {
    10
}

/// Configuration for the home-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app-level token used for Socket Mode (`HOME_BOT_SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`HOME_BOT_SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Base URL of the shopping list service (`HOME_BOT_LIST_API_HOST`).
    pub list_api_host: String,
    /// Per-request timeout against the list service (`HOME_BOT_LIST_API_TIMEOUT_SECS`).
    #[serde(default = "default_list_api_timeout_secs")]
    pub list_api_timeout_secs: u64,
    /// Username replies are posted under (`HOME_BOT_DISPLAY_TITLE`).
    #[serde(default = "default_display_title")]
    pub display_title: String,
    /// Title of the `whoami` reply (`HOME_BOT_WHOAMI_TITLE`).
    #[serde(default = "default_whoami_title")]
    pub whoami_title: String,
    /// Body of the `whoami` reply (`HOME_BOT_WHOAMI_DESCRIPTION`).
    #[serde(default = "default_whoami_description")]
    pub whoami_description: String,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("HOME_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.slack_app_token.is_empty() || self.slack_bot_token.is_empty() {
            return Err(anyhow::anyhow!("Both the Slack app token and the Slack bot token must be set."));
        }

        if self.list_api_host.is_empty() {
            return Err(anyhow::anyhow!("The list service host must be set."));
        }

        if self.list_api_timeout_secs < 1 || self.list_api_timeout_secs > 300 {
            return Err(anyhow::anyhow!("The list service timeout must be between 1 and 300 seconds."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(inner: ConfigInner) -> Config {
        Config { inner: Arc::new(inner) }
    }

    fn valid_inner() -> ConfigInner {
        ConfigInner {
            slack_app_token: "xapp-test".to_string(),
            slack_bot_token: "xoxb-test".to_string(),
            list_api_host: "http://localhost:8080".to_string(),
            list_api_timeout_secs: default_list_api_timeout_secs(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_complete_config() {
        assert!(config(valid_inner()).validate().is_ok());
    }

    #[test]
    fn rejects_missing_tokens() {
        let inner = ConfigInner {
            slack_bot_token: String::new(),
            ..valid_inner()
        };

        assert!(config(inner).validate().is_err());
    }

    #[test]
    fn rejects_missing_list_host() {
        let inner = ConfigInner {
            list_api_host: String::new(),
            ..valid_inner()
        };

        assert!(config(inner).validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        let inner = ConfigInner {
            list_api_timeout_secs: 0,
            ..valid_inner()
        };

        assert!(config(inner).validate().is_err());
    }

    #[test]
    fn loads_from_toml_file() {
        let path = std::env::temp_dir().join(format!("home-bot-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
slack_app_token = "xapp-file"
slack_bot_token = "xoxb-file"
list_api_host = "http://lists.local"
"#,
        )
        .unwrap();

        let loaded = Config::load(Some(&path));
        let _ = std::fs::remove_file(&path);
        let loaded = loaded.unwrap();

        assert_eq!(loaded.slack_app_token, "xapp-file");
        assert_eq!(loaded.list_api_host, "http://lists.local");
        assert_eq!(loaded.display_title, "Tömat Vörben");
        assert_eq!(loaded.list_api_timeout_secs, 10);
    }
}
