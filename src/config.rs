use serde::{Deserialize, Deserializer};
use thiserror::Error;
use time::UtcOffset;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BOT_TOKEN (or TELOXIDE_TOKEN) is not set")]
    MissingBotToken,
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(alias = "BOT_TOKEN", alias = "TELOXIDE_TOKEN", alias = "teloxide_token")]
    pub bot_token: String,
    #[serde(alias = "GITHUB_TOKEN", default)]
    pub github_token: Option<String>,
    #[serde(alias = "GIST_ID", default, deserialize_with = "gist_id")]
    pub gist_id: Option<String>,
    #[serde(alias = "GIST_FILE", default = "default_data_file")]
    pub gist_file: String,
    #[serde(alias = "DATA_FILE", default = "default_data_file")]
    pub data_file: String,
    #[serde(alias = "DELETE_PASSWORD", default)]
    pub delete_password: Option<String>,
    #[serde(alias = "NOTIFICATION_CHAT_ID", default)]
    pub notification_chat_id: Option<i64>,
    #[serde(alias = "NOTIFY_TIMES", default = "default_notify_times")]
    pub notify_times: String,
    #[serde(alias = "UTC_OFFSET_HOURS", default = "default_utc_offset_hours")]
    pub utc_offset_hours: i8,
    #[serde(alias = "PORT", default = "default_port")]
    pub port: u16,
}

/// Where the document is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    Gist { token: String, gist_id: String, file_name: String },
    File { path: String },
}

fn default_data_file() -> String {
    "moto_data.json".to_string()
}

fn default_notify_times() -> String {
    "08:00,14:00".to_string()
}

fn default_utc_offset_hours() -> i8 {
    -3
}

fn default_port() -> u16 {
    8080
}

/// Accepts either a bare id or the full `https://gist.github.com/<user>/<id>` URL.
fn clean_gist_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("github.com") {
        raw.trim_end_matches('/').rsplit('/').next().unwrap_or(raw).to_string()
    } else {
        raw.to_string()
    }
}

fn gist_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.map(|s| clean_gist_id(&s)).filter(|s| !s.is_empty()))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match non_empty(get(key)) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = non_empty(get("BOT_TOKEN"))
            .or_else(|| non_empty(get("TELOXIDE_TOKEN")))
            .ok_or(ConfigError::MissingBotToken)?;

        let notification_chat_id = match non_empty(get("NOTIFICATION_CHAT_ID")) {
            None => None,
            Some(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                key: "NOTIFICATION_CHAT_ID",
                value,
            })?),
        };

        let cfg = Config {
            bot_token,
            github_token: non_empty(get("GITHUB_TOKEN")),
            gist_id: non_empty(get("GIST_ID")).map(|s| clean_gist_id(&s)),
            gist_file: non_empty(get("GIST_FILE")).unwrap_or_else(default_data_file),
            data_file: non_empty(get("DATA_FILE")).unwrap_or_else(default_data_file),
            delete_password: non_empty(get("DELETE_PASSWORD")),
            notification_chat_id,
            notify_times: non_empty(get("NOTIFY_TIMES")).unwrap_or_else(default_notify_times),
            utc_offset_hours: parse_env(&get, "UTC_OFFSET_HOURS", default_utc_offset_hours())?,
            port: parse_env(&get, "PORT", default_port())?,
        };
        cfg.validate()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(raw)?;
        if cfg.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        cfg.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.utc_offset()?;
        self.notify_times()?;
        Ok(self)
    }

    /// Gist when both token and id are present, local file otherwise.
    pub fn storage(&self) -> StorageSettings {
        match (&self.github_token, &self.gist_id) {
            (Some(token), Some(gist_id)) => StorageSettings::Gist {
                token: token.clone(),
                gist_id: gist_id.clone(),
                file_name: self.gist_file.clone(),
            },
            _ => StorageSettings::File { path: self.data_file.clone() },
        }
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, ConfigError> {
        UtcOffset::from_hms(self.utc_offset_hours, 0, 0).map_err(|_| ConfigError::Invalid {
            key: "UTC_OFFSET_HOURS",
            value: self.utc_offset_hours.to_string(),
        })
    }

    /// Parses `NOTIFY_TIMES` (`HH:MM,HH:MM`) into `(hour, minute)` pairs.
    pub fn notify_times(&self) -> Result<Vec<(u8, u8)>, ConfigError> {
        let invalid = || ConfigError::Invalid {
            key: "NOTIFY_TIMES",
            value: self.notify_times.clone(),
        };
        self.notify_times
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|slot| {
                let (h, m) = slot.split_once(':').ok_or_else(invalid)?;
                let hour: u8 = h.trim().parse().map_err(|_| invalid())?;
                let minute: u8 = m.trim().parse().map_err(|_| invalid())?;
                if hour > 23 || minute > 59 {
                    return Err(invalid());
                }
                Ok((hour, minute))
            })
            .collect()
    }

    /// Token prefix safe to print.
    pub fn masked_token(&self) -> String {
        let shown: String = self.bot_token.chars().take(10).collect();
        format!("{}...", shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn bot_token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBotToken));
        let cfg = Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.bot_token, "123:abc");
    }

    #[test]
    fn defaults_use_local_file() {
        let cfg = Config::from_lookup(lookup(&[("BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.delete_password, None);
        assert_eq!(cfg.notify_times().unwrap(), vec![(8, 0), (14, 0)]);
        assert_eq!(cfg.utc_offset().unwrap().whole_hours(), -3);
        assert_eq!(cfg.storage(), StorageSettings::File { path: "moto_data.json".to_string() });
    }

    #[test]
    fn gist_url_is_reduced_to_id() {
        let cfg = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("GITHUB_TOKEN", "ghp_x"),
            ("GIST_ID", "https://gist.github.com/someone/0123abcd/"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.storage(),
            StorageSettings::Gist {
                token: "ghp_x".to_string(),
                gist_id: "0123abcd".to_string(),
                file_name: "moto_data.json".to_string(),
            }
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("NOTIFY_TIMES", "25:00")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "NOTIFY_TIMES", .. }));
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("NOTIFICATION_CHAT_ID", "@me")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "NOTIFICATION_CHAT_ID", .. }));
    }

    #[test]
    fn json_config_accepts_env_style_keys() {
        let cfg = Config::from_json_str(
            r#"{"BOT_TOKEN":"123:abc","NOTIFICATION_CHAT_ID":-1001,"NOTIFY_TIMES":"07:30","GIST_ID":"https://gist.github.com/u/ff00"}"#,
        )
        .unwrap();
        assert_eq!(cfg.notification_chat_id, Some(-1001));
        assert_eq!(cfg.notify_times().unwrap(), vec![(7, 30)]);
        assert_eq!(cfg.gist_id.as_deref(), Some("ff00"));
        assert_eq!(cfg.data_file, "moto_data.json");
    }

    #[test]
    fn masks_token() {
        let cfg = Config::from_lookup(lookup(&[("BOT_TOKEN", "1234567890:SECRET")])).unwrap();
        assert_eq!(cfg.masked_token(), "1234567890...");
    }
}
