use config::{Config, File};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::RwLock;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub synthesis_url: String,
    pub synthesis_model: String,
    pub api_key: String,
    pub enable_audio: bool,
    pub playback_volume: f32,      // 0.0 - 1.0
    pub request_timeout_secs: u64, // Timeout for one synthesis call
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            synthesis_url: "https://api.voxcoach.dev/v1".to_string(),
            synthesis_model: "coach_multilingual_v2".to_string(),
            api_key: String::new(),
            enable_audio: true,
            playback_volume: 1.0,
            request_timeout_secs: 15,
        }
    }
}

lazy_static! {
    pub static ref SETTINGS: RwLock<Settings> =
        RwLock::new(Settings::new().expect("Failed to load settings"));
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = Config::builder()
            // Connect to defaults
            .set_default("synthesis_url", "https://api.voxcoach.dev/v1")?
            .set_default("synthesis_model", "coach_multilingual_v2")?
            .set_default("api_key", "")?
            .set_default("enable_audio", true)?
            .set_default("playback_volume", 1.0)?
            .set_default("request_timeout_secs", 15)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("Coach").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.config/voxcoach/Coach",
                    std::env::var("HOME").unwrap_or_default()
                ))
                .required(false),
            )
            // Merge with environment variables (e.g. VOXCOACH_API_KEY)
            .add_source(config::Environment::with_prefix("VOXCOACH"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.playback_volume < 0.0 || self.playback_volume > 1.0 {
            return Err(config::ConfigError::Message(format!(
                "Invalid playback_volume: {}. Must be between 0.0 and 1.0",
                self.playback_volume
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.synthesis_url.is_empty() {
            return Err(config::ConfigError::Message(
                "synthesis_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_load() {
        let settings = Settings::new().expect("Failed to load settings");
        assert!(settings.request_timeout_secs > 0);
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("VOXCOACH_SYNTHESIS_MODEL", "coach_test_model");
        let settings = Settings::new().expect("Failed to load settings");
        assert_eq!(settings.synthesis_model, "coach_test_model");
        std::env::remove_var("VOXCOACH_SYNTHESIS_MODEL");
    }

    #[test]
    fn test_validate_rejects_bad_volume() {
        let settings = Settings {
            playback_volume: 1.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
