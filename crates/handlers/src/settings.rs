//! Routing tables and per-channel limits shared by the built-in handlers.
//!
//! ```yaml
//! org_channels:
//!   stardustapp: "#stardust"
//!   relrod: "#dagd"
//! account_channels:
//!   Danopia: "##danopia"
//! commit_caps:
//!   "#hledger": 8
//! commit_message_lengths:
//!   "#dagd": 200
//! fallback_channel: "##danopia"
//! noise_channel: "#stardust-noise"
//! viewer_timezone: America/Los_Angeles
//! ```
use std::collections::BTreeMap;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerSettings {
    /// GitHub organization / repository owner and Travis owner -> channel.
    pub org_channels: BTreeMap<String, String>,

    /// Bugsnag account name -> channel.
    pub account_channels: BTreeMap<String, String>,

    /// Uptime checker organization name -> channel.
    pub upcheck_channels: BTreeMap<String, String>,

    /// Channel -> number of individual commit lines read out after a push.
    pub commit_caps: BTreeMap<String, usize>,

    /// Channel -> maximum commit message length.
    pub commit_message_lengths: BTreeMap<String, usize>,

    pub default_commit_cap: usize,
    pub default_commit_message_length: usize,

    /// Destination for media-manager hooks that carry no `channel` parameter.
    pub fallback_channel: Option<String>,

    /// Where operators want to hear about hooks nobody programmed for. Also
    /// the default channel for CloudWatch.
    pub noise_channel: Option<String>,

    /// IANA zone used for release and air dates unless the hook overrides it
    /// with the `viewer-timezone` parameter.
    pub viewer_timezone: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),

    #[error("{0} must be greater than zero")]
    ZeroLimit(String),
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            org_channels: BTreeMap::new(),
            account_channels: BTreeMap::new(),
            upcheck_channels: BTreeMap::new(),
            commit_caps: BTreeMap::new(),
            commit_message_lengths: BTreeMap::new(),
            default_commit_cap: 3,
            default_commit_message_length: 70,
            fallback_channel: None,
            noise_channel: None,
            viewer_timezone: "America/Los_Angeles".to_string(),
        }
    }
}

impl HandlerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.viewer_tz()?;
        if self.default_commit_message_length == 0 {
            return Err(SettingsError::ZeroLimit("default_commit_message_length".into()));
        }
        if let Some((channel, _)) = self.commit_message_lengths.iter().find(|(_, len)| **len == 0) {
            return Err(SettingsError::ZeroLimit(format!("commit_message_lengths[{channel}]")));
        }
        Ok(())
    }

    pub fn viewer_tz(&self) -> Result<Tz, SettingsError> {
        self.viewer_timezone
            .parse::<Tz>()
            .map_err(|_| SettingsError::UnknownTimezone(self.viewer_timezone.clone()))
    }

    pub fn commit_cap(&self, channel: &str) -> usize {
        self.commit_caps
            .get(channel)
            .copied()
            .unwrap_or(self.default_commit_cap)
    }

    pub fn commit_message_length(&self, channel: &str) -> usize {
        self.commit_message_lengths
            .get(channel)
            .copied()
            .unwrap_or(self.default_commit_message_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = HandlerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.commit_cap("#anything"), 3);
        assert_eq!(settings.commit_message_length("#anything"), 70);
    }

    #[test]
    fn per_channel_overrides() {
        let mut settings = HandlerSettings::default();
        settings.commit_caps.insert("#hledger".into(), 8);
        settings.commit_message_lengths.insert("#dagd".into(), 200);
        assert_eq!(settings.commit_cap("#hledger"), 8);
        assert_eq!(settings.commit_message_length("#dagd"), 200);
    }

    #[test]
    fn bad_timezone_rejected() {
        let settings = HandlerSettings {
            viewer_timezone: "Mars/Olympus_Mons".into(),
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::UnknownTimezone("Mars/Olympus_Mons".into()))
        );
    }
}
