//! The built-in handler table.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::bugsnag::Bugsnag;
use crate::cloudwatch::CloudWatch;
use crate::github::GitHub;
use crate::grafana::Grafana;
use crate::hamalert::HamAlert;
use crate::mailgun::Mailgun;
use crate::ombi::Ombi;
use crate::radarr::Radarr;
use crate::settings::HandlerSettings;
use crate::slackjack::SlackJack;
use crate::sonarr::Sonarr;
use crate::travisci::TravisCi;
use crate::upcheck::Upcheck;
use dispatch::{HandlerTable, HookHandler};

/// Ids accepted by [`BuiltinHandlers`], as they appear in hook URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerId {
    Github,
    Travisci,
    Bugsnag,
    Cloudwatch,
    Grafana,
    Hamalert,
    Mailgun,
    Ombi,
    Radarr,
    Sonarr,
    Slackjack,
    Upcheck,
}

impl HandlerId {
    pub const ALL: [HandlerId; 12] = [
        HandlerId::Github,
        HandlerId::Travisci,
        HandlerId::Bugsnag,
        HandlerId::Cloudwatch,
        HandlerId::Grafana,
        HandlerId::Hamalert,
        HandlerId::Mailgun,
        HandlerId::Ombi,
        HandlerId::Radarr,
        HandlerId::Sonarr,
        HandlerId::Slackjack,
        HandlerId::Upcheck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HandlerId::Github => "github",
            HandlerId::Travisci => "travisci",
            HandlerId::Bugsnag => "bugsnag",
            HandlerId::Cloudwatch => "cloudwatch",
            HandlerId::Grafana => "grafana",
            HandlerId::Hamalert => "hamalert",
            HandlerId::Mailgun => "mailgun",
            HandlerId::Ombi => "ombi",
            HandlerId::Radarr => "radarr",
            HandlerId::Sonarr => "sonarr",
            HandlerId::Slackjack => "slackjack",
            HandlerId::Upcheck => "upcheck",
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no built-in handler named `{0}`")]
pub struct UnknownHandler(pub String);

impl FromStr for HandlerId {
    type Err = UnknownHandler;

    /// Ids are matched exactly; `GitHub` is not `github`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandlerId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownHandler(s.to_string()))
    }
}

/// One instance of every built-in handler, sharing a single settings value.
pub struct BuiltinHandlers {
    settings: Arc<HandlerSettings>,
    github: GitHub,
    travisci: TravisCi,
    bugsnag: Bugsnag,
    cloudwatch: CloudWatch,
    ombi: Ombi,
    radarr: Radarr,
    sonarr: Sonarr,
    upcheck: Upcheck,
}

impl BuiltinHandlers {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self {
            github: GitHub::new(Arc::clone(&settings)),
            travisci: TravisCi::new(Arc::clone(&settings)),
            bugsnag: Bugsnag::new(Arc::clone(&settings)),
            cloudwatch: CloudWatch::new(Arc::clone(&settings)),
            ombi: Ombi::new(Arc::clone(&settings)),
            radarr: Radarr::new(Arc::clone(&settings)),
            sonarr: Sonarr::new(Arc::clone(&settings)),
            upcheck: Upcheck::new(Arc::clone(&settings)),
            settings,
        }
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    pub fn get(&self, id: HandlerId) -> &dyn HookHandler {
        match id {
            HandlerId::Github => &self.github,
            HandlerId::Travisci => &self.travisci,
            HandlerId::Bugsnag => &self.bugsnag,
            HandlerId::Cloudwatch => &self.cloudwatch,
            HandlerId::Grafana => &Grafana,
            HandlerId::Hamalert => &HamAlert,
            HandlerId::Mailgun => &Mailgun,
            HandlerId::Ombi => &self.ombi,
            HandlerId::Radarr => &self.radarr,
            HandlerId::Sonarr => &self.sonarr,
            HandlerId::Slackjack => &SlackJack,
            HandlerId::Upcheck => &self.upcheck,
        }
    }
}

impl HandlerTable for BuiltinHandlers {
    fn resolve(&self, id: &str) -> Option<&dyn HookHandler> {
        id.parse::<HandlerId>().ok().map(|id| self.get(id))
    }

    fn ids(&self) -> Vec<&str> {
        HandlerId::ALL.iter().map(|id| id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_strings() {
        for id in HandlerId::ALL {
            assert_eq!(id.to_string().parse::<HandlerId>(), Ok(id));
        }
        assert_eq!(
            "GitHub".parse::<HandlerId>(),
            Err(UnknownHandler("GitHub".into()))
        );
    }

    #[test]
    fn table_resolves_every_builtin() {
        let table = BuiltinHandlers::new(Arc::new(HandlerSettings::default()));
        assert_eq!(table.ids().len(), HandlerId::ALL.len());
        for id in table.ids() {
            let handler = table.resolve(id).expect("builtin resolves");
            assert_eq!(handler.name(), id);
        }
        assert!(table.resolve("jenkins").is_none());
    }
}
