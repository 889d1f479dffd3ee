//! Built-in webhook formatters for hookrelay.
//!
//! Each handler reads one sender's webhook and turns it into IRC-formatted
//! chat lines through [`dispatch::HookContext::notify`]. The full set is
//! exposed as [`BuiltinHandlers`], a [`dispatch::HandlerTable`] keyed by
//! [`HandlerId`].
//!
//! | id | sender |
//! |----|--------|
//! | `github` | GitHub repository and organization webhooks |
//! | `travisci` | Travis CI build notifications |
//! | `bugsnag` | Bugsnag error alerts |
//! | `cloudwatch` | CloudWatch alarms delivered over SNS |
//! | `grafana` | Grafana alert notifications |
//! | `hamalert` | HamAlert spots |
//! | `mailgun` | inbound mail routed by Mailgun |
//! | `ombi` | Ombi media requests |
//! | `radarr` / `sonarr` | download and grab events |
//! | `slackjack` | Slack-style incoming webhooks |
//! | `upcheck` | Nagios, Freshping, UptimeRobot and Google Cloud alerting |
//!
//! Routing tables, commit caps and the default timezone come from
//! [`HandlerSettings`]; a `channel` query parameter always wins over them.

mod bugsnag;
mod cloudwatch;
mod filesize;
mod github;
mod grafana;
mod hamalert;
pub mod irc;
mod mailgun;
mod ombi;
mod pattern;
mod radarr;
mod registry;
mod routing;
mod settings;
mod slackjack;
mod sonarr;
mod timefmt;
mod travisci;
mod upcheck;

pub use crate::bugsnag::Bugsnag;
pub use crate::cloudwatch::CloudWatch;
pub use crate::filesize::filesize;
pub use crate::github::GitHub;
pub use crate::grafana::Grafana;
pub use crate::hamalert::HamAlert;
pub use crate::mailgun::Mailgun;
pub use crate::ombi::Ombi;
pub use crate::radarr::Radarr;
pub use crate::registry::{BuiltinHandlers, HandlerId, UnknownHandler};
pub use crate::settings::{HandlerSettings, SettingsError};
pub use crate::slackjack::SlackJack;
pub use crate::sonarr::Sonarr;
pub use crate::travisci::TravisCi;
pub use crate::upcheck::Upcheck;
