//! GitHub repository and organization webhooks.
//!
//! The event name comes from the `X-GitHub-Event` header. Channel routing
//! looks at the organization, then the repository owner, then the `channel`
//! parameter, last one wins.
//!
//! | Parameter | Effect |
//! |-----------|--------|
//! | `longurl` | post links unshortened |
//! | `branch_filter` / `branch_ignore` | glob lists over pushed branch names |
//! | `action_filter` / `action_ignore` | glob lists over event actions |
//! | `bors` | bors bot username; pushes outside the default branch are dropped |
//! | `stars` | drop legacy `watch` events |
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::irc::{self, Color};
use crate::routing;
use crate::settings::HandlerSettings;
use dispatch::{HookContext, HookFailure, HookHandler};
use ingest::NormalizedRequest;

mod activity;
mod checks;
mod comments;
mod filter;
mod push;
mod repo;

use filter::Relevance;

#[derive(Debug, Clone)]
pub struct GitHub {
    settings: Arc<HandlerSettings>,
}

impl GitHub {
    pub fn new(settings: Arc<HandlerSettings>) -> Self {
        Self { settings }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub login: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Owner {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Repo {
    pub name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    repository: Option<Repo>,
    #[serde(default)]
    organization: Option<User>,
    #[serde(default)]
    sender: Option<User>,
}

impl Envelope {
    fn source(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .map(|repo| repo.name.as_str())
            .or(self.organization.as_ref().map(|org| org.login.as_str()))
            .or(self.sender.as_ref().map(|sender| sender.login.as_str()))
    }
}

/// Per-hook settings resolved from the routing tables and query parameters.
#[derive(Debug)]
pub(crate) struct Options {
    pub channel: String,
    pub noise_channel: Option<String>,
    pub long_urls: bool,
    pub branches: Relevance,
    pub actions: Relevance,
    pub bors: Option<String>,
    pub max_commits: usize,
    pub commit_message_length: usize,
}

impl Options {
    /// Link fragment, shortened unless `longurl` was given.
    pub(crate) async fn link(&self, ctx: &HookContext, url: &str) -> Result<String, HookFailure> {
        if self.long_urls {
            return Ok(irc::link(url));
        }
        let short = ctx.shorten_url(url).await?;
        Ok(irc::link(&short))
    }

    pub(crate) fn is_bors(&self, name: &str) -> bool {
        self.bors
            .as_deref()
            .map_or(false, |bors| bors.eq_ignore_ascii_case(name))
    }

    pub(crate) fn wants_action(&self, action: &str) -> bool {
        let wanted = self.actions.allows(action);
        if !wanted {
            debug!(action, "ignoring irrelevant action");
        }
        wanted
    }
}

/// `[repo] ` prefix.
pub(crate) fn prefix(name: &str) -> String {
    irc::tag(Color::Pink, name)
}

pub(crate) fn who(login: &str) -> String {
    irc::paint(Color::LightGrey, login)
}

pub(crate) fn short_sha(sha: &str) -> String {
    irc::paint(Color::Grey, sha.chars().take(7).collect::<String>())
}

fn relevance(
    ctx: &mut HookContext,
    hook: &NormalizedRequest,
    kind: &str,
) -> Result<Relevance, HookFailure> {
    let filter_key = format!("{kind}_filter");
    let ignore_key = format!("{kind}_ignore");
    let params = hook.parameters();
    match Relevance::from_params(params.non_empty(&filter_key), params.non_empty(&ignore_key)) {
        Ok(relevance) => Ok(relevance),
        Err(err) => {
            let message = format!("Invalid {kind} pattern: {err}");
            Err(ctx.cancel_as_malformed(Some(&message)).into())
        }
    }
}

#[async_trait]
impl HookHandler for GitHub {
    fn name(&self) -> &str {
        "github"
    }

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let Some(event) = hook.headers().get("X-GitHub-Event").map(str::to_string) else {
            return Err(ctx
                .cancel_as_unrecognizable(Some("Missing X-GitHub-Event header"))
                .into());
        };
        let payload = routing::body(ctx, hook)?;
        let envelope: Envelope = ctx.narrow(&payload)?;
        let Some(source) = envelope.source().map(str::to_string) else {
            return Err(ctx
                .cancel_as_malformed(Some("No repository, organization or sender in payload"))
                .into());
        };

        let org_login = envelope.organization.as_ref().map(|org| org.login.as_str());
        let owner_login = envelope
            .repository
            .as_ref()
            .and_then(|repo| repo.owner.as_ref())
            .and_then(|owner| owner.login.as_deref());
        let routed = owner_login
            .and_then(|login| self.settings.org_channels.get(login))
            .or_else(|| org_login.and_then(|login| self.settings.org_channels.get(login)));

        let Some(channel) = routing::channel(hook, routed.map(String::as_str)) else {
            debug!(source = %source, "no channel routed for github hook");
            return Ok(());
        };

        let opts = Options {
            max_commits: self.settings.commit_cap(&channel),
            commit_message_length: self.settings.commit_message_length(&channel),
            noise_channel: self.settings.noise_channel.clone(),
            long_urls: hook.parameters().non_empty("longurl").is_some(),
            branches: relevance(ctx, hook, "branch")?,
            actions: relevance(ctx, hook, "action")?,
            bors: hook.parameters().non_empty("bors").map(str::to_string),
            channel,
        };

        route(ctx, &opts, hook, &event, &source, &payload).await
    }
}

async fn route(
    ctx: &mut HookContext,
    opts: &Options,
    hook: &NormalizedRequest,
    event: &str,
    source: &str,
    payload: &Value,
) -> Result<(), HookFailure> {
    match event {
        "push" => push::push(ctx, opts, payload).await,
        "issues" => activity::issues(ctx, opts, payload).await,
        "pull_request" => activity::pull_request(ctx, opts, payload).await,
        "milestone" => activity::milestone(ctx, opts, payload).await,
        "label" => activity::label(ctx, opts, payload),
        "gollum" => activity::gollum(ctx, opts, payload).await,
        "commit_comment" => comments::commit_comment(ctx, opts, payload).await,
        "issue_comment" => comments::issue_comment(ctx, opts, payload).await,
        "pull_request_review" => comments::review(ctx, opts, payload).await,
        "pull_request_review_comment" => comments::review_comment(ctx, opts, payload).await,
        "check_run" => {
            debug!("ignoring github check_run");
            Ok(())
        }
        "check_suite" => checks::check_suite(ctx, opts, payload).await,
        "status" | "deployment" | "deployment_status" | "page_build" => {
            checks::status(ctx, opts, event, payload).await
        }
        "watch" => repo::watch(ctx, opts, hook.parameters().contains("stars"), payload),
        "star" => repo::star(ctx, opts, payload),
        "member" => repo::member(ctx, opts, payload),
        "fork" => repo::fork(ctx, opts, payload),
        "create" | "delete" => repo::create_or_delete(ctx, opts, event, payload),
        "repository" => repo::repository(ctx, opts, payload),
        "repository_vulnerability_alert" => repo::vulnerability_alert(ctx, opts, payload).await,
        "project_column" => repo::project_column(ctx, opts, payload),
        "project_card" => repo::project_card(ctx, opts, payload),
        "project" => repo::project(ctx, opts, payload),
        "ping" => repo::ping(ctx, opts, source, payload).await,
        "meta" => repo::meta(ctx, opts, source, payload),
        other => {
            ctx.notify(
                opts.channel.as_str(),
                format!("{}Got Github event of unhandled type: {other}", prefix(source)),
            );
            if let Some(noise) = &opts.noise_channel {
                ctx.notify(
                    noise.as_str(),
                    format!(
                        "Got Github event for {} of unhandled type \"{other}\"",
                        opts.channel
                    ),
                );
            }
            Ok(())
        }
    }
}
