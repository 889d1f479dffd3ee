//! Repository-level housekeeping events.
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{prefix, who, Options, Repo, User};
use crate::irc::{paint, Color, BOLD, RESET, UNDERLINE};
use dispatch::{HookContext, HookFailure};

#[derive(Debug, Deserialize)]
struct Basic {
    #[serde(default)]
    action: String,
    repository: Repo,
    sender: User,
}

impl Basic {
    fn head(&self) -> String {
        format!("{}{} ", prefix(&self.repository.name), who(&self.sender.login))
    }
}

pub(super) fn watch(
    ctx: &mut HookContext,
    opts: &Options,
    stars_param: bool,
    payload: &Value,
) -> Result<(), HookFailure> {
    if stars_param {
        debug!("ignoring legacy watch event due to stars parameter");
        return Ok(());
    }
    let event: Basic = ctx.narrow(payload)?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}starred the repository! \u{2B50} (PS: This is from a legacy webhook event. \
             Please check 'star' instead of 'watch' in the webhook settings, or add '&stars' \
             to the webhook URL if you use the 'Send me everything' setting.)",
            event.head()
        ),
    );
    Ok(())
}

pub(super) fn star(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: Basic = ctx.narrow(payload)?;
    let line = if event.action == "created" {
        format!("{}starred the repository! \u{2B50}", event.head())
    } else {
        format!("{}{} their star of the repository.", event.head(), event.action)
    };
    ctx.notify(opts.channel.as_str(), line);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct MemberEvent {
    action: String,
    member: User,
    repository: Repo,
}

pub(super) fn member(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: MemberEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let head = format!("{}{} ", prefix(&event.repository.name), who(&event.member.login));
    let line = if event.action == "added" {
        format!("{head}is now a repository collaborator \u{1F44D}")
    } else {
        format!("{head}was {} as a collaborator", event.action)
    };
    ctx.notify(opts.channel.as_str(), line);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Forkee {
    full_name: String,
    owner: User,
}

#[derive(Debug, Deserialize)]
struct ForkEvent {
    forkee: Forkee,
    repository: Repo,
}

pub(super) fn fork(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: ForkEvent = ctx.narrow(payload)?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} created a fork @ {}",
            prefix(&event.repository.name),
            who(&event.forkee.owner.login),
            paint(Color::Pink, &event.forkee.full_name)
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RefEvent {
    #[serde(rename = "ref")]
    git_ref: String,
    ref_type: String,
    repository: Repo,
    sender: User,
}

pub(super) fn create_or_delete(
    ctx: &mut HookContext,
    opts: &Options,
    event_type: &str,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: RefEvent = ctx.narrow(payload)?;
    // push events already cover branches in more detail
    if event.ref_type == "branch" {
        debug!(event = event_type, "ignoring github ref event for a branch");
        return Ok(());
    }
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {event_type}d {} {}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.ref_type,
            paint(Color::Purple, &event.git_ref)
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RepositoryEvent {
    action: String,
    repository: Repo,
    sender: User,
    #[serde(default)]
    changes: Option<Map<String, Value>>,
}

pub(super) fn repository(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: RepositoryEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let changes = event
        .changes
        .as_ref()
        .map(|changes| {
            changes
                .keys()
                .map(|key| format!("`{key}`"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} the repository {changes}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Alert {
    affected_package_name: String,
    affected_range: String,
    external_identifier: String,
    external_reference: String,
    #[serde(default)]
    fixed_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VulnerabilityEvent {
    action: String,
    alert: Alert,
    repository: Repo,
}

pub(super) async fn vulnerability_alert(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: VulnerabilityEvent = ctx.narrow(payload)?;
    if event.action != "create" {
        debug!(action = %event.action, "ignoring unrecognized vulnerability alert action");
        return Ok(());
    }
    let alert = &event.alert;
    let link = opts.link(ctx, &alert.external_reference).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{BOLD}{UNDERLINE}{}/!\\{RESET} {} - {} {} subject to {} - {}fixed in {} {link}",
            prefix(&event.repository.name),
            Color::Red.code(),
            paint(Color::Red, "Inbound Vulnerability Alert"),
            paint(Color::Cyan, &alert.affected_package_name),
            paint(Color::Pink, &alert.affected_range),
            paint(Color::Orange, &alert.external_identifier),
            Color::Teal.code(),
            paint(Color::Purple, alert.fixed_in.as_deref().unwrap_or("(n/a)"))
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ColumnEvent {
    action: String,
    project_column: Column,
    repository: Repo,
    sender: User,
}

pub(super) fn project_column(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: ColumnEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} project column {}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action,
            event.project_column.name
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Card {
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardEvent {
    action: String,
    project_card: Card,
    repository: Repo,
    sender: User,
}

pub(super) fn project_card(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: CardEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let limit = if event.action == "created" { 300 } else { 80 };
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} project card: {}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action,
            ctx.trim_text(event.project_card.note.as_deref(), limit)
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ProjectEvent {
    action: String,
    project: Column,
    repository: Repo,
    sender: User,
}

pub(super) fn project(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: ProjectEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} project {}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action,
            event.project.name
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct HookInfo {
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct PingEvent {
    #[serde(default)]
    zen: String,
    hook: HookInfo,
    #[serde(default)]
    organization: Option<User>,
    #[serde(default)]
    repository: Option<Repo>,
}

pub(super) async fn ping(
    ctx: &mut HookContext,
    opts: &Options,
    source: &str,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: PingEvent = ctx.narrow(payload)?;
    let ping_url = match (&event.hook.kind[..], &event.organization, &event.repository) {
        ("Organization", Some(org), _) => format!("https://github.com/{}", org.login),
        (_, _, Some(repo)) => repo.html_url.clone(),
        _ => {
            return Err(ctx
                .cancel_as_malformed(Some("ping without a repository or organization"))
                .into())
        }
    };
    let link = opts.link(ctx, &ping_url).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}This GitHub hook is working! Received a `ping` event. {} {link}",
            prefix(source),
            event.zen
        ),
    );
    Ok(())
}

pub(super) fn meta(
    ctx: &mut HookContext,
    opts: &Options,
    source: &str,
    payload: &Value,
) -> Result<(), HookFailure> {
    #[derive(Deserialize)]
    struct Meta {
        action: String,
    }
    let event: Meta = ctx.narrow(payload)?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}Looks like this GitHub webhook was {}",
            prefix(source),
            paint(Color::Maroon, &event.action)
        ),
    );
    Ok(())
}
