//! Issues, pull requests, milestones, labels and wiki edits.
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{prefix, who, Options, Repo, User};
use crate::irc::{bold, paint, Color};
use crate::timefmt::calendar;
use dispatch::{HookContext, HookFailure};

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Titled {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    milestone: Option<Titled>,
}

#[derive(Debug, Deserialize)]
struct IssuesEvent {
    action: String,
    issue: Issue,
    repository: Repo,
    sender: User,
    #[serde(default)]
    changes: Option<Map<String, Value>>,
    #[serde(default)]
    label: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    #[serde(rename = "ref", default)]
    git_ref: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    commits: u64,
    #[serde(default)]
    merged: bool,
    head: Branch,
    base: Branch,
    #[serde(default)]
    milestone: Option<Titled>,
}

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    action: String,
    pull_request: PullRequest,
    repository: Repo,
    sender: User,
    #[serde(default)]
    changes: Option<Map<String, Value>>,
    #[serde(default)]
    label: Option<Named>,
}

/// `the title, body of ` for edits.
fn changed_fields(changes: &Map<String, Value>) -> String {
    let keys: Vec<&str> = changes.keys().map(String::as_str).collect();
    format!("the {} of ", keys.join(", "))
}

fn on(fragment: &str) -> String {
    format!("{} on ", paint(Color::Purple, fragment))
}

pub(super) async fn issues(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: IssuesEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }

    let interjection = if let Some(changes) = &event.changes {
        changed_fields(changes)
    } else if let Some(label) = &event.label {
        on(&label.name)
    } else if let (true, Some(milestone)) = (event.action.contains("milestone"), &event.issue.milestone) {
        on(&milestone.title)
    } else {
        String::new()
    };

    let link = opts.link(ctx, &event.issue.html_url).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} {interjection}issue {}: {}\x0F {link}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action,
            bold(format!("#{}", event.issue.number)),
            ctx.trim_text(Some(&event.issue.title), 70)
        ),
    );
    Ok(())
}

pub(super) async fn pull_request(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: PullRequestEvent = ctx.narrow(payload)?;
    let pr = &event.pull_request;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }

    let mut suffix = String::new();
    let interjection = if let Some(changes) = &event.changes {
        changed_fields(changes)
    } else if event.action == "synchronize" {
        debug!(number = pr.number, "dropping pull_request synchronize");
        return Ok(());
    } else if event.action == "opened" {
        let noun = if pr.commits == 1 { "commit" } else { "commits" };
        suffix = format!(
            " with {} {noun} from {}",
            pr.commits,
            paint(Color::Purple, &pr.head.label)
        );
        "new ".to_string()
    } else if event.action == "closed" && pr.merged {
        suffix = format!(" into {}", paint(Color::Purple, &pr.base.git_ref));
        "and merged ".to_string()
    } else if let Some(label) = &event.label {
        on(&label.name)
    } else if let (true, Some(milestone)) = (event.action.contains("milestone"), &pr.milestone) {
        on(&milestone.title)
    } else {
        String::new()
    };

    let link = opts.link(ctx, &pr.html_url).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} {interjection}PR {}{suffix}: {}\x0F {link}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action,
            bold(format!("#{}", pr.number)),
            ctx.trim_text(Some(&pr.title), 70)
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Milestone {
    title: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MilestoneEvent {
    action: String,
    milestone: Milestone,
    repository: Repo,
    sender: User,
}

pub(super) async fn milestone(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: MilestoneEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }

    let due = match event.milestone.due_on {
        Some(due) => calendar(due, Utc::now()),
        None => "Invalid date".to_string(),
    };
    let link = opts.link(ctx, &event.milestone.html_url).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} milestone {}, due on {}: {}\x0F {link}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            event.action,
            paint(Color::Purple, &event.milestone.title),
            bold(due),
            ctx.trim_text(event.milestone.description.as_deref(), 140)
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Previous {
    from: String,
}

#[derive(Debug, Deserialize)]
struct LabelChanges {
    #[serde(default)]
    name: Option<Previous>,
}

#[derive(Debug, Deserialize)]
struct LabelEvent {
    action: String,
    label: Named,
    repository: Repo,
    sender: User,
    #[serde(default)]
    changes: Option<LabelChanges>,
}

pub(super) fn label(ctx: &mut HookContext, opts: &Options, payload: &Value) -> Result<(), HookFailure> {
    let event: LabelEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let head = format!("{}{} ", prefix(&event.repository.name), who(&event.sender.login));

    if let Some(old) = event.changes.as_ref().and_then(|changes| changes.name.as_ref()) {
        ctx.notify(
            opts.channel.as_str(),
            format!(
                "{head}renamed label {} to {}",
                paint(Color::Purple, &old.from),
                paint(Color::Purple, &event.label.name)
            ),
        );
        return Ok(());
    }

    ctx.notify(
        opts.channel.as_str(),
        format!("{head}{} label {}", event.action, paint(Color::Purple, &event.label.name)),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Page {
    action: String,
    page_name: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GollumEvent {
    pages: Vec<Page>,
    repository: Repo,
    sender: User,
}

pub(super) async fn gollum(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: GollumEvent = ctx.narrow(payload)?;
    let relevant: Vec<&Page> = event
        .pages
        .iter()
        .filter(|page| opts.actions.allows(&page.action))
        .collect();

    let mut text = relevant
        .iter()
        .map(|page| format!("{} {}", page.action, paint(Color::Purple, &page.page_name)))
        .collect::<Vec<_>>()
        .join(", ");
    match relevant.as_slice() {
        [] => {
            debug!(pages = event.pages.len(), "ignoring irrelevant wiki actions");
            return Ok(());
        }
        [page] => {
            let link = opts.link(ctx, &page.html_url).await?;
            text.push(' ');
            text.push_str(&link);
        }
        _ => {
            let link = opts.link(ctx, &format!("{}/wiki", event.repository.html_url)).await?;
            text.push(' ');
            text.push_str(&link);
        }
    }

    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} changed the wiki: {text}",
            prefix(&event.repository.name),
            who(&event.sender.login)
        ),
    );
    Ok(())
}
