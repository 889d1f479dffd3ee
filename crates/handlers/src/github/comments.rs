//! Comment and review events.
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{prefix, short_sha, who, Options, Repo, User};
use crate::irc::{bold, paint, Color};
use dispatch::{HookContext, HookFailure};

#[derive(Debug, Deserialize)]
struct Comment {
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    commit_id: String,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Numbered {
    number: u64,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CommentEvent {
    action: String,
    comment: Comment,
    repository: Repo,
    sender: User,
    #[serde(default)]
    issue: Option<Numbered>,
    #[serde(default)]
    pull_request: Option<Numbered>,
}

impl CommentEvent {
    fn head(&self) -> String {
        format!("{}{} ", prefix(&self.repository.name), who(&self.sender.login))
    }
}

fn number(n: u64) -> String {
    bold(format!("#{n}"))
}

pub(super) async fn commit_comment(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: CommentEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let subject = format!("commit {}", short_sha(&event.comment.commit_id));
    let link = opts.link(ctx, &event.comment.html_url).await?;

    let line = if event.action == "created" {
        format!(
            "{}commented on {subject}: {}\x0F {link}",
            event.head(),
            ctx.trim_text(event.comment.body.as_deref(), 140)
        )
    } else {
        format!("{}{} a comment on {subject}: {link}", event.head(), event.action)
    };
    ctx.notify(opts.channel.as_str(), line);
    Ok(())
}

pub(super) async fn issue_comment(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: CommentEvent = ctx.narrow(payload)?;
    let Some(issue) = event.issue.as_ref() else {
        return Err(ctx.cancel_as_malformed(Some("issue_comment without an issue")).into());
    };
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let kind = if issue.pull_request.is_some() { "PR" } else { "issue" };
    let link = opts.link(ctx, &event.comment.html_url).await?;

    let line = if event.action == "created" {
        format!(
            "{}commented on {kind} {}: {}\x0F {link}",
            event.head(),
            number(issue.number),
            ctx.trim_text(event.comment.body.as_deref(), 140)
        )
    } else {
        format!(
            "{}{} a comment on {kind} {}: {link}",
            event.head(),
            event.action,
            number(issue.number)
        )
    };
    ctx.notify(opts.channel.as_str(), line);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Review {
    state: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewEvent {
    action: String,
    review: Review,
    pull_request: Numbered,
    repository: Repo,
    sender: User,
}

pub(super) async fn review(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: ReviewEvent = ctx.narrow(payload)?;
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    if event.action != "submitted" {
        debug!(action = %event.action, "ignoring pull_request_review action");
        return Ok(());
    }

    let body = match event.review.body.as_deref().filter(|body| !body.is_empty()) {
        Some(body) => format!(": {}\x0F", ctx.trim_text(Some(body), 140)),
        None => String::new(),
    };
    let link = opts.link(ctx, &event.review.html_url).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} reviewed PR {} and {}{body} {link}",
            prefix(&event.repository.name),
            who(&event.sender.login),
            number(event.pull_request.number),
            paint(Color::Purple, &event.review.state)
        ),
    );
    Ok(())
}

pub(super) async fn review_comment(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: CommentEvent = ctx.narrow(payload)?;
    let Some(pull) = event.pull_request.as_ref() else {
        return Err(ctx
            .cancel_as_malformed(Some("pull_request_review_comment without a pull_request"))
            .into());
    };
    if !opts.wants_action(&event.action) {
        return Ok(());
    }
    let link = opts.link(ctx, &event.comment.html_url).await?;

    let line = if event.action == "created" {
        format!(
            "{}commented in a review of PR {} at {}: {}\x0F {link}",
            event.head(),
            number(pull.number),
            event.comment.path.as_deref().unwrap_or_default(),
            ctx.trim_text(event.comment.body.as_deref(), 140)
        )
    } else {
        format!(
            "{}{} a comment on a review of PR {}: {link}",
            event.head(),
            event.action,
            number(pull.number)
        )
    };
    ctx.notify(opts.channel.as_str(), line);
    Ok(())
}
