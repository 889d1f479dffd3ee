//! CI results: Actions check suites and commit-status style events.
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{prefix, short_sha, Options, Repo};
use crate::irc::{paint, Color};
use crate::pattern::{compiled, Compiled};
use dispatch::{HookContext, HookFailure};

static RUN_PATH: Compiled = Lazy::new(|| Regex::new(r"/actions/runs/(\d+)"));

#[derive(Debug, Deserialize)]
struct App {
    slug: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CheckSuite {
    #[serde(default)]
    head_branch: Option<String>,
    head_sha: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    url: String,
    app: App,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CheckSuiteEvent {
    check_suite: CheckSuite,
    repository: Repo,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckRuns {
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    event: String,
    workflow_url: String,
    html_url: String,
    run_number: u64,
}

#[derive(Debug, Deserialize)]
struct Workflow {
    name: String,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, HookFailure> {
    serde_json::from_value(value)
        .map_err(|err| HookFailure::crash(format!("unexpected {what} response: {err}")))
}

/// Follows a check suite to its Actions workflow run. Only works for public
/// repositories since the run id is scraped from the check run web page.
async fn resolve_run(ctx: &HookContext, suite_url: &str) -> Result<Option<WorkflowRun>, HookFailure> {
    let runs: CheckRuns = decode(ctx.fetch_json(&format!("{suite_url}/check-runs")).await?, "check-runs")?;
    let Some(first) = runs.check_runs.first() else {
        return Err(HookFailure::crash("check suite has no check runs"));
    };

    let page = ctx
        .fetch_text(&format!("{}?check_suite_focus=true", first.html_url))
        .await?;
    let re = compiled(&RUN_PATH)?;
    let Some(run_path) = re.find(&page) else {
        return Ok(None);
    };

    let segments: Vec<&str> = suite_url.split('/').collect();
    let repo_api = segments[..segments.len().saturating_sub(2)].join("/");
    let run_url = format!("{repo_api}{}", run_path.as_str());
    debug!(run_url = %run_url, "resolved check suite to workflow run");
    decode(ctx.fetch_json(&run_url).await?, "workflow run").map(Some)
}

fn elapsed(seconds: i64) -> String {
    if seconds > 90 {
        format!("{} min {} sec", seconds / 60, seconds % 60)
    } else {
        format!("{seconds} seconds")
    }
}

pub(super) async fn check_suite(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let event: CheckSuiteEvent = ctx.narrow(payload)?;
    let suite = &event.check_suite;
    if suite.app.slug != "github-actions" {
        debug!(app = %suite.app.slug, name = %suite.app.name, "ignoring check_suite from non-Actions app");
        return Ok(());
    }
    if suite.status.as_deref() != Some("completed") {
        debug!(status = ?suite.status, "ignoring check_suite status");
        return Ok(());
    }

    let mut web_url = format!("{}/actions", event.repository.html_url);
    let mut flow_name = "Actions workflow".to_string();
    if event.repository.private == Some(false) {
        if let Some(run) = resolve_run(ctx, &suite.url).await? {
            if run.conclusion.as_deref() == Some("success") && run.event == "schedule" {
                debug!("ignoring successful scheduled run");
                return Ok(());
            }
            let workflow: Workflow = decode(ctx.fetch_json(&run.workflow_url).await?, "workflow")?;
            web_url = run.html_url;
            flow_name = format!("{} #{}", workflow.name, run.run_number);
        }
    }

    let state = match suite.conclusion.as_deref() {
        Some("failure") => paint(Color::Red, "failed"),
        Some("success") => paint(Color::Green, "passed"),
        other => format!("`{}`", other.unwrap_or("none")),
    };
    let took = elapsed((suite.updated_at - suite.created_at).num_seconds());
    let link = opts.link(ctx, &web_url).await?;
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {flow_name} {state} on {} after {took} {link}",
            prefix(&event.repository.name),
            short_sha(&suite.head_sha),
            paint(Color::Purple, suite.head_branch.as_deref().unwrap_or_default())
        ),
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Sha {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct StatusEvent {
    state: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    commit: Option<Sha>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    target_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    repository: Repo,
}

#[derive(Debug, Deserialize)]
struct Deployment {
    sha: String,
    #[serde(default)]
    task: String,
    #[serde(default)]
    environment: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentEvent {
    deployment: Deployment,
    repository: Repo,
}

#[derive(Debug, Deserialize)]
struct DeploymentStatus {
    #[serde(alias = "status")]
    state: String,
    #[serde(default)]
    target_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeploymentStatusEvent {
    deployment: Deployment,
    deployment_status: DeploymentStatus,
    repository: Repo,
}

#[derive(Debug, Default, Deserialize)]
struct BuildError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Build {
    status: String,
    commit: String,
    #[serde(default)]
    error: BuildError,
    #[serde(default)]
    duration: u64,
}

#[derive(Debug, Deserialize)]
struct PageBuildEvent {
    build: Build,
    repository: Repo,
}

/// The common shape every status-like event is folded into.
struct Status {
    repo: String,
    sha: String,
    state: String,
    context: String,
    description: Option<String>,
    target_url: Option<String>,
}

fn adapt(ctx: &mut HookContext, event: &str, payload: &Value) -> Result<Status, HookFailure> {
    Ok(match event {
        "status" => {
            let status: StatusEvent = ctx.narrow(payload)?;
            let sha = status
                .sha
                .or(status.commit.map(|commit| commit.sha))
                .unwrap_or_default();
            Status {
                repo: status.repository.name,
                sha,
                state: status.state,
                context: status.context.filter(|c| !c.is_empty()).unwrap_or_else(|| "build".into()),
                description: status.description,
                target_url: status.target_url,
            }
        }
        "deployment" => {
            let deploy: DeploymentEvent = ctx.narrow(payload)?;
            Status {
                repo: deploy.repository.name,
                description: Some(format!("{} {}", deploy.deployment.task, deploy.deployment.environment)),
                sha: deploy.deployment.sha,
                state: "info".into(),
                context: "deployment".into(),
                target_url: None,
            }
        }
        "deployment_status" => {
            let deploy: DeploymentStatusEvent = ctx.narrow(payload)?;
            Status {
                repo: deploy.repository.name,
                description: Some(format!("{} {}", deploy.deployment.task, deploy.deployment.environment)),
                sha: deploy.deployment.sha,
                state: deploy.deployment_status.state,
                context: "deployment status".into(),
                target_url: deploy.deployment_status.target_url,
            }
        }
        _ => {
            let page: PageBuildEvent = ctx.narrow(payload)?;
            let description = page.build.error.message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                let seconds = (page.build.duration as f64 / 100.0).round() / 10.0;
                format!("took {seconds} seconds")
            });
            Status {
                repo: page.repository.name,
                sha: page.build.commit,
                state: page.build.status,
                context: "page".into(),
                description: Some(description),
                target_url: None,
            }
        }
    })
}

pub(super) async fn status(
    ctx: &mut HookContext,
    opts: &Options,
    event: &str,
    payload: &Value,
) -> Result<(), HookFailure> {
    let status = adapt(ctx, event, payload)?;
    if matches!(status.state.as_str(), "pending" | "success") {
        debug!(state = %status.state, event, "ignoring github commit status");
        return Ok(());
    }

    // bors and others leave the url out
    let url_field = match status.target_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => format!(" {}", opts.link(ctx, url).await?),
        None => String::new(),
    };
    let state = match status.state.as_str() {
        "failure" => paint(Color::Red, &status.state),
        "built" => paint(Color::Green, &status.state),
        _ => status.state.clone(),
    };
    ctx.notify(
        opts.channel.as_str(),
        format!(
            "{}{} {} {state}: {}\x0F{url_field}",
            prefix(&status.repo),
            short_sha(&status.sha),
            status.context,
            ctx.trim_text(
                Some(status.description.as_deref().unwrap_or("No description.")),
                140
            )
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_switches_to_minutes_after_ninety_seconds() {
        assert_eq!(elapsed(42), "42 seconds");
        assert_eq!(elapsed(90), "90 seconds");
        assert_eq!(elapsed(185), "3 min 5 sec");
    }
}
