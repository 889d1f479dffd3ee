use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{prefix, short_sha, who, Options, Repo};
use crate::irc::{bold, paint, Color};
use crate::pattern::{compiled, Compiled};
use dispatch::{HookContext, HookFailure};

static BORS_MERGE: Compiled = Lazy::new(|| Regex::new(r"^Merge #(\d+)\n\n\d+: (.+)"));

#[derive(Debug, Deserialize)]
struct Push {
    #[serde(rename = "ref")]
    git_ref: String,
    #[serde(default)]
    base_ref: Option<String>,
    #[serde(default)]
    created: bool,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    forced: bool,
    compare: String,
    #[serde(default)]
    commits: Vec<Commit>,
    pusher: Pusher,
    repository: Repo,
}

#[derive(Debug, Deserialize)]
struct Commit {
    id: String,
    message: String,
    committer: Committer,
}

#[derive(Debug, Deserialize)]
struct Committer {
    name: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Pusher {
    name: String,
}

/// `refs/heads/feature/x` -> `feature/x`
fn branch_name(git_ref: &str) -> String {
    git_ref.split('/').skip(2).collect::<Vec<_>>().join("/")
}

fn commits_noun(count: usize) -> &'static str {
    if count == 1 {
        "commit"
    } else {
        "commits"
    }
}

impl Commit {
    /// Committer name, only when it differs from the pusher.
    fn committer_suffix(&self, pusher: &str) -> String {
        if self.committer.username.as_deref() == Some(pusher) {
            String::new()
        } else {
            format!(" {}", paint(Color::LightGrey, &self.committer.name))
        }
    }
}

pub(super) async fn push(
    ctx: &mut HookContext,
    opts: &Options,
    payload: &Value,
) -> Result<(), HookFailure> {
    let push: Push = ctx.narrow(payload)?;
    let repo = prefix(&push.repository.name);
    let pusher = who(&push.pusher.name);
    let branch = branch_name(&push.git_ref);
    let count = push.commits.len();
    let verb = if push.forced {
        paint(Color::Red, "force-pushed")
    } else {
        "pushed".to_string()
    };

    if !opts.branches.allows(&branch) {
        debug!(branch = %branch, "ignoring irrelevant branch");
        return Ok(());
    }

    // bors projects only hear about out-of-band pushes to the default branch
    if opts.bors.is_some() {
        let on_default = push.repository.default_branch.as_deref() == Some(branch.as_str());
        if !(on_default && !opts.is_bors(&push.pusher.name)) {
            debug!(branch = %branch, pusher = %push.pusher.name, "ignoring non-default branch");
            return Ok(());
        }
    }

    if count == 0 {
        if push.deleted {
            ctx.notify(
                opts.channel.as_str(),
                format!(
                    "{repo}{pusher} {} branch {}",
                    paint(Color::Maroon, "deleted"),
                    paint(Color::Purple, &branch)
                ),
            );
            return Ok(());
        }

        if push.created {
            let mut suffix = String::new();
            if let Some(base_ref) = &push.base_ref {
                if base_ref == &push.git_ref {
                    if let Some(noise) = &opts.noise_channel {
                        ctx.notify(
                            noise.as_str(),
                            format!("empty github branch creation based on itself: {}", push.repository.name),
                        );
                    }
                }
                suffix = format!(" based on {}", paint(Color::Purple, branch_name(base_ref)));
            }
            let link = opts.link(ctx, &push.compare).await?;
            ctx.notify(
                opts.channel.as_str(),
                format!(
                    "{repo}{pusher} {} branch {}{suffix}: {link}",
                    bold("created"),
                    paint(Color::Purple, &branch)
                ),
            );
            return Ok(());
        }

        if push.forced {
            let range = push.compare.rsplit('/').next().unwrap_or_default();
            let Some((previous, current)) = range.split_once("...") else {
                let message = format!("Unexpected compare URL {}", push.compare);
                return Err(ctx.cancel_as_malformed(Some(&message)).into());
            };
            ctx.notify(
                opts.channel.as_str(),
                format!(
                    "{repo}{pusher} {} {} to {} (was {})",
                    paint(Color::Red, "force-reverted"),
                    paint(Color::Purple, &branch),
                    short_sha(current),
                    short_sha(previous)
                ),
            );
            return Ok(());
        }
    }

    // merges are summarized without listing commits
    if let Some(base_ref) = &push.base_ref {
        let merged = count.saturating_sub(1);
        let link = opts.link(ctx, &push.compare).await?;
        ctx.notify(
            opts.channel.as_str(),
            format!(
                "{repo}{pusher} merged {merged} {} from {} into {}: {link}",
                commits_noun(merged),
                paint(Color::Purple, branch_name(base_ref)),
                paint(Color::Purple, &branch)
            ),
        );
        return Ok(());
    }

    if opts.is_bors(&push.pusher.name) {
        if let Some(last) = push.commits.last() {
            let re = compiled(&BORS_MERGE)?;
            if let Some(caps) = re.captures(&last.message).filter(|_| opts.is_bors(&last.committer.name)) {
                let number = &caps[1];
                let pull_url = format!("{}/pull/{number}", push.repository.html_url);
                let merged = count - 1;
                let link = opts.link(ctx, &pull_url).await?;
                ctx.notify(
                    opts.channel.as_str(),
                    format!(
                        "{repo}{pusher} merged {merged} {} into {} from PR {}: {} {link}",
                        commits_noun(merged),
                        paint(Color::Purple, &branch),
                        bold(format!("#{number}")),
                        ctx.trim_text(Some(&caps[2]), 140)
                    ),
                );
                return Ok(());
            }
        }
    }

    if push.created {
        let link = opts.link(ctx, &push.compare).await?;
        ctx.notify(
            opts.channel.as_str(),
            format!(
                "{repo}{pusher} created {} with {} new {}: {link}",
                paint(Color::Purple, &branch),
                bold(count),
                commits_noun(count)
            ),
        );
    } else if let [commit] = push.commits.as_slice() {
        let link = opts.link(ctx, &push.compare).await?;
        ctx.notify(
            opts.channel.as_str(),
            format!(
                "{repo}{pusher} {verb} to {}: {}{}: {}\x0F {link}",
                paint(Color::Purple, &branch),
                short_sha(&commit.id),
                commit.committer_suffix(&push.pusher.name),
                ctx.trim_text(Some(&commit.message), opts.commit_message_length)
            ),
        );
        return Ok(());
    } else {
        let link = opts.link(ctx, &push.compare).await?;
        ctx.notify(
            opts.channel.as_str(),
            format!(
                "{repo}{pusher} {verb} {} new {} to {}: {link}",
                bold(count),
                commits_noun(count),
                paint(Color::Purple, &branch)
            ),
        );
    }

    for commit in push.commits.iter().take(opts.max_commits) {
        ctx.pace().await;
        ctx.notify(
            opts.channel.as_str(),
            format!(
                " {}/{} {}{}: {}",
                paint(Color::Pink, &push.repository.name),
                paint(Color::Purple, &branch),
                short_sha(&commit.id),
                commit.committer_suffix(&push.pusher.name),
                ctx.trim_text(Some(&commit.message), opts.commit_message_length)
            ),
        );
    }
    Ok(())
}
