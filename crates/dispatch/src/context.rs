//! Per-invocation execution context.
//!
//! A [`HookContext`] is the only way a handler produces output or stops
//! early. It is created right before a handler runs and consumed into a
//! [`HookResult`] right after.
//!
//! ```text
//!            notify()* ──────────────► Ok(())            ─► Delivered
//! handler ─┤
//!            cancel_as_*() ─► Err(Cancelled) ─► abort set ─► Rejected
//!          └ anything else ─► Err(Crashed)               ─► DispatchError
//! ```
use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CollaboratorError;
use crate::handler::HookHandler;
use crate::result::{HookResult, RESULT_SOURCE};
use crate::services::Services;
use crate::text::trim_text;
use ingest::NormalizedRequest;

/// One line of chat output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub channel: String,
    pub message: String,
}

/// Why a handler stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abort {
    /// The payload does not look like anything this handler understands.
    Unrecognizable(String),
    /// The payload is from the right sender but violates an expected
    /// invariant. Replaying it will not help.
    Malformed(String),
}

impl Abort {
    pub fn code(&self) -> &'static str {
        match self {
            Abort::Unrecognizable(_) => "hook-unrecognizable",
            Abort::Malformed(_) => "hook-malformed",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Abort::Unrecognizable(msg) | Abort::Malformed(msg) => msg,
        }
    }
}

/// Proof that a handler asked its context to abort.
///
/// Only [`HookContext::cancel_as_unrecognizable`] and
/// [`HookContext::cancel_as_malformed`] construct it, so returning one is
/// never confused with a crash.
#[derive(Debug, PartialEq, Eq)]
pub struct Cancelled {
    _private: (),
}

/// Everything a handler can return besides `Ok(())`.
#[derive(Debug)]
pub enum HookFailure {
    /// Intentional abort; the context holds the reason.
    Cancelled(Cancelled),
    /// Unexpected failure in handler logic or a collaborator.
    Crashed(anyhow::Error),
}

impl HookFailure {
    pub fn crash(message: impl fmt::Display) -> Self {
        HookFailure::Crashed(anyhow::anyhow!("{message}"))
    }
}

impl From<Cancelled> for HookFailure {
    fn from(c: Cancelled) -> Self {
        HookFailure::Cancelled(c)
    }
}

impl From<anyhow::Error> for HookFailure {
    fn from(err: anyhow::Error) -> Self {
        HookFailure::Crashed(err)
    }
}

impl From<CollaboratorError> for HookFailure {
    fn from(err: CollaboratorError) -> Self {
        HookFailure::Crashed(err.into())
    }
}

impl From<serde_json::Error> for HookFailure {
    fn from(err: serde_json::Error) -> Self {
        HookFailure::Crashed(err.into())
    }
}

/// Mutable state scoped to one handler invocation.
pub struct HookContext {
    notifications: Vec<Notification>,
    abort: Option<Abort>,
    services: Services,
    pacing: Duration,
}

impl HookContext {
    pub(crate) fn new(services: Services, pacing: Duration) -> Self {
        Self {
            notifications: Vec::new(),
            abort: None,
            services,
            pacing,
        }
    }

    /// Appends a notification. Neither field is validated.
    pub fn notify(&mut self, channel: impl Into<String>, message: impl Into<String>) {
        self.notifications.push(Notification {
            channel: channel.into(),
            message: message.into(),
        });
    }

    /// Marks the hook as not applicable to this handler.
    ///
    /// Return the signal right away: `return Err(ctx.cancel_as_unrecognizable(None).into())`.
    pub fn cancel_as_unrecognizable(&mut self, message: Option<&str>) -> Cancelled {
        self.record(Abort::Unrecognizable(
            message.unwrap_or("Unrecognizable").to_string(),
        ))
    }

    /// Marks the hook as coming from the right sender but unusable.
    pub fn cancel_as_malformed(&mut self, message: Option<&str>) -> Cancelled {
        self.record(Abort::Malformed(message.unwrap_or("Malformed").to_string()))
    }

    fn record(&mut self, abort: Abort) -> Cancelled {
        // first abort wins; the handler should have left after it
        if self.abort.is_none() {
            self.abort = Some(abort);
        }
        Cancelled { _private: () }
    }

    pub fn abort(&self) -> Option<&Abort> {
        self.abort.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Shortens a link through the configured collaborator. Failure is a crash.
    pub async fn shorten_url(&self, url: &str) -> Result<String, HookFailure> {
        Ok(self.services.shortener.shorten(url).await?)
    }

    pub async fn fetch_json(&self, url: &str) -> Result<Value, HookFailure> {
        Ok(self.services.fetcher.get_json(url).await?)
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, HookFailure> {
        Ok(self.services.fetcher.get_text(url).await?)
    }

    /// See [`trim_text`].
    pub fn trim_text(&self, text: Option<&str>, max_len: usize) -> String {
        trim_text(text, max_len)
    }

    /// Waits the configured pacing delay before a follow-up line.
    pub async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }

    /// Reads a payload value as `T`, aborting as malformed when it does not
    /// fit.
    pub fn narrow<T: DeserializeOwned>(&mut self, value: &Value) -> Result<T, HookFailure> {
        match T::deserialize(value) {
            Ok(value) => Ok(value),
            Err(err) => {
                let message = format!("Unexpected payload shape: {err}");
                Err(self.cancel_as_malformed(Some(&message)).into())
            }
        }
    }

    /// Runs `handler` to completion. Aborts are absorbed; crashes are handed
    /// back untouched.
    pub(crate) async fn process(
        &mut self,
        handler: &dyn HookHandler,
        hook: &NormalizedRequest,
    ) -> Result<(), anyhow::Error> {
        match handler.handle(self, hook).await {
            Ok(()) => Ok(()),
            Err(HookFailure::Cancelled(_)) if self.abort.is_some() => Ok(()),
            Err(HookFailure::Cancelled(_)) => Err(anyhow::anyhow!(
                "cancel signal returned without a recorded abort"
            )),
            Err(HookFailure::Crashed(err)) => Err(err),
        }
    }

    /// Folds the context into its uniform result.
    pub fn into_result(self) -> HookResult {
        match self.abort {
            Some(abort) => HookResult::Rejected {
                code: abort.code().to_string(),
                source: RESULT_SOURCE.to_string(),
                message: abort.message().to_string(),
            },
            None => HookResult::Delivered(self.notifications),
        }
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("notifications", &self.notifications.len())
            .field("abort", &self.abort)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HookContext {
        HookContext::new(Services::offline(), Duration::ZERO)
    }

    #[test]
    fn notifications_kept_in_call_order() {
        let mut ctx = ctx();
        ctx.notify("#a", "one");
        ctx.notify("#b", "two");
        ctx.notify("#a", "three");
        let messages: Vec<_> = ctx.notifications().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two", "three"]);
    }

    #[test]
    fn cancel_defaults_and_first_abort_wins() {
        let mut ctx = ctx();
        let _ = ctx.cancel_as_malformed(None);
        let _ = ctx.cancel_as_unrecognizable(Some("later"));
        assert_eq!(ctx.abort(), Some(&Abort::Malformed("Malformed".into())));

        let mut other = self::ctx();
        let _ = other.cancel_as_unrecognizable(None);
        assert_eq!(other.abort().map(Abort::code), Some("hook-unrecognizable"));
        assert_eq!(other.abort().map(Abort::message), Some("Unrecognizable"));
    }

    #[test]
    fn abort_result_hides_notifications() {
        let mut ctx = ctx();
        ctx.notify("#a", "before");
        let _ = ctx.cancel_as_malformed(Some("bad signature"));
        assert_eq!(ctx.notifications().len(), 1);
        assert_eq!(
            ctx.into_result(),
            HookResult::Rejected {
                code: "hook-malformed".into(),
                source: RESULT_SOURCE.into(),
                message: "bad signature".into(),
            }
        );
    }

    #[test]
    fn narrow_mismatch_aborts_as_malformed() {
        #[derive(serde::Deserialize)]
        struct Shape {
            #[allow(dead_code)]
            state: String,
        }

        let mut ctx = ctx();
        let ok: Result<Shape, _> = ctx.narrow(&serde_json::json!({"state": "ok"}));
        assert!(ok.is_ok());
        assert!(ctx.abort().is_none());

        let bad: Result<Shape, _> = ctx.narrow(&serde_json::json!({"state": 3}));
        assert!(matches!(bad, Err(HookFailure::Cancelled(_))));
        assert!(matches!(ctx.abort(), Some(Abort::Malformed(msg)) if msg.starts_with("Unexpected payload shape")));
    }

    #[tokio::test]
    async fn offline_shortener_passes_through() {
        let ctx = ctx();
        assert_eq!(ctx.shorten_url("https://x.test").await.unwrap(), "https://x.test");
        assert!(matches!(
            ctx.fetch_json("https://x.test").await,
            Err(HookFailure::Crashed(_))
        ));
    }
}
