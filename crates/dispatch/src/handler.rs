//! Handler and registry seams.
use async_trait::async_trait;

use crate::context::{HookContext, HookFailure};
use ingest::NormalizedRequest;

/// Formatting logic for one webhook sender.
///
/// Implementations read the request, call [`HookContext::notify`] any number
/// of times and return `Ok(())`. To stop early they return the signal from a
/// `cancel_as_*` call; any other error is treated as a crash.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest)
        -> Result<(), HookFailure>;
}

/// Read-only lookup from handler id to handler.
pub trait HandlerTable: Send + Sync {
    fn resolve(&self, id: &str) -> Option<&dyn HookHandler>;

    /// Every id this table resolves.
    fn ids(&self) -> Vec<&str>;
}

/// Stand-in for ids the table does not know.
pub(crate) struct Unavailable<'a> {
    pub(crate) id: &'a str,
}

#[async_trait]
impl HookHandler for Unavailable<'_> {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn handle(&self, ctx: &mut HookContext, _hook: &NormalizedRequest) -> Result<(), HookFailure> {
        let message = format!("Handler {} is not available", self.id);
        Err(ctx.cancel_as_unrecognizable(Some(&message)).into())
    }
}
