//! hookrelay dispatch harness
//!
//! Takes a handler id and a [`NormalizedRequest`](ingest::NormalizedRequest),
//! runs the matching [`HookHandler`] inside a fresh [`HookContext`] and
//! renders one [`HookResult`], whatever the handler did.
//!
//! ## Outcomes
//!
//! | Handler did | `dispatch` returns |
//! |-------------|--------------------|
//! | returned normally | `Ok(HookResult::Delivered(..))` with every notification, in order |
//! | `cancel_as_unrecognizable` / `cancel_as_malformed` | `Ok(HookResult::Rejected { .. })`, notifications dropped |
//! | anything else | `Err(DispatchError::HandlerCrashed { .. })` |
//!
//! Unknown handler ids behave like a handler that immediately cancels as
//! unrecognizable.
//!
//! ## Example
//!
//! ```
//! use async_trait::async_trait;
//! use dispatch::{DispatchConfig, Dispatcher, HandlerTable, HookContext, HookFailure, HookHandler, Services};
//! use ingest::{normalize, IngestConfig, NormalizedRequest, RawHook};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl HookHandler for Hello {
//!     fn name(&self) -> &str { "hello" }
//!     async fn handle(&self, ctx: &mut HookContext, hook: &NormalizedRequest) -> Result<(), HookFailure> {
//!         let Some(channel) = hook.parameters().non_empty("channel") else { return Ok(()) };
//!         ctx.notify(channel, "hello!");
//!         Ok(())
//!     }
//! }
//!
//! struct Table(Hello);
//! impl HandlerTable for Table {
//!     fn resolve(&self, id: &str) -> Option<&dyn HookHandler> {
//!         (id == "hello").then_some(&self.0 as &dyn HookHandler)
//!     }
//!     fn ids(&self) -> Vec<&str> { vec!["hello"] }
//! }
//!
//! # tokio_test_block(async {
//! let dispatcher = Dispatcher::new(Table(Hello), Services::offline(), DispatchConfig::default());
//! let hook = normalize(RawHook {
//!     hook_flavor: "demo".into(),
//!     hook_id: "1".into(),
//!     received_at: "2024-01-01T00:00:00Z".into(),
//!     parameters: vec![("channel".into(), "#general".into())],
//!     payload: "{}".into(),
//!     payload_type: "application/json".into(),
//!     ..Default::default()
//! }, &IngestConfig::default()).unwrap();
//!
//! let result = dispatcher.dispatch("hello", &hook).await.unwrap();
//! assert_eq!(result.notifications()[0].channel, "#general");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod config;
mod context;
mod dispatcher;
mod error;
mod handler;
mod result;
mod services;
mod text;

pub use crate::config::{DispatchConfig, DispatchConfigError, ShortenerConfig};
pub use crate::context::{Abort, Cancelled, HookContext, HookFailure, Notification};
pub use crate::dispatcher::Dispatcher;
pub use crate::error::{CollaboratorError, DispatchError};
pub use crate::handler::{HandlerTable, HookHandler};
pub use crate::result::{HookResult, RESULT_SOURCE};
pub use crate::services::{AuxFetcher, HttpFetcher, HttpShortener, NoFetch, Passthrough, Services, UrlShortener};
pub use crate::text::{trim_text, PLACEHOLDER};
