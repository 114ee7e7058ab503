//! Bulk edits: applying a batch of actions on sub-resources of an endpoint
//!
//! A bulk edit is a PATCH request whose body is a list of actions
//!
//! ```json
//! [
//!   { "action": "create", "value": { "flerbies": 1 } },
//!   { "action": "update", "url": "/flobbits/1/", "value": { "flerbies": 2 } },
//!   { "action": "delete", "url": "/flobbits/2/" }
//! ]
//! ```
//!
//! Every action is [validated](`validate`) before anything is applied. Actions are then applied
//! in order inside a single transaction, each by [invoking](`invoke`) the endpoint serving the
//! action URL with a synthetic request, exactly as if the client had called it directly. Either
//! every action is applied, or none is.
//!
//! ```rust
//! use bulkedit::app::App;
//! use bulkedit::bulk::BulkEdit;
//! use bulkedit::endpoint::View;
//! use bulkedit::routing::Router;
//! use bulkedit::store::Store;
//!
//! let store = Store::default();
//! let router = Router::new()
//!     .endpoint("/flobbits/", View::new().post(|| ()).bulk_edit(BulkEdit::new()))
//!     .endpoint("/flobbits/{flobbit_id}/", View::new().put(|| ()).delete(|| ()));
//!
//! let app = App::new(router).transactions(store);
//! ```
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{Error, ErrorKind};
use crate::request::Request;
use crate::response::{ActionOutcome, Response};
use crate::result::Result;
use crate::store::atomic;

mod action;
mod invoke;
mod target;

pub use action::*;
pub use invoke::*;
pub use target::*;

/// Compute the status summarizing a batch outcome
///
/// Returns `None` if every status is acceptable. Otherwise the batch failed and the result is
/// the unacceptable status if there is only one, 400 if all unacceptable statuses are client
/// errors and 500 in any other case.
pub fn aggregate_status(statuses: &[u16], acceptable: &BTreeSet<u16>) -> Option<u16> {
    let errors: BTreeSet<u16> = statuses
        .iter()
        .copied()
        .filter(|status| !acceptable.contains(status))
        .collect();

    match errors.len() {
        0 => None,
        1 => errors.first().copied(),
        _ if errors.iter().all(|status| *status < 500) => Some(400),
        _ => Some(500),
    }
}

/// The bulk edit entry point of an endpoint
///
/// See the [module documentation](`self`) for the request format. Install it on a view with
/// [`View::bulk_edit`](`crate::endpoint::View::bulk_edit`).
#[derive(Clone)]
pub struct BulkEdit {
    acceptable: BTreeSet<u16>,
    policy: Arc<dyn Containment>,
}

impl Default for BulkEdit {
    fn default() -> Self {
        Self {
            acceptable: (200..400).collect(),
            policy: Arc::new(SubResource),
        }
    }
}

impl BulkEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statuses an action may finish with for the batch to succeed
    ///
    /// Defaults to every status in the 200-399 range.
    pub fn only_statuses<I: IntoIterator<Item = u16>>(self, statuses: I) -> Self {
        Self {
            acceptable: statuses.into_iter().collect(),
            ..self
        }
    }

    /// Set the policy deciding which targets may be edited
    ///
    /// Defaults to [`SubResource`].
    pub fn policy<C: Containment>(self, policy: C) -> Self {
        Self {
            policy: Arc::new(policy),
            ..self
        }
    }

    pub fn acceptable(&self) -> &BTreeSet<u16> {
        &self.acceptable
    }

    /// Validate every action of the batch
    ///
    /// Fails with the error of the first invalid action, the error detail includes the index of
    /// the action in the batch.
    pub fn validate(&self, raw: &Value, request: &Request) -> Result<Vec<Action>> {
        let items = raw.as_array().ok_or_else(|| {
            Error::field(
                ErrorKind::Schema,
                NON_FIELD_ERRORS,
                format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type(raw)
                ),
            )
        })?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                validate(item, request, self.policy.as_ref()).map_err(|err| {
                    let detail = json!({ "index": index, "errors": err.detail() });
                    err.with_detail(detail)
                })
            })
            .collect()
    }

    /// Validate and apply the batch
    ///
    /// Actions are applied in order within one transaction of the app transaction layer, the
    /// outcomes are returned in the same order. If any action finishes with an unacceptable
    /// status, the transaction is rolled back and the call fails with an aggregate error holding
    /// the body of every outcome.
    #[instrument(name = "bulk_edit", skip_all, fields(path = request.path()))]
    pub fn apply(&self, raw: &Value, request: &Request) -> Result<Vec<ActionOutcome>> {
        let actions = self
            .validate(raw, request)
            .inspect_err(|e| warn!("bulk edit rejected: {e}"))?;

        let layer = request.app().atomic().ok_or_else(|| {
            Error::new(
                ErrorKind::Transaction,
                "bulk edits require a transaction layer",
            )
        })?;

        debug!(actions = actions.len(), "applying bulk edit");
        atomic(layer, || {
            let outcomes = actions
                .iter()
                .map(|action| {
                    invoke(
                        &action.target,
                        action.kind.method(),
                        action.payload.as_ref(),
                        request,
                    )
                })
                .collect::<Result<Vec<_>>>()
                .inspect_err(|e| warn!("bulk edit aborted, rolling back: {e}"))?;

            let statuses: Vec<u16> = outcomes.iter().map(|o| o.status).collect();
            if let Some(status) = aggregate_status(&statuses, &self.acceptable) {
                warn!(status, ?statuses, "bulk edit failed, rolling back");
                return Err(Error::aggregate(
                    status,
                    outcomes.into_iter().map(|o| o.body).collect(),
                ));
            }

            Ok(outcomes)
        })
    }

    /// Serve a bulk edit request
    ///
    /// The request body is the list of actions. A successful batch is answered with 204 and no
    /// body.
    pub fn handle(&self, request: &Request) -> Result<Response> {
        let outcomes = self.apply(request.body(), request)?;
        debug!(actions = outcomes.len(), "bulk edit applied");
        Ok(Response::no_content())
    }
}

impl fmt::Debug for BulkEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkEdit")
            .field("acceptable", &self.acceptable)
            .finish_non_exhaustive()
    }
}
