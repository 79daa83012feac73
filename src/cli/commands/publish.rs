//! cli::commands::publish
//!
//! Branch, push, add, update, merge and JSON request handlers. Each one
//! builds an [`Operation`] and hands it to [`engine::dispatch`].
//!
//! On success the outcome is printed to stdout as JSON. On failure an
//! `{"kind", "message"}` object is printed instead and the command exits
//! non-zero.

use std::path::Path;

use anyhow::{anyhow, Context as _, Result};

use super::{credentials, forge, print_json, read_input, runtime};
use crate::cli::Context;
use crate::engine::{self, EngineError, Operation, OperationFailure};

/// Run one operation against GitHub.
pub fn execute(ctx: &Context, operation: Operation) -> Result<()> {
    let forge = forge(ctx)?;
    let credentials = credentials(ctx)?;
    let rt = runtime()?;

    match rt.block_on(engine::dispatch(&forge, credentials.as_ref(), operation)) {
        Ok(outcome) => print_json(&outcome),
        Err(err) => {
            print_json(&OperationFailure::from(&err))?;
            Err(describe_failure(err))
        }
    }
}

/// Run an operation read from a JSON file or stdin.
pub fn run_request(ctx: &Context, request: &Path) -> Result<()> {
    let body = read_input(request)?;
    let operation: Operation =
        serde_json::from_slice(&body).context("Request is not a valid operation")?;
    execute(ctx, operation)
}

fn describe_failure(err: EngineError) -> anyhow::Error {
    match err {
        EngineError::Unauthenticated => anyhow!(
            "{}. Run 'sorpush auth token' or set {}.",
            err,
            super::TOKEN_ENV
        ),
        err if err.is_transient() => {
            anyhow::Error::new(err).context("Operation failed; it is safe to retry")
        }
        err => anyhow::Error::new(err),
    }
}
