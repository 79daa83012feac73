//! cli::commands
//!
//! Command handlers.
//!
//! Async work runs on a runtime created per command; handlers stay
//! synchronous so `main` does not need to be async.

mod auth;
mod inspect;
mod publish;

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::args::{AuthAction, Command};
use super::Context;
use crate::auth::{Credential, CredentialSource, StaticCredential, StoredCredential};
use crate::engine::Operation;
use crate::forge::github::GitHubForge;
use crate::secrets;

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "SORPUSH_TOKEN";

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Auth { action } => match action {
            AuthAction::Url { open } => auth::url(ctx, open),
            AuthAction::Exchange { code, state } => auth::exchange(ctx, &code, &state),
            AuthAction::Token { token } => auth::token(ctx, token),
            AuthAction::Status => auth::status(ctx),
            AuthAction::Logout => auth::logout(ctx),
        },
        Command::Branch { repo, name } => publish::execute(
            ctx,
            Operation::CreateBranch {
                owner: repo.owner,
                repo: repo.name,
                branch_name: name,
            },
        ),
        Command::Push {
            repo,
            branch,
            sor,
            feed,
            kind,
            file,
            message,
        } => publish::execute(
            ctx,
            Operation::PushFile {
                owner: repo.owner,
                repo: repo.name,
                branch,
                sor,
                feed_name: feed,
                artifact_kind: kind.to_string(),
                content: read_input(&file)?,
                commit_message: message,
            },
        ),
        Command::Add {
            repo,
            branch,
            path,
            file,
            message,
        } => publish::execute(
            ctx,
            Operation::AddFile {
                owner: repo.owner,
                repo: repo.name,
                branch,
                path,
                content: read_input(&file)?,
                commit_message: message,
            },
        ),
        Command::Update {
            repo,
            branch,
            path,
            file,
            message,
            upsert,
        } => publish::execute(
            ctx,
            Operation::UpdateFile {
                owner: repo.owner,
                repo: repo.name,
                branch,
                path,
                content: read_input(&file)?,
                commit_message: message,
                upsert,
            },
        ),
        Command::Merge {
            repo,
            base,
            head,
            message,
        } => publish::execute(
            ctx,
            Operation::MergeBranch {
                owner: repo.owner,
                repo: repo.name,
                base,
                head,
                commit_message: message,
            },
        ),
        Command::Run { request } => publish::run_request(ctx, &request),
        Command::Layout { repo, sor } => inspect::layout(ctx, &repo, &sor),
        Command::Path {
            sor,
            feed,
            kind,
            layout,
        } => inspect::path(&sor, &feed, kind, layout),
        Command::Repos => inspect::repos(ctx),
        Command::Branches { repo } => inspect::branches(ctx, &repo),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn forge(ctx: &Context) -> Result<GitHubForge> {
    GitHubForge::new(
        ctx.config.api_base(),
        ctx.config.client_id(),
        ctx.config.timeout(),
    )
    .context("Failed to create GitHub client")
}

/// The token from `$SORPUSH_TOKEN`, if set and non-empty.
fn env_credential() -> Result<Option<Credential>> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(Some(
            Credential::new(token).with_context(|| format!("{} is not a usable token", TOKEN_ENV))?,
        )),
        _ => Ok(None),
    }
}

fn stored_credential(ctx: &Context) -> Result<StoredCredential> {
    let store = secrets::create_store(ctx.config.secrets_provider())
        .context("Failed to initialize secret store")?;
    Ok(StoredCredential::new(store))
}

/// `$SORPUSH_TOKEN` first, then the secret store.
fn credentials(ctx: &Context) -> Result<Box<dyn CredentialSource>> {
    if let Some(credential) = env_credential()? {
        tracing::debug!("using credential from {}", TOKEN_ENV);
        return Ok(Box::new(StaticCredential::new(Some(credential))));
    }
    Ok(Box::new(stored_credential(ctx)?))
}

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
