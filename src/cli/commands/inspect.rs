//! cli::commands::inspect
//!
//! Read-only commands: layout, path, repos, branches.

use anyhow::{Context as _, Result};
use serde_json::json;

use super::{credentials, forge, print_json, runtime};
use crate::auth::{Credential, CredentialSource};
use crate::cli::Context;
use crate::core::paths::build_path;
use crate::core::types::{ArtifactKind, LayoutKind, RepositoryRef, SorContext};
use crate::engine::{self, EngineError};
use crate::forge::ContentApi;

async fn require_credential(ctx: &Context) -> Result<Credential> {
    let source = credentials(ctx)?;
    source
        .credential()
        .await?
        .ok_or(EngineError::Unauthenticated)
        .with_context(|| format!("Run 'sorpush auth token' or set {}", super::TOKEN_ENV))
}

/// Resolve and print the layout of a SOR.
pub fn layout(ctx: &Context, repo: &RepositoryRef, sor: &str) -> Result<()> {
    let forge = forge(ctx)?;
    let rt = runtime()?;
    let layout = rt.block_on(async {
        let cred = require_credential(ctx).await?;
        Ok::<_, anyhow::Error>(engine::resolve_layout(&forge, &cred, repo, sor).await?)
    })?;

    if ctx.quiet {
        println!("{}", layout);
        Ok(())
    } else {
        print_json(&json!({ "repository": repo.to_string(), "sor": sor, "layout": layout }))
    }
}

/// Print the destination path for an artifact. Makes no remote call.
pub fn path(sor: &str, feed: &str, kind: ArtifactKind, layout: LayoutKind) -> Result<()> {
    let ctx = SorContext::new(sor, feed, kind)?;
    println!("{}", build_path(&ctx, layout));
    Ok(())
}

/// List repositories the user can push to.
pub fn repos(ctx: &Context) -> Result<()> {
    let forge = forge(ctx)?;
    let rt = runtime()?;
    let repos = rt.block_on(async {
        let cred = require_credential(ctx).await?;
        forge
            .list_repositories(&cred)
            .await
            .context("Failed to list repositories")
    })?;

    if ctx.quiet {
        for repo in &repos {
            println!("{}/{}", repo.owner, repo.name);
        }
        Ok(())
    } else {
        print_json(&repos)
    }
}

/// List branch names.
pub fn branches(ctx: &Context, repo: &RepositoryRef) -> Result<()> {
    let forge = forge(ctx)?;
    let rt = runtime()?;
    let names = rt.block_on(async {
        let cred = require_credential(ctx).await?;
        forge
            .list_branches(&cred, repo)
            .await
            .with_context(|| format!("Failed to list branches of {}", repo))
    })?;

    if ctx.quiet {
        for name in &names {
            println!("{}", name);
        }
        Ok(())
    } else {
        print_json(&names)
    }
}
