//! cli::commands::auth
//!
//! Credential management: the OAuth web flow split into `url` and
//! `exchange`, plus direct token storage, status and logout.
//!
//! Tokens are never printed. Only success or failure is reported.
//!
//! ```bash
//! sorpush auth url --open
//! sorpush auth exchange --code <code> --state <state>
//! sorpush auth token            # prompts, input hidden
//! sorpush auth status -q        # authenticated | not_authenticated
//! sorpush auth logout
//! ```

use anyhow::{bail, Context as _, Result};

use super::{env_credential, runtime, stored_credential, TOKEN_ENV};
use crate::auth::{Credential, CredentialSource, OAuthClient, OAUTH_STATE_KEY};
use crate::cli::Context;
use crate::secrets::{self, SecretStore};

fn store(ctx: &Context) -> Result<Box<dyn SecretStore>> {
    secrets::create_store(ctx.config.secrets_provider())
        .context("Failed to initialize secret store")
}

fn oauth_client(ctx: &Context) -> Result<OAuthClient> {
    let config = ctx.config.oauth().context("OAuth is not configured")?;
    Ok(OAuthClient::new(config)?)
}

/// Print the authorization URL and remember the state it carries.
pub fn url(ctx: &Context, open: bool) -> Result<()> {
    let client = oauth_client(ctx)?;
    let state = OAuthClient::new_state();
    let url = client.authorization_url(&state)?;

    store(ctx)?
        .set(OAUTH_STATE_KEY, &state)
        .context("Failed to store OAuth state")?;

    println!("{}", url);
    if open {
        if let Err(err) = open::that(&url) {
            tracing::warn!(error = %err, "could not open a browser; visit the URL above");
        }
    }
    Ok(())
}

/// Exchange the callback code for a token and store it.
pub fn exchange(ctx: &Context, code: &str, state: &str) -> Result<()> {
    let client = oauth_client(ctx)?;
    let store = store(ctx)?;

    let expected = store
        .get(OAUTH_STATE_KEY)
        .context("Failed to read OAuth state")?;
    OAuthClient::verify_state(expected.as_deref(), state)
        .context("Run 'sorpush auth url' again to start a new sign-in")?;

    let rt = runtime()?;
    let credential = rt.block_on(client.exchange_code(code))?;

    stored_credential(ctx)?
        .save(&credential)
        .context("Failed to store token")?;
    store
        .delete(OAUTH_STATE_KEY)
        .context("Failed to clear OAuth state")?;

    tracing::info!("oauth sign-in complete");
    if !ctx.quiet {
        println!("Authenticated with GitHub.");
    }
    Ok(())
}

/// Store a personal access token, prompting with hidden input if none is given.
pub fn token(ctx: &Context, token: Option<String>) -> Result<()> {
    let raw = match token {
        Some(t) => t,
        None => {
            if ctx.quiet {
                bail!("Token required. Use --token <TOKEN> or run without --quiet.");
            }
            rpassword::prompt_password("GitHub token: ").context("Failed to read token")?
        }
    };
    let credential = Credential::new(raw)?;

    stored_credential(ctx)?
        .save(&credential)
        .context("Failed to store token")?;

    if !ctx.quiet {
        println!("Token stored.");
    }
    Ok(())
}

/// Report whether a credential is available and where it comes from.
pub fn status(ctx: &Context) -> Result<()> {
    let from_env = env_credential()?.is_some();
    let stored = if from_env {
        false
    } else {
        let source = stored_credential(ctx)?;
        runtime()?.block_on(source.credential())?.is_some()
    };

    if ctx.quiet {
        if from_env || stored {
            println!("authenticated");
        } else {
            println!("not_authenticated");
        }
    } else if from_env {
        println!("Authenticated via {}.", TOKEN_ENV);
    } else if stored {
        println!("Authenticated (stored token).");
    } else {
        println!("Not authenticated.");
        println!("Run 'sorpush auth url' or 'sorpush auth token' to authenticate.");
    }
    Ok(())
}

/// Remove the stored token and any pending OAuth state.
pub fn logout(ctx: &Context) -> Result<()> {
    stored_credential(ctx)?
        .clear()
        .context("Failed to remove stored token")?;
    store(ctx)?
        .delete(OAUTH_STATE_KEY)
        .context("Failed to clear OAuth state")?;

    if !ctx.quiet {
        println!("Logged out.");
        if env_credential()?.is_some() {
            println!("{} is still set and will be used.", TOKEN_ENV);
        }
    }
    Ok(())
}
