use anyhow::{Context, Result};
use tokio::process::Command;

use crate::api::HttpBackend;
use crate::config::Config;

/// Run a shell command and return its trimmed stdout.
async fn run_secret_command(what: &str, cmd: &str) -> Result<String> {
    let output = Command::new("sh")
        .args(["-c", cmd])
        .output()
        .await
        .with_context(|| format!("failed to run {} command: {}", what, cmd))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} command failed: {}", what, stderr.trim());
    }

    let secret = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if secret.is_empty() {
        anyhow::bail!("{} command printed nothing: {}", what, cmd);
    }
    Ok(secret)
}

/// Retrieve the login password: run password_command if set, otherwise use plain password.
async fn get_password(config: &Config) -> Result<String> {
    if let Some(ref cmd) = config.auth.password_command {
        run_secret_command("password", cmd).await
    } else if let Some(ref pw) = config.auth.password {
        Ok(pw.clone())
    } else {
        anyhow::bail!("auth.username is set but neither password nor password_command is");
    }
}

/// Token obtained without talking to the server, if configured.
async fn configured_token(config: &Config) -> Result<Option<String>> {
    if let Some(token) = config.auth.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(Some(token.to_string()));
    }
    if let Some(ref cmd) = config.auth.token_command {
        return run_secret_command("token", cmd).await.map(Some);
    }
    Ok(None)
}

/// Produce a bearer token from the `[auth]` section.
pub async fn resolve_token(config: &Config) -> Result<String> {
    if let Some(token) = configured_token(config).await? {
        tracing::debug!("using configured token");
        return Ok(token);
    }

    let username = config.auth.username.as_deref().context(
        "no credentials configured: set auth.token, auth.token_command or auth.username",
    )?;
    let password = get_password(config).await?;
    let token = HttpBackend::login(
        &config.server_url,
        config.request_timeout(),
        username,
        &password,
    )
    .await
    .with_context(|| format!("login to {} as {} failed", config.server_url, username))?;
    tracing::info!(username, "logged in");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn with_auth(auth: AuthConfig) -> Config {
        Config {
            auth,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn plain_token_wins() {
        let cfg = with_auth(AuthConfig {
            token: Some("abc".into()),
            token_command: Some("echo other".into()),
            ..Default::default()
        });
        assert_eq!(configured_token(&cfg).await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn token_command_output_is_trimmed() {
        let cfg = with_auth(AuthConfig {
            token_command: Some("printf '  xyz\\n'".into()),
            ..Default::default()
        });
        assert_eq!(configured_token(&cfg).await.unwrap().as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let cfg = with_auth(AuthConfig {
            token_command: Some("echo boom >&2; exit 3".into()),
            ..Default::default()
        });
        let err = configured_token(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn empty_command_output_is_an_error() {
        assert!(run_secret_command("token", "true").await.is_err());
    }

    #[tokio::test]
    async fn password_command_preferred() {
        let cfg = with_auth(AuthConfig {
            username: Some("admin".into()),
            password: Some("plain".into()),
            password_command: Some("echo secret".into()),
            ..Default::default()
        });
        assert_eq!(get_password(&cfg).await.unwrap(), "secret");
    }

    #[tokio::test]
    async fn no_password_configured() {
        let cfg = with_auth(AuthConfig {
            username: Some("admin".into()),
            ..Default::default()
        });
        assert!(get_password(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn nothing_configured() {
        let err = resolve_token(&Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("no credentials configured"));
    }
}
