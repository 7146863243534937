//! Subcommand execution
//!
//! Every backend call goes through [`Gateway::execute`], so an expired
//! access token is refreshed transparently no matter which subcommand runs.

use std::sync::Arc;

use anyhow::Context;
use console_auth::FileCredentialStore;
use console_gateway::{ApiRequest, ApiResponse, Gateway, GatewayConfig, GatewayError, HttpIssuer};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use crate::cli::Command;
use crate::config::Config;
use crate::error::CliError;
use crate::resources::{CURRENT_USER_PATH, SYNC_NOW_PATH, last_sync_path};

/// Exit code for a session that could not be recovered; the user must log in again.
pub const EXIT_UNAUTHORIZED: i32 = 2;

/// Result of a subcommand, printed to stdout.
#[derive(Debug)]
pub enum Outcome {
    /// Local result that did not come from an API response.
    Message(Value),
    /// Backend response, successful or not.
    Response(ApiResponse),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Message(_) => 0,
            Outcome::Response(response) if response.is_success() => 0,
            Outcome::Response(_) => 1,
        }
    }

    /// JSON bodies are pretty-printed; anything else is shown as text.
    pub fn render(&self) -> String {
        match self {
            Outcome::Message(value) => pretty(value),
            Outcome::Response(response) => match response.json::<Value>() {
                Ok(value) => pretty(&value),
                Err(_) => response.text(),
            },
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Wire the HTTP issuer and the on-disk credential store into a gateway.
pub async fn build_gateway(config: &Config) -> anyhow::Result<Gateway> {
    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let issuer = HttpIssuer::new(client, config.api.base_url.clone(), config.api.timeout());

    let path = &config.session.credentials_path;
    let store = FileCredentialStore::open(path.clone())
        .await
        .with_context(|| format!("failed to open credential store {}", path.display()))?;

    Ok(Gateway::new(
        Arc::new(issuer),
        Arc::new(store),
        GatewayConfig {
            refresh_timeout: config.api.refresh_timeout(),
        },
    ))
}

pub async fn run(command: Command, gateway: &Gateway) -> anyhow::Result<Outcome> {
    match command {
        Command::Login { email, password } => {
            let password = password.ok_or(CliError::MissingPassword)?;
            gateway.login(&email, password.expose()).await?;
            Ok(Outcome::Message(json!({ "logged_in": true, "email": email })))
        }
        Command::Logout => {
            gateway.logout().await?;
            Ok(Outcome::Message(json!({ "logged_in": false })))
        }
        Command::Status => Ok(Outcome::Message(
            json!({ "logged_in": gateway.is_logged_in().await }),
        )),
        Command::Me => execute(gateway, ApiRequest::get(CURRENT_USER_PATH)).await,
        Command::List {
            resource,
            paging,
            sync_type,
        } => {
            let path = resource.list_path(&paging.into(), sync_type.as_deref())?;
            execute(gateway, ApiRequest::get(path)).await
        }
        Command::Get {
            resource,
            id,
            page,
            limit,
        } => {
            let path = resource.detail_path(&id, page, limit)?;
            execute(gateway, ApiRequest::get(path)).await
        }
        Command::LastSync { sync_type } => {
            execute(gateway, ApiRequest::get(last_sync_path(&sync_type))).await
        }
        Command::SyncNow { sync_type } => {
            let request = ApiRequest::post(SYNC_NOW_PATH).with_body(json!({ "type": sync_type }));
            execute(gateway, request).await
        }
        Command::Request { method, path, body } => {
            let request = raw_request(&method, path, body.as_deref())?;
            execute(gateway, request).await
        }
    }
}

async fn execute(gateway: &Gateway, request: ApiRequest) -> anyhow::Result<Outcome> {
    debug!(method = %request.method, path = %request.path, "executing");
    let response = gateway.execute(&request).await?;
    Ok(Outcome::Response(response))
}

fn raw_request(method: &str, path: String, body: Option<&str>) -> Result<ApiRequest, CliError> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidMethod(method.to_string()))?;
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };

    let mut request = ApiRequest::new(method, path);
    if let Some(body) = body {
        let value: Value =
            serde_json::from_str(body).map_err(|e| CliError::InvalidBody(e.to_string()))?;
        request = request.with_body(value);
    }
    Ok(request)
}

/// Map a failed command to a process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GatewayError>() {
        Some(gateway_err) if gateway_err.is_unauthorized() => EXIT_UNAUTHORIZED,
        _ => 1,
    }
}
