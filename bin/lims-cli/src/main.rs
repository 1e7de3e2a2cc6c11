//! LIMS Console Request CLI
//!
//! Sends one authenticated request through the bridge and prints the result.
//!
//! ```text
//! lims-cli /api/samples --data '{"sample_id":"S1","batch_id":"B1"}'
//! lims-cli /api/samples --param organization_id=org-1
//! lims-cli /api/transfers/T1 --delete
//! lims-cli /api/coa/C1/pdf --output coa.pdf
//! ```
//!
//! Identity comes from configuration: a refresh token (`LIMS_AUTH_REFRESH_TOKEN`)
//! is exchanged at the secure-token endpoint, a pre-minted token
//! (`LIMS_ID_TOKEN`) is used as-is, otherwise the request is sent signed out.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info, warn};

use lims_bridge::{
    Bridge, BridgeConfig, BridgeResponse, CookieJar, IdentityProvider, RefreshTokenIdentity,
    RequestDescriptor, RequestOptions, Session, StaticIdentity,
};
use lims_common::logging::{init_logging_with, LogFormat};
use lims_common::Envelope;
use lims_config::{AppConfig, ConfigLoader};

#[derive(Parser, Debug)]
#[command(name = "lims-cli")]
#[command(about = "Send an authenticated request to the LIMS console backend")]
struct Args {
    /// Endpoint path relative to the configured origin, or an absolute URL
    endpoint: String,

    /// JSON payload; its presence makes the request a POST
    #[arg(long, short = 'd')]
    data: Option<String>,

    /// Send the request as DELETE
    #[arg(long)]
    delete: bool,

    /// Query parameter as key=value, repeatable; replaces the endpoint's query string
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Write the raw response body to this file instead of parsing JSON
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Cookie header to seed the cookie store with, e.g. "sessionid=..; csrftoken=.."
    #[arg(long, env = "LIMS_COOKIE")]
    cookie: Option<String>,

    /// CSRF token, stored under the configured CSRF cookie name
    #[arg(long, env = "LIMS_CSRF_TOKEN")]
    csrf_token: Option<String>,

    /// Configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the configured origin
    #[arg(long)]
    origin: Option<String>,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("parameter name is empty in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (for local development)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<lims_bridge::Error>() {
                Some(bridge_error) => {
                    error!(error = %bridge_error, "Request failed");
                    eprintln!("{}", bridge_error.user_message());
                    eprintln!("  caused by: {bridge_error}");
                }
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(origin) = &args.origin {
        config.api.origin = origin.clone();
        config.validate()?;
    }

    init_logging_with(
        "lims-cli",
        LogFormat::parse(&config.logging.format),
        &config.logging.filter,
    );

    let bridge = build_bridge(&config, &args)?;
    let descriptor = build_descriptor(&args)?;

    info!(
        endpoint = %descriptor.endpoint,
        method = %descriptor.method(),
        "Issuing request"
    );

    let response = bridge.auth_request(descriptor).await?;
    emit(response, args.output.as_deref()).await
}

/// Print a JSON response or save a raw one.
///
/// A raw body is written to `output` only after its status checks out, so an
/// error page never replaces an existing file.
async fn emit(response: BridgeResponse, output: Option<&Path>) -> Result<()> {
    match response {
        BridgeResponse::Json(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            check_envelope(&value)?;
        }
        BridgeResponse::Raw(raw) => match output {
            Some(path) => {
                let raw = raw.error_for_status()?;
                tokio::fs::write(path, &raw.body)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(
                    path = %path.display(),
                    bytes = raw.body.len(),
                    status = %raw.status,
                    "Response body written"
                );
            }
            None => {
                warn!(status = %raw.status, "Response is not JSON");
                println!("{}", raw.text());
                raw.error_for_status()?;
            }
        },
    }

    Ok(())
}

fn build_bridge(config: &AppConfig, args: &Args) -> Result<Bridge> {
    let mut bridge_config = BridgeConfig::new(&config.api.origin)?
        .with_csrf_cookie(config.api.csrf_cookie_name.clone())
        .with_user_agent(config.api.user_agent.clone());

    let mut http = reqwest::Client::builder().user_agent(&config.api.user_agent);
    if let Some(ms) = config.api.timeout_ms {
        let timeout = Duration::from_millis(ms);
        bridge_config = bridge_config.with_timeout(timeout);
        http = http.timeout(timeout);
    }
    let http = http.build()?;

    let auth = &config.auth;
    let identity: Arc<dyn IdentityProvider> = match (&auth.refresh_token, &auth.id_token) {
        (Some(refresh_token), _) => {
            info!("Using refresh-token identity");
            Arc::new(RefreshTokenIdentity::new(
                &auth.token_url,
                &auth.api_key,
                refresh_token.clone(),
                http.clone(),
            )?)
        }
        (None, Some(token)) => {
            info!("Using configured identity token");
            Arc::new(StaticIdentity::new(token.clone()))
        }
        (None, None) => {
            warn!("No identity configured, sending request signed out");
            Arc::new(StaticIdentity::anonymous())
        }
    };

    let cookies = CookieJar::from_header(args.cookie.as_deref().unwrap_or_default());
    if let Some(token) = &args.csrf_token {
        cookies.set(config.api.csrf_cookie_name.clone(), token.clone());
    }

    let session = Session::new(identity, Arc::new(cookies));
    Ok(Bridge::with_http_client(bridge_config, session, http))
}

fn build_descriptor(args: &Args) -> Result<RequestDescriptor> {
    let mut options = RequestOptions::new();
    if args.delete {
        options = options.delete();
    }
    if args.output.is_some() {
        options = options.file();
    }
    if !args.params.is_empty() {
        options = options.params(args.params.iter().cloned());
    }

    let mut descriptor = RequestDescriptor::new(args.endpoint.clone()).with_options(options);
    if let Some(data) = &args.data {
        let payload: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        descriptor = descriptor.with_payload(payload);
    }

    Ok(descriptor)
}

/// Fail on `success: false` so scripts can rely on the exit code
fn check_envelope(value: &Value) -> Result<()> {
    if value.get("success").is_none() {
        return Ok(());
    }
    let envelope: Envelope = serde_json::from_value(value.clone())?;
    if envelope.is_failure() {
        bail!(lims_bridge::Error::Application {
            message: envelope.failure_message(),
        });
    }
    Ok(())
}
