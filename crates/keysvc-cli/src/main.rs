//! `keysvc` CLI: command-line client for the `keysvc` credential service.
//!
//! A standalone HTTP client. No internal crate dependencies; it talks to the
//! server exclusively through the RPC-style key routes and the user bundle
//! routes. Exits `0` when the server reports `ok` (and, for validate calls,
//! the credential matched), `1` otherwise.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// keysvc: credential issuance and validation.
#[derive(Parser)]
#[command(
    name = "keysvc",
    version,
    about = "keysvc CLI: issue, read, and validate service credentials",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         KEYSVC_ADDR         Server address (default: http://127.0.0.1:3000)\n  \
         KEYSVC_SERVICE_KEY  Inter-service key (hooks or orchestrator)\n\n\
         {DIM}Examples:{RESET}\n  \
         keysvc status\n  \
         keysvc hooks create acme\n  \
         keysvc hooks validate acme --key KEY --secret SECRET\n  \
         keysvc bundle validate user42 KEY"
    ),
)]
struct Cli {
    /// keysvc server address.
    #[arg(long, env = "KEYSVC_ADDR", default_value = "http://127.0.0.1:3000")]
    addr: String,

    /// Service key presented on privileged calls.
    #[arg(long, env = "KEYSVC_SERVICE_KEY", hide_env_values = true)]
    service_key: Option<String>,

    /// Print the raw JSON reply instead of formatted output.
    #[arg(long, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is up.
    Status,
    /// Webhook integration key pairs, one per company.
    Hooks {
        #[command(subcommand)]
        action: HooksCommands,
    },
    /// Agent key pairs, one per company.
    Agent {
        #[command(subcommand)]
        action: AgentCommands,
    },
    /// User key pairs, one per user.
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Five-key user bundles.
    Bundle {
        #[command(subcommand)]
        action: BundleCommands,
    },
}

#[derive(Subcommand)]
enum HooksCommands {
    /// Issue a new key pair, replacing any existing one.
    Create { company_id: String },
    /// Show the current key (the secret is never shown again).
    Get { company_id: String },
    /// List every hooks key held by the company.
    List { company_id: String },
    /// Check a key and secret.
    Validate {
        company_id: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        secret: String,
    },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Issue a new key pair, replacing any existing one.
    Create { company_id: String },
    /// Show the current key (the secret is never shown again).
    Get { company_id: String },
    /// Check a key and secret.
    Validate {
        company_id: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        secret: String,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Issue a new key pair, replacing any existing one.
    Create { user_id: String },
    /// Check a key and secret.
    Validate {
        user_id: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        secret: String,
    },
}

#[derive(Subcommand)]
enum BundleCommands {
    /// Issue a fresh bundle.
    Create { user_id: String },
    /// Show the current bundle if it is still fresh.
    Get { user_id: String },
    /// Check whether a key belongs to the user's bundle. Needs no service key.
    Validate { user_id: String, key: String },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn field<'a>(resp: &'a Value, name: &str) -> &'a str {
    resp.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn print_json(value: &Value) {
    if value.is_null() {
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to format JSON: {e}"),
    }
}

// ── HTTP client ──────────────────────────────────────────────────────

struct Client {
    http: reqwest::Client,
    addr: String,
    service_key: Option<String>,
}

impl Client {
    fn new(addr: String, service_key: Option<String>) -> Self {
        let http = reqwest::Client::new();
        Self {
            http,
            addr: addr.trim_end_matches('/').to_owned(),
            service_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }

    fn service_key(&self) -> Result<&str> {
        self.service_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("no service key provided; set KEYSVC_SERVICE_KEY or use --service-key")
        })
    }

    async fn rpc(&self, method: &str, mut body: Value) -> Result<Value> {
        body["service_key"] = Value::String(self.service_key()?.to_owned());
        let resp = self
            .http
            .post(self.url(&format!("/key.v1.KeyService/{method}")))
            .json(&body)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn bundle(&self, method: reqwest::Method, user_id: &str) -> Result<Value> {
        let resp = self
            .http
            .request(method, self.url("/"))
            .header("X-User-ID", user_id)
            .header("X-Service-Key", self.service_key()?)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn validate_bundle(&self, user_id: &str, key: &str) -> Result<Value> {
        let mut url = reqwest::Url::parse(&self.addr).context("invalid server address")?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("server address cannot be a base URL"))?
            .pop_if_empty()
            .push("validate")
            .push(key);
        let resp = self
            .http
            .get(url)
            .header("X-User-ID", user_id)
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    async fn health(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }
}

/// Read a reply. Error statuses that still carry a JSON `status` are passed
/// through so the caller can report them.
async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.context("failed to read response body")?;
    match serde_json::from_str::<Value>(&body) {
        Ok(value) if value.get("status").is_some() => Ok(value),
        Ok(value) if status.is_success() => Ok(value),
        _ => bail!("server returned {status}: {body}"),
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = Client::new(cli.addr, cli.service_key);

    match run(&client, cli.command, cli.json).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

/// Run one command. Returns whether the outcome was a success.
async fn run(client: &Client, cmd: Commands, raw: bool) -> Result<bool> {
    let (title, resp) = match cmd {
        Commands::Status => ("Server Status", client.health().await?),
        Commands::Hooks { action } => match action {
            HooksCommands::Create { company_id } => (
                "Hooks Key Issued",
                client.rpc("CreateHookKeys", json!({ "company_id": company_id })).await?,
            ),
            HooksCommands::Get { company_id } => (
                "Hooks Key",
                client.rpc("GetHookKeys", json!({ "company_id": company_id })).await?,
            ),
            HooksCommands::List { company_id } => (
                "Hooks Keys",
                client
                    .rpc("GetHookKeysForCompany", json!({ "company_id": company_id }))
                    .await?,
            ),
            HooksCommands::Validate {
                company_id,
                key,
                secret,
            } => (
                "Hooks Key Validation",
                client
                    .rpc(
                        "ValidateHookKey",
                        json!({ "company_id": company_id, "key": key, "secret": secret }),
                    )
                    .await?,
            ),
        },
        Commands::Agent { action } => match action {
            AgentCommands::Create { company_id } => (
                "Agent Key Issued",
                client.rpc("CreateAgentKeys", json!({ "company_id": company_id })).await?,
            ),
            AgentCommands::Get { company_id } => (
                "Agent Key",
                client.rpc("GetAgentKeys", json!({ "company_id": company_id })).await?,
            ),
            AgentCommands::Validate {
                company_id,
                key,
                secret,
            } => (
                "Agent Key Validation",
                client
                    .rpc(
                        "ValidateAgentKey",
                        json!({ "company_id": company_id, "key": key, "secret": secret }),
                    )
                    .await?,
            ),
        },
        Commands::User { action } => match action {
            UserCommands::Create { user_id } => (
                "User Key Issued",
                client.rpc("CreateUserKeys", json!({ "user_id": user_id })).await?,
            ),
            UserCommands::Validate {
                user_id,
                key,
                secret,
            } => (
                "User Key Validation",
                client
                    .rpc(
                        "ValidateUserKeys",
                        json!({ "user_id": user_id, "key": key, "secret": secret }),
                    )
                    .await?,
            ),
        },
        Commands::Bundle { action } => match action {
            BundleCommands::Create { user_id } => (
                "Bundle Issued",
                client.bundle(reqwest::Method::POST, &user_id).await?,
            ),
            BundleCommands::Get { user_id } => (
                "Bundle",
                client.bundle(reqwest::Method::GET, &user_id).await?,
            ),
            BundleCommands::Validate { user_id, key } => (
                "Bundle Key Validation",
                client.validate_bundle(&user_id, &key).await?,
            ),
        },
    };

    let ok = outcome(&resp);
    if raw {
        print_json(&resp);
    } else {
        print_reply(title, &resp, ok);
    }
    Ok(ok)
}

/// `ok` status, and `valid` is not `false`.
fn outcome(resp: &Value) -> bool {
    field(resp, "status") == "ok" && resp.get("valid").and_then(Value::as_bool) != Some(false)
}

fn print_reply(title: &str, resp: &Value, ok: bool) {
    let status = field(resp, "status");
    if status != "ok" {
        warning(status);
        return;
    }

    header("🔑", title);
    if let Some(valid) = resp.get("valid").and_then(Value::as_bool) {
        let shown = if valid {
            format!("{GREEN}valid{RESET}")
        } else {
            format!("{RED}invalid{RESET}")
        };
        kv_line("Result", &shown);
    }
    for name in [
        "key",
        "secret",
        "user_service",
        "hooks_service",
        "company_service",
        "billing_service",
        "permissions",
    ] {
        let value = field(resp, name);
        if !value.is_empty() {
            kv_line(name, value);
        }
    }
    if let Some(generated) = resp.get("generated").and_then(Value::as_i64) {
        kv_line("generated", &generated.to_string());
    }
    if let Some(keys) = resp.get("keys").and_then(Value::as_array) {
        if keys.is_empty() {
            kv_line("keys", "none");
        }
        for entry in keys {
            kv_line(field(entry, "company_id"), field(entry, "key"));
        }
    }
    println!();

    if resp.get("secret").is_some() {
        warning("store the secret now; it cannot be retrieved again");
    } else if ok {
        success(status);
    }
}
