use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use regdesk::config::{ClientConfig, ConfigError};
use regdesk::net::{ApiClient, ApiError, RegisterRequest};
use regdesk::state::SessionStore;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "regdesk", about = "User registration API client")]
struct Cli {
    /// Overrides `API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `REQUEST_TIMEOUT_MS`.
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new account.
    Register(RegisterArgs),
    /// Fetch a user and print their profile and display name.
    User { user_id: String },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "REGDESK_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    nickname: String,
}

impl From<RegisterArgs> for RegisterRequest {
    fn from(args: RegisterArgs) -> Self {
        Self {
            username: args.username,
            email: args.email,
            password: args.password,
            phone: args.phone,
            nickname: args.nickname,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    tracing::info!(app = %config.app_title, base_url = %config.api_base_url, "client configured");

    let client = ApiClient::new(&config)?;
    let store = SessionStore::new(Arc::new(client));

    match cli.command {
        Command::Register(args) => run_register(&store, args.into()).await,
        Command::User { user_id } => run_user(&store, &user_id).await,
    }
}

async fn run_register(store: &SessionStore, request: RegisterRequest) -> Result<(), CliError> {
    let data = store.register(&request).await?;
    print_json(&data)?;
    eprintln!("registered {}", request.username);
    Ok(())
}

async fn run_user(store: &SessionStore, user_id: &str) -> Result<(), CliError> {
    let user = store.fetch_user_info(user_id).await?;
    print_json(&serde_json::to_value(&user)?)?;
    eprintln!("display name: {}", store.display_name().await);
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
