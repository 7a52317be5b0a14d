//! FleetSync CLI - run the server and manage GPS providers from the shell.
//!
//! Configuration comes from the `FLEETSYNC_*` environment variables (see
//! `fleetsync_server::config`); flags override individual values.

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleetsync_common::{CompanyId, ProviderId, TenantId};
use fleetsync_crypto::{CredentialVault, MasterKey, Salt};
use fleetsync_providers::{GpsProvider, ProviderFactory, ProviderKind};
use fleetsync_server::{AppConfig, AppState};
use fleetsync_sync::NewProvider;

#[derive(Parser)]
#[command(name = "fleetsync")]
#[command(about = "FleetSync - GPS provider integration and trailer reconciliation")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database path (overrides FLEETSYNC_DATABASE).
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Listen address (overrides FLEETSYNC_BIND).
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Print a new random vault key.
    GenerateKey {
        /// Print a passphrase salt instead of a raw key.
        #[arg(long)]
        salt: bool,
    },

    /// Encrypt a credential JSON file for a tenant.
    Encrypt {
        /// Tenant that will own the credentials.
        #[arg(short, long)]
        tenant: String,

        /// Credential JSON file.
        #[arg(short, long)]
        file: PathBuf,

        /// Check the document against a provider type first.
        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// Register a provider.
    AddProvider {
        #[arg(long)]
        company: String,

        #[arg(long)]
        tenant: String,

        /// spireon, skybitz or samsara.
        #[arg(long = "type")]
        kind: String,

        #[arg(long)]
        name: String,

        /// Credential JSON file.
        #[arg(long)]
        credentials: PathBuf,
    },

    /// Sync a provider's assets into trailers.
    Sync {
        #[arg(short, long)]
        provider: String,
    },

    /// Test a provider's connection.
    Test {
        #[arg(short, long)]
        provider: String,
    },

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let database = cli.database;
    match cli.command {
        Commands::Serve { bind } => cmd_serve(database, bind).await,
        Commands::GenerateKey { salt } => cmd_generate_key(salt),
        Commands::Encrypt { tenant, file, kind } => cmd_encrypt(&tenant, &file, kind.as_deref()),
        Commands::AddProvider {
            company,
            tenant,
            kind,
            name,
            credentials,
        } => cmd_add_provider(database, company, tenant, &kind, name, &credentials).await,
        Commands::Sync { provider } => cmd_sync(database, provider).await,
        Commands::Test { provider } => cmd_test(database, provider).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "fleetsync", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_config(database: Option<String>) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("Invalid FleetSync configuration")?;
    if let Some(database) = database {
        config.database = database;
    }
    Ok(config)
}

fn read_credentials(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if !value.is_object() {
        bail!("{} must contain a JSON object", path.display());
    }
    Ok(value)
}

async fn cmd_serve(database: Option<String>, bind: Option<SocketAddr>) -> Result<()> {
    let mut config = load_config(database)?;
    if let Some(bind) = bind {
        config.bind = bind;
    }

    info!(
        database = %config.database,
        cache_ttl_secs = config.status_cache_ttl_secs,
        "Starting FleetSync"
    );
    fleetsync_server::serve(config).await.context("Server failed")?;
    Ok(())
}

fn cmd_generate_key(salt: bool) -> Result<()> {
    if salt {
        println!("FLEETSYNC_VAULT_SALT={}", Salt::generate().to_base64());
    } else {
        println!("FLEETSYNC_VAULT_KEY={}", MasterKey::generate().to_base64());
    }
    Ok(())
}

fn cmd_encrypt(tenant: &str, file: &Path, kind: Option<&str>) -> Result<()> {
    let config = AppConfig::from_env().context("Invalid FleetSync configuration")?;
    let tenant = TenantId::new(tenant).context("Invalid tenant id")?;
    let credentials = read_credentials(file)?;

    if let Some(kind) = kind {
        let kind: ProviderKind = kind.parse()?;
        let factory = ProviderFactory::new(&config.http_settings(), config.endpoints())?;
        if !factory.get_provider(kind).validate_credentials(&credentials) {
            bail!("Credentials are incomplete for a {} provider", kind);
        }
    }

    let vault = CredentialVault::new(config.master_key().context("Cannot load vault key")?);
    println!("{}", vault.encrypt(&tenant, &credentials)?);
    Ok(())
}

async fn cmd_add_provider(
    database: Option<String>,
    company: String,
    tenant: String,
    kind: &str,
    name: String,
    credentials: &Path,
) -> Result<()> {
    let input = NewProvider {
        company_id: CompanyId::new(company).context("Invalid company id")?,
        tenant_id: TenantId::new(tenant).context("Invalid tenant id")?,
        kind: kind.parse::<ProviderKind>()?,
        name,
        credentials: read_credentials(credentials)?,
    };

    let state = AppState::from_config(&load_config(database)?)?;
    let provider = state.service.register(input).await?;

    println!("Provider registered!");
    println!("  ID: {}", provider.id);
    println!("  Type: {}", provider.kind);
    println!("  Name: {}", provider.name);
    Ok(())
}

async fn cmd_sync(database: Option<String>, provider: String) -> Result<()> {
    let id = ProviderId::new(provider).context("Invalid provider id")?;
    let state = AppState::from_config(&load_config(database)?)?;

    let summary = state
        .service
        .sync(&id)
        .await
        .with_context(|| format!("Sync of provider {} failed", id))?;

    println!("Sync complete:");
    println!("  Created: {}", summary.created_count);
    println!("  Updated: {}", summary.updated_count);
    println!("  Failed: {}", summary.failed_count);
    for failure in &summary.failures {
        println!("    {}: {}", failure.external_id, failure.error);
    }
    Ok(())
}

async fn cmd_test(database: Option<String>, provider: String) -> Result<()> {
    let id = ProviderId::new(provider).context("Invalid provider id")?;
    let state = AppState::from_config(&load_config(database)?)?;

    let test = state.service.test(&id).await?;
    println!("Status: {}", test.status);
    println!("Trailers: {}", test.trailer_count);
    if let Some(error) = test.error {
        println!("Error: {}", error);
    }
    Ok(())
}
