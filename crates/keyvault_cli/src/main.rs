//! Command-line client for KeyVault.

mod auth;
mod remote;

use std::io::{self, Read};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use keyvault_core::identity::{IdentityAdapter, Session};
use keyvault_core::keygen::{generate_license_key, generated_key_title};
use keyvault_core::links::{paste_id_from_link, share_url};
use keyvault_core::models::paste::ExpiryStatus;
use keyvault_core::{
    ClientConfig, ExpiryDuration, Identity, NewPaste, Paste, PasteStore, PasteType, SystemClock,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::ServerIdentityProvider;
use crate::remote::{normalize_server, HttpStore};

#[derive(Parser)]
#[command(name = "kv", about = "KeyVault CLI", version)]
struct Cli {
    /// Server URL (can also be set via KEYVAULT_SERVER env var)
    #[arg(short, long, env = "KEYVAULT_SERVER")]
    server: Option<String>,

    /// Origin presented when signing in
    #[arg(long, env = "KEYVAULT_ORIGIN")]
    origin: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Sign in and remember the identity locally
    Login {
        /// Display name; prompted for when omitted
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Forget the local session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Store a paste read from a file or stdin
    New {
        #[arg(short, long)]
        file: Option<String>,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(long = "type", value_parser = parse_paste_type, default_value = "text")]
        paste_type: PasteType,
        /// Only the author can read it
        #[arg(short, long)]
        private: bool,
        /// Lifetime: 1h, 1d, 1w, 1m, never, or minutes
        #[arg(short, long, value_parser = parse_duration, default_value = "never")]
        duration: ExpiryDuration,
    },
    /// Print a paste by id or share link
    Get { id: String },
    /// List your pastes, newest first
    List,
    /// Generate a license key, optionally saving it as a key paste
    Keygen {
        #[arg(long)]
        save: bool,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        private: bool,
        #[arg(short, long, value_parser = parse_duration, default_value = "never")]
        duration: ExpiryDuration,
    },
    /// Print the share link for a paste id
    Link { id: String },
}

fn parse_paste_type(value: &str) -> Result<PasteType, String> {
    value.parse::<PasteType>().map_err(|err| err.to_string())
}

fn parse_duration(value: &str) -> Result<ExpiryDuration, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1h" | "hour" => Ok(ExpiryDuration::OneHour),
        "1d" | "day" => Ok(ExpiryDuration::OneDay),
        "1w" | "week" => Ok(ExpiryDuration::OneWeek),
        "1m" | "month" => Ok(ExpiryDuration::OneMonth),
        "never" | "forever" => Ok(ExpiryDuration::Never),
        other => {
            let minutes: i64 = other
                .parse()
                .map_err(|_| format!("unrecognized duration '{}'", value))?;
            ExpiryDuration::from_minutes(minutes).map_err(|err| err.to_string())
        }
    }
}

fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Content cannot be empty".to_string());
    }
    Ok(())
}

fn expiry_label(status: ExpiryStatus) -> String {
    match status {
        ExpiryStatus::Never => "Never".to_string(),
        ExpiryStatus::Remaining { days: 1 } => "1 day left".to_string(),
        ExpiryStatus::Remaining { days } => format!("{} days left", days),
        ExpiryStatus::Expired => "Expired".to_string(),
    }
}

fn created_label(paste: &Paste) -> String {
    paste
        .created_at
        .to_datetime()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "pending".to_string())
}

fn format_list_output(pastes: &[Paste], now_millis: i64, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(pastes)
            .map_err(|err| format!("response encoding error: {}", err));
    }
    if pastes.is_empty() {
        return Ok("No pastes yet.".to_string());
    }

    let rows: Vec<String> = pastes
        .iter()
        .map(|paste| {
            let visibility = if paste.is_private { "private" } else { "public" };
            format!(
                "{:<32} {:<30} {:<5} {:<7} {:>6} {:<16} {}",
                paste.id,
                paste.title,
                paste.paste_type,
                visibility,
                paste.views,
                created_label(paste),
                expiry_label(paste.expiry_status(now_millis))
            )
        })
        .collect();
    Ok(rows.join("\n"))
}

fn format_get_output(paste: &Paste, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(paste)
            .map_err(|err| format!("response encoding error: {}", err));
    }
    Ok(paste.content.clone())
}

fn format_identity(identity: &Identity) -> String {
    match &identity.photo_url {
        Some(photo) => format!("{} ({}) {}", identity.display_name, identity.id, photo),
        None => format!("{} ({})", identity.display_name, identity.id),
    }
}

fn explicit_override(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn exit_with(action: &str, message: impl std::fmt::Display) -> ! {
    eprintln!("{} failed: {}", action, message);
    std::process::exit(1);
}

fn require_identity(session: &Session, action: &str) -> Identity {
    match session.identity() {
        Some(identity) => identity.clone(),
        None => exit_with(action, "not signed in (run `kv login` first)"),
    }
}

fn read_content(file: Option<String>) -> io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

async fn create_or_exit(store: &PasteStore<HttpStore>, input: NewPaste, action: &str) -> String {
    match store.create(input).await {
        Ok(id) => id,
        Err(err) => exit_with(action, err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let Cli {
        server,
        origin,
        json,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let mut config = ClientConfig::from_env();
    if let Some(server) = explicit_override(server) {
        config.server_url = server;
    }
    if let Some(origin) = explicit_override(origin) {
        config.origin = origin;
    }
    let server = normalize_server(config.server_url.clone());

    if let Commands::Link { id } = &command {
        let id = paste_id_from_link(id).unwrap_or_else(|| exit_with("Link", "empty paste id"));
        println!("{}", share_url(&config.origin, &id));
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .connect_timeout(config.read_timeout)
        .build()?;
    let provider = ServerIdentityProvider::new(
        client.clone(),
        server.clone(),
        config.origin.clone(),
        config.session_file.clone(),
    );

    match command {
        Commands::Completions { .. } | Commands::Link { .. } => {
            unreachable!("handled before client setup")
        }
        Commands::Login { name, photo_url } => {
            let provider = provider.with_display_name(name).with_photo_url(photo_url);
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            match adapter.login().await {
                Ok(identity) if json => println!("{}", serde_json::to_string_pretty(&identity)?),
                Ok(identity) => println!("Signed in as {}", format_identity(&identity)),
                Err(err) => exit_with("Login", err),
            }
        }
        Commands::Logout => {
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            adapter.logout().await;
            println!("Signed out");
        }
        Commands::Whoami => {
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            match adapter.restore().await {
                Session::Authenticated(identity) if json => {
                    println!("{}", serde_json::to_string_pretty(identity)?)
                }
                Session::Authenticated(identity) => println!("{}", format_identity(identity)),
                Session::Anonymous => println!("Not signed in"),
            }
        }
        Commands::New {
            file,
            title,
            paste_type,
            private,
            duration,
        } => {
            let content = read_content(file)?;
            if let Err(message) = validate_content(&content) {
                exit_with("New", message);
            }
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            let identity = require_identity(adapter.restore().await, "New");
            let store = paste_store(client, server, Some(identity.id.clone()), &config);
            let input = NewPaste {
                title: title.unwrap_or_default(),
                is_private: private,
                paste_type,
                duration,
                ..NewPaste::for_identity(&identity, content)
            };
            let id = create_or_exit(&store, input, "New").await;
            let link = share_url(&config.origin, &id);
            if json {
                let body = serde_json::json!({ "id": id, "link": link });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Created: {}", id);
                println!("{}", link);
            }
        }
        Commands::Keygen {
            save,
            title,
            private,
            duration,
        } => {
            let key = generate_license_key();
            if !save {
                println!("{}", key);
                return Ok(());
            }
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            let identity = require_identity(adapter.restore().await, "Keygen");
            let store = paste_store(client, server, Some(identity.id.clone()), &config);
            let input = NewPaste {
                title: title.unwrap_or_else(|| generated_key_title(store.now_millis())),
                is_private: private,
                paste_type: PasteType::Key,
                duration,
                ..NewPaste::for_identity(&identity, key.clone())
            };
            let id = create_or_exit(&store, input, "Keygen").await;
            let link = share_url(&config.origin, &id);
            if json {
                let body = serde_json::json!({ "key": key, "id": id, "link": link });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", key);
                println!("Saved: {}", id);
                println!("{}", link);
            }
        }
        Commands::Get { id } => {
            let id = paste_id_from_link(&id).unwrap_or_else(|| exit_with("Get", "empty paste id"));
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            let caller = adapter.restore().await.identity().map(|user| user.id.clone());
            let store = paste_store(client, server, caller, &config);

            let fetched = match store.get(&id).await {
                Ok(Some(fetched)) => fetched,
                Ok(None) => exit_with("Get", format!("paste '{}' not found", id)),
                Err(err) => exit_with("Get", err),
            };
            if fetched.is_expired(store.now_millis()) {
                exit_with("Get", "this paste has expired");
            }
            match format_get_output(&fetched.paste, json) {
                Ok(output) => println!("{}", output),
                Err(message) => exit_with("Get", message),
            }
            // Let the counter land before the runtime shuts down.
            fetched.view_increment.outcome().await;
        }
        Commands::List => {
            let mut adapter = IdentityAdapter::new(provider, config.origin.clone());
            let identity = require_identity(adapter.restore().await, "List");
            let store = paste_store(client, server, Some(identity.id.clone()), &config);
            let pastes = store.list(&identity.id).await;
            match format_list_output(&pastes, store.now_millis(), json) {
                Ok(output) => println!("{}", output),
                Err(message) => exit_with("List", message),
            }
        }
    }

    Ok(())
}

fn paste_store(
    client: reqwest::Client,
    server: String,
    user_id: Option<String>,
    config: &ClientConfig,
) -> PasteStore<HttpStore> {
    PasteStore::new(
        Arc::new(HttpStore::new(client, server, user_id)),
        SystemClock,
        config.store_settings(),
    )
}
