use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, error, info};

use songswipe_lib::config::ConfigManager;
use songswipe_lib::settings::ThemeMode;
use songswipe_lib::{logging, Error, Page, Session};

#[derive(Parser)]
#[command(name = "songswipe")]
#[command(about = "Music discovery client: catalog login, browsing and session management")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $SONGSWIPE_CONFIG_PATH or ./songswipe.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show which credentials are held
    Status,
    /// Print the URL that starts the catalog login
    LoginUrl,
    /// Complete a login from the redirect URL
    Callback {
        /// Full redirect URL including the fragment
        url: String,
    },
    /// Show the signed-in user's profile
    Me,
    /// Show a playlist
    Playlist {
        id: String,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        fields: Option<String>,
    },
    /// List browse categories
    Categories {
        #[arg(long)]
        locale: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Sign out and wipe local credentials
    SignOut,
    /// Show or change the theme preference
    Theme {
        /// light, dark or system
        mode: Option<ThemeMode>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    match env_file_path {
        Some(path) => debug!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(err) = e.downcast_ref::<Error>() {
                if err.requires_reauthentication() {
                    eprintln!("Your catalog session has expired. Run `songswipe login-url` to sign in again.");
                    return ExitCode::from(2);
                }
            }
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let manager = ConfigManager::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    let session = Session::start(manager.get_config().await).await?;

    match cli.command {
        Command::Status => print_json(&serde_json::to_value(session.status())?),
        Command::LoginUrl => println!("{}", session.identity().authorize_url()?),
        Command::Callback { url } => {
            session.identity().handle_callback(&url).await?;
            if !session.ensure_delegated_token().await? {
                anyhow::bail!("Login succeeded but no catalog token was granted");
            }
            info!("Signed in");
            println!("Signed in.");
        }
        Command::Me => print_json(&session.catalog().current_user_profile().await?),
        Command::Playlist { id, market, fields } => {
            let playlist = session
                .catalog()
                .playlist(&id, market.as_deref(), fields.as_deref())
                .await?;
            print_json(&playlist)
        }
        Command::Categories {
            locale,
            limit,
            offset,
        } => {
            let categories = session
                .catalog()
                .categories(locale.as_deref(), Page::new(limit, offset))
                .await?;
            print_json(&categories)
        }
        Command::SignOut => {
            session.sign_out().await?;
            println!("Signed out.");
        }
        Command::Theme { mode: Some(mode) } => {
            session.settings().set_theme_mode(mode).await?;
            println!("Theme set to {}", mode);
        }
        Command::Theme { mode: None } => {
            println!("{}", session.settings().theme_mode().await?);
        }
    }

    Ok(())
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
