//! Vocabuloid CLI
//!
//! Command-line front end for studying vocabulario.me lists.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (prints a URL, then paste the verifier it shows)
//! vocabuloid sign-in
//! vocabuloid verify 8a3f9c
//!
//! # Browse lists
//! vocabuloid lists
//! vocabuloid show 3
//!
//! # Verb lists need a tense
//! vocabuloid tenses 9
//! vocabuloid show 9 --tense 1
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};
use vocabuloid_core::{ClientConfig, Session, VocabuloidError, load_config};

mod render;

use render::OutputFormat;

#[derive(Parser)]
#[command(name = "vocabuloid")]
#[command(about = "Flashcards for your vocabulario.me lists")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start signing in and print the authorization URL
    SignIn,

    /// Finish signing in with the verifier shown by the service
    Verify {
        /// Verifier code
        verifier: String,
    },

    /// Forget the stored access token
    SignOut,

    /// Show sign-in state and connectivity
    Status,

    /// List your vocabulary lists
    Lists,

    /// Show the tenses a verb list supports
    Tenses {
        /// List id
        list: u64,
    },

    /// Show a list as flashcards
    Show {
        /// List id
        list: u64,

        /// Tense id (verb lists only)
        #[arg(short, long)]
        tense: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config, cli.verbose);
    debug!("Loaded configuration from {:?}", config.config_path);

    let session = Session::from_config(&config).context("failed to set up session")?;

    let result = match cli.command {
        Commands::SignIn => sign_in(&session).await,
        Commands::Verify { verifier } => verify(&session, &verifier).await,
        Commands::SignOut => sign_out(&session).await,
        Commands::Status => status(&session, cli.format).await,
        Commands::Lists => lists(&session, cli.format).await,
        Commands::Tenses { list } => tenses(&session, list, cli.format).await,
        Commands::Show { list, tense } => show(&session, list, tense, cli.format).await,
    };

    result.map_err(|e| explain(&session, e))
}

fn init_logging(config: &ClientConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Turn the two conditions users can act on into plain notices.
fn explain(session: &Session, error: VocabuloidError) -> anyhow::Error {
    if error.is_offline() {
        anyhow::anyhow!("{}", session.messages().offline)
    } else if error.is_unauthenticated() {
        anyhow::anyhow!("not signed in; run `vocabuloid sign-in` first")
    } else {
        error.into()
    }
}

fn no_data(session: &Session) {
    eprintln!("{}", session.messages().no_vocabularies);
}

async fn sign_in(session: &Session) -> Result<(), VocabuloidError> {
    if !session.is_network_available().await {
        eprintln!("{}", session.messages().offline);
        return Ok(());
    }

    let url = session.begin_authorization().await?;
    println!("Open this URL, approve access, then run `vocabuloid verify <code>`:");
    println!("{}", url);
    Ok(())
}

async fn verify(session: &Session, verifier: &str) -> Result<(), VocabuloidError> {
    session.complete_authorization(verifier.trim()).await?;
    println!("{}", session.messages().signed_in);
    Ok(())
}

async fn sign_out(session: &Session) -> Result<(), VocabuloidError> {
    session.sign_out().await?;
    println!("{}", session.messages().signed_out);
    Ok(())
}

async fn status(session: &Session, format: OutputFormat) -> Result<(), VocabuloidError> {
    let state = session.authorization_state().await?;
    let online = session.is_network_available().await;
    println!("{}", render::status(state, online, session.messages(), format));
    Ok(())
}

async fn lists(session: &Session, format: OutputFormat) -> Result<(), VocabuloidError> {
    let Some(user) = session.current_user().await? else {
        no_data(session);
        return Ok(());
    };

    match user.lists().await? {
        Some(lists) if !lists.is_empty() => println!("{}", render::lists(lists, format)),
        _ => no_data(session),
    }
    Ok(())
}

async fn tenses(session: &Session, list_id: u64, format: OutputFormat) -> Result<(), VocabuloidError> {
    let list = session.list(list_id);
    match list.supported_tenses().await? {
        Some(tenses) => println!("{}", render::tenses(tenses, format)),
        None => no_data(session),
    }
    Ok(())
}

async fn show(
    session: &Session,
    list_id: u64,
    tense: Option<u64>,
    format: OutputFormat,
) -> Result<(), VocabuloidError> {
    let list = session.list(list_id);
    if let Some(tense) = tense {
        list.select_tense(tense);
    }

    match session.select_list(&list).await? {
        Some(cards) => println!("{}", render::flashcards(&cards, session.messages(), format)),
        None => no_data(session),
    }
    Ok(())
}
