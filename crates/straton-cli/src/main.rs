//! straton: encrypted chat client CLI
//!
//! Commands:
//!   init                    - set up the crypto identity and recovery backup
//!   whoami                  - show the local identity and key provenance
//!   send <peer> <text>      - send an encrypted text message
//!   send-image <peer> <file> - send an encrypted image attachment
//!   history <peer>          - fetch and decrypt a conversation
//!   listen                  - stream incoming messages in realtime
//!
//! Directory credentials are read from AWS_ACCESS_KEY_ID and
//! AWS_SECRET_ACCESS_KEY environment variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use straton_chat::{
    ensure_recovery_backup, init_crypto_identity, ChatClient, DisplayBody, DisplayMessage,
    Realtime, RecoveryPrompt,
};
use straton_core::config::StratonConfig;
use straton_core::{StratonError, StratonResult};
use straton_directory::{build_operator, BlobStore, KeyDirectory, LocalStore, MessageStore};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "straton",
    version,
    about = "Straton encrypted chat client",
    long_about = "straton: end-to-end encrypted messaging against the Straton directory service"
)]
struct Cli {
    /// Path to straton.toml configuration file
    #[arg(long, short = 'c', env = "STRATON_CONFIG", default_value = "straton.toml")]
    config: PathBuf,

    /// Local user id (the logged-in identity)
    #[arg(long, short = 'u', env = "STRATON_USER")]
    user: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "STRATON_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "STRATON_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set up the crypto identity (and the recovery backup, interactively)
    Init,

    /// Show the local identity and where its key came from
    Whoami,

    /// Send an encrypted text message
    Send {
        /// Recipient user id
        peer: String,
        /// Message text
        text: String,
    },

    /// Send an encrypted image attachment
    #[command(name = "send-image")]
    SendImage {
        /// Recipient user id
        peer: String,
        /// Path to the image file
        file: PathBuf,
        /// MIME type of the image
        #[arg(long, default_value = "image/png")]
        mime: String,
    },

    /// Fetch and decrypt the conversation with a peer
    History {
        /// Peer user id
        peer: String,
    },

    /// Stream incoming messages as they arrive
    Listen,
}

// ── Interactive recovery prompt ────────────────────────────────────────────────

/// Terminal implementation of the recovery prompt. Both steps block on
/// stdin, so they run on the blocking pool.
struct TerminalPrompt;

impl RecoveryPrompt for TerminalPrompt {
    async fn confirm_secret_saved(&self, secret: &SecretString) -> StratonResult<bool> {
        let shown = secret.expose_secret().to_string();
        tokio::task::spawn_blocking(move || {
            println!();
            println!("Your recovery key (the only copy that will ever exist):");
            println!();
            println!("    {shown}");
            println!();
            println!("Write it down somewhere safe. Without it, losing this device");
            println!("means losing access to your encrypted messages.");
            loop {
                print!("Type 'saved' once you have recorded it, or 'skip' to set up later: ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
                match line.trim() {
                    "saved" => return Ok(true),
                    "skip" | "" => return Ok(false),
                    _ => continue,
                }
            }
        })
        .await
        .map_err(|e| StratonError::Other(anyhow::anyhow!("prompt task: {e}")))?
    }

    async fn request_secret(&self) -> StratonResult<Option<SecretString>> {
        let entered = tokio::task::spawn_blocking(|| {
            rpassword::prompt_password("Recovery key (press enter to cancel): ")
        })
        .await
        .map_err(|e| StratonError::Other(anyhow::anyhow!("prompt task: {e}")))??;

        if entered.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(entered.trim().to_string())))
    }
}

// ── Main ───────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log, &cli.log_format);

    let config = StratonConfig::load(&cli.config)?;
    let client = connect(&cli, &config).await?;

    match cli.command {
        Commands::Init => {
            println!("identity ready: {} ({:?})", cli.user, client.session().key_source());
            println!("public key: {}", client.session().public_export());

            let created = ensure_recovery_backup(
                client.session(),
                &TerminalPrompt,
                &CancellationToken::new(),
            )
            .await;
            match created {
                Ok(true) => println!("recovery backup stored."),
                Ok(false) => println!("recovery backup already exists."),
                Err(StratonError::RecoveryCancelled) => {
                    println!("recovery setup skipped; you will be asked again next time.");
                }
                Err(e) => return Err(e).context("creating recovery backup"),
            }
        }

        Commands::Whoami => {
            println!("user:       {}", cli.user);
            println!("key source: {:?}", client.session().key_source());
            println!("public key: {}", client.session().public_export());
        }

        Commands::Send { peer, text } => match client.send_text(&peer, &text).await {
            Ok(record) => info!(message_id = %record.id, "sent"),
            Err(StratonError::PeerNotInitialized(peer)) => {
                anyhow::bail!("could not send: {peer} has not set up encryption yet");
            }
            Err(e) => return Err(e).context("could not send; your message was not stored"),
        },

        Commands::SendImage { peer, file, mime } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let record = client
                .send_image(&peer, &bytes, &mime)
                .await
                .context("could not send image")?;
            info!(message_id = %record.id, bytes = bytes.len(), "image sent");
        }

        Commands::History { peer } => {
            let conversation = client.load_conversation(&peer).await?;
            for message in &conversation {
                print_message(&cli.user, message);
            }
            if conversation.is_empty() {
                println!("(no messages)");
            }
        }

        Commands::Listen => {
            if !config.realtime.enabled {
                anyhow::bail!("realtime is disabled in the configuration");
            }
            let realtime = Realtime::connect(&config.realtime.nats_url).await?;
            let mut events = realtime.subscribe(&cli.user).await?;
            println!("listening for messages to {} ...", cli.user);
            while let Some(record) = events.next().await {
                if let Some(message) = client.decrypt_record(&record).await {
                    print_message(&cli.user, &message);
                }
            }
        }
    }

    Ok(())
}

/// Build the operator, run identity startup, and assemble the client.
async fn connect(cli: &Cli, config: &StratonConfig) -> Result<ChatClient> {
    let access_key = std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default();
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default();
    let op = build_operator(&config.directory, &access_key, &secret_key)?;

    let profile_dir = config
        .client
        .profile_dir
        .clone()
        .unwrap_or_else(straton_directory::local::default_profile_dir);
    let mut local = LocalStore::open(&profile_dir)?;

    let session = init_crypto_identity(
        &cli.user,
        &mut local,
        KeyDirectory::new(op.clone()),
        &TerminalPrompt,
        &CancellationToken::new(),
    )
    .await?;

    let realtime = if config.realtime.enabled {
        match Realtime::connect(&config.realtime.nats_url).await {
            Ok(realtime) => Some(realtime),
            Err(e) => {
                tracing::warn!(error = %e, "realtime unavailable; messages still reach the store");
                None
            }
        }
    } else {
        None
    };

    Ok(ChatClient::new(
        session,
        MessageStore::new(op.clone()),
        BlobStore::new(op),
        realtime,
    ))
}

fn print_message(me: &str, message: &DisplayMessage) {
    let direction = if message.sender_id == me {
        "me"
    } else {
        message.sender_id.as_str()
    };
    match &message.body {
        DisplayBody::Text(text) => println!("[{}] {direction}: {text}", message.created_at),
        DisplayBody::Image { mime, bytes } => {
            println!("[{}] {direction}: [image {mime}, {} bytes]", message.created_at, bytes.len());
        }
        DisplayBody::BrokenImage { mime } => {
            println!("[{}] {direction}: [image {mime}: could not display]", message.created_at);
        }
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
