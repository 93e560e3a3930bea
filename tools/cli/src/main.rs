//! burnlink CLI - seal and open passcode-protected share links.
//!
//! Sealing prints a link; opening prompts for the passcode and prints the
//! message or writes the attached file. Nothing is stored anywhere else.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use burnlink_common::{Error, Passcode};
use burnlink_crypto::{CryptoProvider, KdfAlgorithm, StandardProvider};
use burnlink_link::{
    seal, Content, LinkPolicy, LinkState, LinkView, MediaFile, ShareConfig, Ttl, Viewer,
};

#[derive(Parser)]
#[command(name = "burnlink")]
#[command(about = "burnlink - Passcode-protected self-contained share links")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a message or file into a share link.
    Seal {
        /// Message text.
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        message: Option<String>,

        /// File to attach instead of a message.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// MIME type of the attached file.
        #[arg(long, default_value = "application/octet-stream")]
        mime: String,

        /// Link lifetime: "none", "burn", "1" (one-time) or "24h".
        #[arg(short, long, default_value = "none")]
        ttl: String,

        /// Let the recipient save the attached file.
        #[arg(long)]
        allow_download: bool,

        /// Key derivation: "pbkdf2" or "argon2id" (overrides config).
        #[arg(long)]
        kdf: Option<String>,
    },

    /// Open a share link and decrypt it.
    Open {
        /// The share link.
        url: String,

        /// Directory attached files are written to.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Show what a link carries without decrypting it.
    Inspect {
        /// The share link.
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => ShareConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ShareConfig::default(),
    };
    let provider: Arc<dyn CryptoProvider> = Arc::new(StandardProvider::new());

    match cli.command {
        Commands::Seal {
            message,
            file,
            mime,
            ttl,
            allow_download,
            kdf,
        } => {
            cmd_seal(
                config,
                provider,
                message,
                file,
                &mime,
                &ttl,
                allow_download,
                kdf.as_deref(),
            )
            .await
        }

        Commands::Open { url, out } => cmd_open(config, provider, &url, &out).await,

        Commands::Inspect { url } => cmd_inspect(config, provider, &url),
    }
}

/// Prompt for a passcode without echo, off the async executor.
async fn prompt_passcode(prompt: &'static str) -> Result<Zeroizing<String>> {
    let passcode = tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt))
        .await
        .context("Passcode prompt failed")?
        .context("Failed to read passcode")?;
    Ok(Zeroizing::new(passcode))
}

/// Seal a message or file.
#[allow(clippy::too_many_arguments)]
async fn cmd_seal(
    mut config: ShareConfig,
    provider: Arc<dyn CryptoProvider>,
    message: Option<String>,
    file: Option<PathBuf>,
    mime: &str,
    ttl: &str,
    allow_download: bool,
    kdf: Option<&str>,
) -> Result<()> {
    if let Some(kdf) = kdf {
        config.kdf = kdf.parse::<KdfAlgorithm>()?;
    }
    let ttl: Ttl = ttl.parse()?;
    let policy = LinkPolicy::for_ttl(ttl, config.expiring_lifetime(), Utc::now());

    let content = match (message, file) {
        (Some(message), _) => Content::Text(message),
        (None, Some(path)) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Content::Media(MediaFile::new(name, mime, allow_download, bytes))
        }
        (None, None) => anyhow::bail!("Provide --message or --file"),
    };

    let passcode = prompt_passcode("Choose passcode: ").await?;
    let confirm = prompt_passcode("Confirm passcode: ").await?;
    if passcode != confirm {
        anyhow::bail!("Passcodes do not match");
    }
    let passcode = Passcode::new(passcode.as_str())?;

    info!(ttl = %ttl, kdf = %config.kdf, "Sealing");
    let sealed = seal(content, passcode, policy, &config, provider)
        .await
        .context("Failed to seal link")?;

    if let Some(warning) = sealed.warning {
        eprintln!(
            "Warning: payload is {} bytes (advisory limit {}); some messaging apps may cut the link.",
            warning.size, warning.limit
        );
    }
    if let Some(expires_at) = sealed.fields.policy.expires_at() {
        eprintln!("Link expires at {}", expires_at);
    }
    println!("{}", sealed.url);

    Ok(())
}

/// Open a link, prompting until it decrypts or becomes unusable.
async fn cmd_open(
    config: ShareConfig,
    provider: Arc<dyn CryptoProvider>,
    url: &str,
    out: &Path,
) -> Result<()> {
    let mut viewer = Viewer::new(config, provider);
    let view = viewer.open(url).context("Failed to open link")?;
    print_view(&view);

    if view.state.is_terminal() {
        anyhow::bail!("This link has expired");
    }

    loop {
        if let Some(status) = viewer.countdown().map(|rx| {
            let status = *rx.borrow();
            status
        }) {
            if status.state == LinkState::Expired {
                anyhow::bail!("This link has expired");
            }
            eprintln!("Time remaining: {}", format_remaining(status.remaining));
        }

        let passcode = prompt_passcode("Passcode: ").await?;
        match viewer.attempt(passcode.as_str()).await {
            Ok(content) => return reveal(content, out).await,
            Err(Error::Authentication) => {
                let left = viewer.view().map(|v| v.attempts_remaining).unwrap_or(0);
                eprintln!("Wrong passcode. {} attempt(s) left.", left);
            }
            Err(Error::InvalidInput(reason)) => eprintln!("{}", reason),
            Err(Error::Busy(_)) => {}
            Err(e) => return Err(e).context("Link can no longer be opened"),
        }
    }
}

/// Print or save revealed content.
async fn reveal(content: Content, out: &Path) -> Result<()> {
    match content {
        Content::Text(text) => {
            println!("{}", text);
        }
        Content::Media(file) if file.allow_download => {
            // Never let a link choose where outside `out` it lands.
            let name = Path::new(&file.name)
                .file_name()
                .map(|n| n.to_owned())
                .unwrap_or_else(|| "download".into());
            let dest = out.join(name);
            tokio::fs::write(&dest, file.bytes.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            println!("Saved {} ({} bytes)", dest.display(), file.bytes.len());
        }
        Content::Media(file) => {
            println!(
                "{} ({}, {} bytes): the sender did not allow downloading this file.",
                file.name,
                file.mime_type,
                file.bytes.len()
            );
        }
    }
    Ok(())
}

/// Describe a link without decrypting it.
fn cmd_inspect(config: ShareConfig, provider: Arc<dyn CryptoProvider>, url: &str) -> Result<()> {
    let mut viewer = Viewer::new(config, provider);
    let view = viewer.open(url).context("Failed to read link")?;
    print_view(&view);
    Ok(())
}

fn print_view(view: &LinkView) {
    println!("Link:");
    println!("  State: {}", view.state);
    println!("  TTL: {}", view.policy.ttl());
    if let Some(expires_at) = view.policy.expires_at() {
        println!("  Expires: {}", expires_at);
    }
    if let Some(remaining) = view.time_remaining {
        println!("  Remaining: {}", format_remaining(remaining));
    }
    println!("  Content: {}", view.meta.kind);
    if let Some(name) = &view.meta.media_name {
        println!("  File: {}", name);
    }
    if let Some(mime_type) = &view.meta.media_type {
        println!("  Type: {}", mime_type);
    }
    println!("  Key derivation: {}", view.kdf);
    println!("  Attempts left: {}", view.attempts_remaining);
    if let Some(warning) = view.warning {
        println!(
            "  Warning: payload is {} bytes (advisory limit {})",
            warning.size, warning.limit
        );
    }
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
