//! Warden CLI - Quantum-resistant key and session manager
//!
//! Usage:
//!   warden algorithms  - List supported algorithms
//!   warden sign        - Generate a key, sign a message and verify it
//!   warden session     - Run a full KEM session handshake locally
//!   warden watch       - Periodic cleanup of expired material

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden_core::{Algorithm, ManagerConfig, QuantumSecurityManager, SecurityLevel};

#[derive(Parser)]
#[command(name = "warden")]
#[command(author = "HeyBattle1")]
#[command(version)]
#[command(about = "Quantum-resistant key and session manager", long_about = None)]
struct Cli {
    /// JSON config file (environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported algorithms by family
    Algorithms,

    /// Generate a signing key, sign a message and verify the result
    Sign {
        #[arg(long, default_value = "dilithium")]
        algorithm: Algorithm,

        /// NIST security level (1, 3 or 5)
        #[arg(long)]
        level: Option<SecurityLevel>,

        #[arg(long, default_value = "hello")]
        message: String,
    },

    /// Establish a session against a fresh KEM key and accept it locally
    Session {
        #[arg(long)]
        level: Option<SecurityLevel>,
    },

    /// Purge expired keys and sessions on a fixed interval
    Watch {
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let manager = QuantumSecurityManager::new(load_config(cli.config.as_deref())?)
        .context("failed to start manager")?;

    match cli.command {
        Commands::Algorithms => {
            let registry = manager.registry();
            let listing = json!({
                "signature": registry.signature_algorithms(),
                "kem": registry.kem_algorithms(),
                "levels": SecurityLevel::ALL,
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }

        Commands::Sign {
            algorithm,
            level,
            message,
        } => {
            let key = manager.generate_key_pair(algorithm, level)?;
            let signature = manager.sign(message.as_bytes(), &key.key_id)?;
            let verified = manager.verify(&signature, &key.public_key);

            let summary = json!({
                "key_id": key.key_id,
                "algorithm": signature.algorithm,
                "requested_algorithm": key.requested_algorithm,
                "security_level": signature.security_level,
                "signature_len": signature.signature.len(),
                "signature_prefix": hex::encode(signature.signature.iter().take(16).copied().collect::<Vec<u8>>()),
                "verified": verified,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Session { level } => {
            // Both ends run in-process: a separate manager plays the responder.
            let responder = QuantumSecurityManager::new(manager.config().clone())?;
            let responder_key = responder.generate_key_pair(manager.config().default_kem, level)?;

            let outbound = manager.establish_session(&responder_key.public_key, None, None)?;
            let inbound = responder.accept_session(
                &outbound.session_id,
                &outbound.ciphertext,
                &responder_key.key_id,
            )?;

            let summary = json!({
                "session_id": outbound.session_id,
                "algorithm": outbound.algorithm,
                "security_level": outbound.security_level,
                "ciphertext_len": outbound.ciphertext.len(),
                "expires_at": outbound.expires_at,
                "keys_match": inbound.symmetric_key() == outbound.symmetric_key(),
                "metrics": manager.get_metrics(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Watch { interval_secs } => {
            info!(interval_secs, "watching for expired material");
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = manager.cleanup();
                        let metrics = manager.get_metrics();
                        info!(
                            keys_removed = report.keys_removed,
                            sessions_removed = report.sessions_removed,
                            active_keys = metrics.active_keys,
                            active_sessions = metrics.active_sessions,
                            "cleanup tick"
                        );
                    }
                    _ = &mut shutdown => {
                        info!("shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ManagerConfig> {
    let config = match path {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };
    Ok(config.apply_env()?)
}
