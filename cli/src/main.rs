//! # veilvault
//!
//! Command line front end for the VeilVault primitives and the balance
//! reconstruction engine. Every command prints JSON on stdout; logs go to
//! stderr and are controlled with `RUST_LOG`.

mod keys;
mod reconstruct;
mod tree;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use veilvault_config::VaultConfig;
use veilvault_privacy::Scalar;
use veilvault_privacy::encoding::parse_scalar;
use veilvault_privacy::keys::TokenAddress;

#[derive(Parser, Debug)]
#[command(name = "veilvault", version)]
#[command(about = "Shielded vault balance tools", long_about = None)]
struct Cli {
    /// Config file to use instead of the usual lookup
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive the view key for a user key
    ViewKey {
        #[arg(long, value_parser = scalar_arg)]
        user_key: Scalar,
    },

    /// Build a commitment point and its tree leaf
    Commit {
        #[arg(long, value_parser = scalar_arg)]
        shares: Scalar,
        #[arg(long, value_parser = scalar_arg, default_value = "0")]
        nullifier: Scalar,
        #[arg(long, value_parser = scalar_arg)]
        spending_key: Scalar,
        #[arg(long, value_parser = scalar_arg, default_value = "0")]
        unlocks_at: Scalar,
        #[arg(long, value_parser = scalar_arg)]
        nonce_commitment: Scalar,
    },

    /// Derive the per-token keys and a nonce commitment
    Keys {
        #[arg(long, value_parser = scalar_arg)]
        user_key: Scalar,
        #[arg(long, value_parser = token_arg)]
        token: TokenAddress,
        #[arg(long, env = "VV_CHAIN_ID")]
        chain_id: Option<u64>,
        #[arg(long, default_value = "0")]
        nonce: u64,
    },

    /// Merkle tree utilities
    Tree {
        #[command(subcommand)]
        command: tree::TreeCommand,
    },

    /// Rebuild note history from a ledger dump
    Reconstruct(reconstruct::ReconstructArgs),

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print a sample veilvault.toml
    Sample,
    /// Print the effective configuration
    Show,
}

pub(crate) fn scalar_arg(s: &str) -> Result<Scalar, String> {
    parse_scalar(s).map_err(|e| e.to_string())
}

pub(crate) fn token_arg(s: &str) -> Result<TokenAddress, String> {
    TokenAddress::from_hex(s).map_err(|e| e.to_string())
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(path) = &cli.config_file {
        let config = VaultConfig::load_from(path)?;
        if VaultConfig::set_global(config).is_err() {
            log::warn!("Configuration already loaded; ignoring {}", path.display());
        }
    }

    match cli.command {
        Command::ViewKey { user_key } => keys::view_key(user_key),
        Command::Commit {
            shares,
            nullifier,
            spending_key,
            unlocks_at,
            nonce_commitment,
        } => keys::commit(shares, nullifier, spending_key, unlocks_at, nonce_commitment),
        Command::Keys {
            user_key,
            token,
            chain_id,
            nonce,
        } => {
            let chain_id = chain_id.unwrap_or(VaultConfig::global().chain.chain_id);
            keys::keys(user_key, token, chain_id, nonce)
        }
        Command::Tree { command } => tree::run(command),
        Command::Reconstruct(args) => reconstruct::run(args, VaultConfig::global()),
        Command::Config { command } => match command {
            ConfigCommand::Sample => {
                print!("{}", VaultConfig::generate_sample());
                Ok(())
            }
            ConfigCommand::Show => print_json(VaultConfig::global()),
        },
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}
