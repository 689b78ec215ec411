use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use veilvault_config::{CacheBackend, VaultConfig};
use veilvault_core::{MemoryCache, MemoryLedger, NoteCache, Reconstruction, Reconstructor, SessionContext};
use veilvault_privacy::Scalar;
use veilvault_privacy::keys::{TokenAddress, UserKey};

use crate::{print_json, scalar_arg, token_arg};

#[derive(Args, Debug)]
pub struct ReconstructArgs {
    /// Ledger dump (defaults to `[ledger] path`)
    #[arg(long)]
    ledger: Option<PathBuf>,

    #[arg(long, value_parser = scalar_arg)]
    user_key: Scalar,

    /// May be repeated to reconstruct several tokens at once
    #[arg(long, value_parser = token_arg, required = true)]
    token: Vec<TokenAddress>,

    /// Exclusive upper bound of the nonces to replay
    #[arg(long)]
    nonce: u64,

    #[arg(long, env = "VV_CHAIN_ID")]
    chain_id: Option<u64>,

    /// RocksDB cache directory (defaults to `[cache] path`)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Skip the cache entirely
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,
}

#[derive(Serialize)]
struct TokenReport<'a> {
    token: TokenAddress,
    #[serde(flatten)]
    result: &'a Reconstruction,
}

pub fn run(args: ReconstructArgs, config: &VaultConfig) -> anyhow::Result<()> {
    let ledger_path = args
        .ledger
        .or_else(|| config.ledger.path.as_ref().map(PathBuf::from))
        .context("No ledger dump given (use --ledger or set [ledger] path)")?;
    let ledger = MemoryLedger::load(&ledger_path)?;

    let mirror = if config.reconstruction.attach_membership {
        Some(ledger.tree_mirror()?)
    } else {
        None
    };

    let chain_id = args.chain_id.unwrap_or(config.chain.chain_id);
    let user_key = UserKey::from_scalar(args.user_key);
    let jobs: Vec<(SessionContext, u64)> = args
        .token
        .iter()
        .map(|token| (SessionContext::new(user_key, chain_id, *token), args.nonce))
        .collect();

    let mut engine = Reconstructor::new(&ledger);
    if let Some(tree) = mirror.as_ref() {
        engine = engine.with_tree(tree);
    }

    let results = if args.no_cache {
        engine.reconstruct_many(&jobs, config.reconstruction.max_parallel_accounts)
    } else {
        let cache = open_cache(config, args.cache)?;
        jobs.iter()
            .map(|(ctx, nonce)| engine.reconstruct_incremental(ctx, *nonce, cache.as_ref()))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    for result in &results {
        for diagnostic in &result.diagnostics {
            log::info!("{diagnostic}");
        }
    }

    let reports: Vec<TokenReport> = jobs
        .iter()
        .zip(&results)
        .map(|((ctx, _), result)| TokenReport {
            token: *ctx.token(),
            result,
        })
        .collect();
    print_json(&reports)
}

/// An explicit cache directory always means an on-disk cache.
fn cache_backend(config: &VaultConfig, path: Option<&Path>) -> CacheBackend {
    match (config.cache.backend, path) {
        (CacheBackend::Memory, Some(path)) => {
            log::info!(
                "Using a RocksDB cache at {} instead of the configured memory backend",
                path.display()
            );
            CacheBackend::Rocksdb
        }
        (backend, _) => backend,
    }
}

fn open_cache(config: &VaultConfig, path: Option<PathBuf>) -> anyhow::Result<Box<dyn NoteCache>> {
    match cache_backend(config, path.as_deref()) {
        CacheBackend::Memory => Ok(Box::new(MemoryCache::new())),
        #[cfg(feature = "rocksdb")]
        CacheBackend::Rocksdb => {
            let path = path.unwrap_or_else(|| PathBuf::from(&config.cache.path));
            Ok(Box::new(veilvault_core::RocksCache::open(path)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        CacheBackend::Rocksdb => {
            if let Some(path) = path {
                log::warn!("Built without RocksDB support; ignoring cache directory {}", path.display());
            } else {
                log::warn!("Built without RocksDB support; using an in-memory cache");
            }
            Ok(Box::new(MemoryCache::new()))
        }
    }
}
