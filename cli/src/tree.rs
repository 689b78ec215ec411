use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;
use veilvault_privacy::Scalar;
use veilvault_privacy::merkle::{MerkleProof, MerkleTree};

use crate::{print_json, scalar_arg};

#[derive(Subcommand, Debug)]
pub enum TreeCommand {
    /// Insert leaves in order and print the resulting snapshot
    Build {
        #[arg(long, value_delimiter = ',', value_parser = scalar_arg, required = true)]
        leaves: Vec<Scalar>,
    },

    /// Print an inclusion proof for one leaf
    Prove {
        #[arg(long, value_delimiter = ',', value_parser = scalar_arg, required = true)]
        leaves: Vec<Scalar>,
        #[arg(long)]
        index: u64,
    },

    /// Check a proof produced by `tree prove`
    Verify {
        /// JSON file holding the proof
        #[arg(long)]
        proof: PathBuf,
    },
}

pub fn run(command: TreeCommand) -> anyhow::Result<()> {
    match command {
        TreeCommand::Build { leaves } => {
            let tree = MerkleTree::from_leaves(leaves)?;
            print_json(&tree.snapshot())
        }
        TreeCommand::Prove { leaves, index } => {
            let tree = MerkleTree::from_leaves(leaves)?;
            print_json(&tree.generate_proof(index)?)
        }
        TreeCommand::Verify { proof } => {
            let contents = std::fs::read_to_string(&proof)
                .with_context(|| format!("Failed to read proof: {}", proof.display()))?;
            let proof: MerkleProof =
                serde_json::from_str(&contents).context("Failed to parse proof")?;
            let valid = proof.verify()?;
            print_json(&json!({ "valid": valid }))
        }
    }
}
