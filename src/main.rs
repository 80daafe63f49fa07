//! Offline helpers for the MPC adapter: derive child addresses and compute
//! the digests the signer would be asked to sign.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mpc_adapter::eip712::{typed_data_digest, TypedData};
use mpc_adapter::kdf::{derive_epsilon, to_address, uncompressed_hex, RootPublicKey};
use mpc_adapter::utils::{decode_hex, hash_personal_message};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mpc-adapter")]
#[command(version)]
#[command(about = "NEAR chain-signature helpers for EVM accounts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the child public key and EVM address of a NEAR account
    Derive {
        /// MPC root key, `secp256k1:<base58>`
        #[arg(long)]
        root_key: String,
        #[arg(long)]
        account: String,
        #[arg(long, default_value = "ethereum,1")]
        path: String,
    },
    /// EIP-191 personal message digest
    HashMessage {
        #[arg(long)]
        message: String,
        /// Treat the message as 0x-hex bytes
        #[arg(long)]
        hex: bool,
    },
    /// EIP-712 digest of a typed-data JSON document
    HashTypedData {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct DeriveOutput {
    account_id: String,
    path: String,
    epsilon: String,
    public_key: String,
    address: String,
}

#[derive(Serialize)]
struct MessageOutput {
    digest: String,
}

#[derive(Serialize)]
struct TypedDataOutput {
    domain_separator: String,
    struct_hash: String,
    digest: String,
}

fn hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Derive { root_key, account, path } => {
            let root = RootPublicKey::parse(&root_key)?;
            let child = root.derive(&account, &path)?;
            let output = DeriveOutput {
                epsilon: hex32(&derive_epsilon(&account, &path).to_be_bytes()),
                public_key: uncompressed_hex(&child),
                address: to_address(&child),
                account_id: account,
                path,
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Account:    {}", output.account_id);
                println!("Path:       {}", output.path);
                println!("Epsilon:    {}", output.epsilon);
                println!("Public key: {}", output.public_key);
                println!("Address:    {}", output.address);
            }
        }
        Commands::HashMessage { message, hex } => {
            let bytes = if hex {
                decode_hex(&message).context("message is not valid hex")?
            } else {
                message.into_bytes()
            };
            let output = MessageOutput {
                digest: hex32(&hash_personal_message(&bytes)),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", output.digest);
            }
        }
        Commands::HashTypedData { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let typed_data = TypedData::from_json(&json)?;
            let hashes = typed_data_digest(&typed_data)?;
            let output = TypedDataOutput {
                domain_separator: hex32(&hashes.domain_separator),
                struct_hash: hex32(&hashes.struct_hash),
                digest: hex32(&hashes.digest),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Domain separator: {}", output.domain_separator);
                println!("Struct hash:      {}", output.struct_hash);
                println!("Digest:           {}", output.digest);
            }
        }
    }

    Ok(())
}
