use std::{fs, path::PathBuf};

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose};
use clap::{Parser, Subcommand};
use interop::{
    address::{build_flow_address, parse_address},
    cfg::read_config,
    crypto::{SigningCredential, generate_nonce, hash_message, signed_message},
    policy::VerificationPolicy,
    types::{FlowSpec, InteropRequestSpec},
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(about = "Offline tools for remote view requests")]
struct Args {
    #[clap(long, default_value = "false")]
    log_json: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build or inspect view addresses.
    #[clap(subcommand)]
    Address(AddressCommand),
    /// Print the verification criteria a policy document assigns to an address.
    Criteria {
        /// JSON verification policy document.
        #[clap(long)]
        policy: PathBuf,
        #[clap(long)]
        address: String,
    },
    /// Sign a request for an address with a fresh nonce.
    Sign {
        /// PEM-encoded PKCS#8 private key.
        #[clap(long)]
        key: PathBuf,
        #[clap(long)]
        address: String,
    },
    /// Load a configuration file and its credentials.
    CheckConfig {
        #[clap(long, short, default_value = "interop.toml")]
        config_file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum AddressCommand {
    /// Address of the request described by a JSON request file.
    Build {
        #[clap(long)]
        request: PathBuf,
    },
    /// Address of a remote workflow described by a JSON flow file.
    Flow {
        #[clap(long)]
        flow: PathBuf,
        #[clap(long)]
        network_id: String,
        #[clap(long)]
        remote_url: String,
    },
    Parse {
        address: String,
    },
}

fn address(command: AddressCommand) -> Result<()> {
    match command {
        AddressCommand::Build { request } => {
            let request: InteropRequestSpec = serde_json::from_str(&fs::read_to_string(request)?)?;
            println!("{}", request.resolve_address());
        }
        AddressCommand::Flow {
            flow,
            network_id,
            remote_url,
        } => {
            let flow: FlowSpec = serde_json::from_str(&fs::read_to_string(flow)?)?;
            println!("{}", build_flow_address(&flow, &network_id, &remote_url));
        }
        AddressCommand::Parse { address } => {
            let parsed = parse_address(&address)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(std::io::stderr);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match args.command {
        Command::Address(command) => address(command)?,
        Command::Criteria { policy, address } => {
            let policy = VerificationPolicy::from_json(&fs::read(policy)?)?;
            let parsed = parse_address(&address)?;
            if policy.security_domain != parsed.network_segment {
                tracing::warn!(
                    security_domain = %policy.security_domain,
                    network = %parsed.network_segment,
                    "policy belongs to a different security domain than the address"
                );
            }
            let identifier = policy.matching_identifier(&parsed.view_segment);
            let output = json!({
                "pattern": identifier.map(|i| &i.pattern),
                "criteria": policy.criteria_for(&parsed.view_segment),
            });
            println!("{output}");
        }
        Command::Sign { key, address } => {
            let credential = SigningCredential::from_pem(&fs::read_to_string(key)?)?;
            let nonce = generate_nonce();
            let message = signed_message(&address, &nonce);
            let signature = credential.sign(&message)?;
            let output = json!({
                "address": address,
                "nonce": nonce,
                "hash": hex::encode(hash_message(&message)),
                "signature": general_purpose::STANDARD.encode(signature),
                "public_key": hex::encode(credential.verifying_key_sec1()),
            });
            println!("{output}");
        }
        Command::CheckConfig { config_file } => {
            let config = read_config(&config_file)?;
            let identity = config.load_identity()?;
            tracing::info!(
                network_id = %identity.network_id,
                org = %identity.org,
                curve = ?identity.credential.curve(),
                relay = %config.relay_endpoint,
                timeout = ?config.relay_timeout,
                "configuration ok"
            );
        }
    }

    Ok(())
}
