//! Command-line entry point for the offchain data resolver.
//!
//! Loads a configuration file, builds a resolver from it, and either
//! simulates a call with any required offchain data resolved (`call`) or
//! prints the resolved bundle ready to be signed and sent (`prepare`).

use alloy_primitives::{Address, Bytes, U256};
use clap::{Args as ClapArgs, Parser, Subcommand};
use resolver_config::Config;
use resolver_types::Transaction;
use std::path::PathBuf;

mod factory_registry;

/// Command-line arguments for the resolver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Simulate a call and print its return data
	Call(CallArgs),
	/// Print the bundle that simulates successfully, as JSON
	Prepare(CallArgs),
}

/// The call to resolve.
#[derive(ClapArgs, Debug)]
struct CallArgs {
	/// Target contract
	#[arg(long)]
	to: Address,

	/// Hex-encoded calldata
	#[arg(long)]
	data: Bytes,

	/// Sender of the call
	#[arg(long)]
	from: Option<Address>,

	/// Value attached to the call, in wei
	#[arg(long)]
	value: Option<U256>,
}

impl From<CallArgs> for Transaction {
	fn from(args: CallArgs) -> Self {
		Transaction {
			from: args.from,
			to: Some(args.to),
			data: Some(args.data),
			value: args.value,
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Logs go to stderr so that results on stdout stay machine-readable.
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(path = %args.config.display(), "Loaded configuration");

	let resolver = factory_registry::build_resolver_from_config(config)?;

	match args.command {
		Command::Call(call) => {
			let results = resolver.call_with_offchain_data(&[call.into()]).await?;
			for data in results {
				println!("{}", data);
			}
		},
		Command::Prepare(call) => {
			let bundle = resolver.prepare_transaction(&[call.into()]).await?;
			println!("{}", serde_json::to_string_pretty(&bundle)?);
		},
	}

	Ok(())
}
