//! Quote gateway server binary.

// std
use std::{process::ExitCode, sync::Arc};
// self
use quote_gateway::{
	config::{self, GatewayConfig},
	obs,
	pipeline::Gateway,
	server,
};

#[tokio::main]
async fn main() -> ExitCode {
	// `.env` may carry `RUST_LOG`, so it is merged before the subscriber reads the filter.
	let env_file = config::load_env_file();

	obs::init_tracing();

	if let Err(e) = env_file {
		tracing::warn!(error = %e, "Ignoring unreadable .env file.");
	}

	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = %e, "Quote gateway stopped with an error.");

			ExitCode::FAILURE
		},
	}
}

async fn run() -> quote_gateway::error::Result<()> {
	let config = GatewayConfig::from_env()?;
	let addr = config.listen_addr;
	let gateway = Arc::new(Gateway::new(config)?);
	let sweepers = gateway.spawn_sweepers();

	server::serve(gateway, addr).await?;
	sweepers.stop().await;

	Ok(())
}
