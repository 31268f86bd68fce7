use anyhow::Context;
use cive_verify::{
    chain::{supported_networks, RpcClient},
    cli::Args,
    verifier::resolve_arguments,
    Settings, Verifier,
};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::new(args.config.as_deref()).context("failed to load settings")?;

    if args.list_networks {
        println!("{}", supported_networks(&settings.confluxscan.custom_chains));
        return Ok(());
    }

    if !settings.confluxscan.enabled {
        log::warn!("No verification services are enabled.");
        return Ok(());
    }

    let verification_args = resolve_arguments(args.verify_request()).await?;
    let chain = RpcClient::new(settings.network.url.clone())?;
    Verifier::new(Arc::new(chain), settings)
        .verify(&verification_args)
        .await?;
    Ok(())
}
