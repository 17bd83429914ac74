mod cli;
mod output;

use anyhow::Context as _;
use clap::Parser;
use kube_count::{
    catalog::DiscoveryCatalog, kubeconfig::make_client, multiwatch::KubeSource, CounterController,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = cli::Args::parse();
    tracing::debug!(args = ?args, "parsed command-line arguments");

    let client = make_client(&args.client_options())
        .await
        .context("failed to create controller")?;
    let controller = CounterController::new(
        DiscoveryCatalog::new(client.clone()),
        Arc::new(KubeSource::new(client)),
        args.count_config(),
    );
    let records = controller
        .run(&args.kinds, &args.aggregate_options())
        .await
        .context("failed to list resources")?;

    let rendered = output::render(&records, args.output_format)?;
    print!("{}", rendered);
    Ok(())
}
