use anyhow::Context;
use clap::Parser;
use kube::CustomResourceExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqeletor::config::Settings;
use sqeletor::crds::{SqlInstance, SqlSslCert, SqlUser};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Args {
    /// Run the controllers
    Run(Settings),
    /// Print the CRDs sqeletor reads, for local test clusters
    Crds,
}

fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("invalid log filter")?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if settings.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

fn print_crds() -> anyhow::Result<()> {
    let crds = [SqlSslCert::crd(), SqlInstance::crd(), SqlUser::crd()];
    let docs = crds
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to serialize CRDs")?;
    println!("{}", docs.join("---\n"));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args {
        Args::Crds => {
            print_crds()?;
        }
        Args::Run(settings) => {
            init_logging(&settings)?;

            PrometheusBuilder::new()
                .with_http_listener(settings.metrics_addr)
                .install()
                .context("failed to install Prometheus exporter")?;
            info!(address = %settings.metrics_addr, "serving metrics");

            sqeletor::run(settings).await?;
        }
    };

    Ok(())
}
