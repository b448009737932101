use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pgextver::catalog::Catalog;
use pgextver::reconcile::reconcile;
use pgextver::registry::GitHubReleases;
use pgextver::report;

#[derive(Parser)]
#[command(name = "pgextver")]
#[command(version, about = "Compare installed PostgreSQL component versions against upstream releases")]
struct Cli {
    /// Catalog file (JSON object of component specs); defaults to the
    /// built-in catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// JSON object mapping extension name to installed version, as reported
    /// by `SELECT extname, extversion FROM pg_extension`
    #[arg(long)]
    installed: PathBuf,

    /// Version string reported by `SHOW server_version`
    #[arg(long)]
    server_version: String,

    /// Only show components with a newer upstream release
    #[arg(long)]
    only_outdated: bool,

    /// Suppress the report table
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("failed to load catalog from {}", path.display()))?,
        None => Catalog::builtin(),
    };

    let installed: HashMap<String, String> = {
        let raw = std::fs::read_to_string(&cli.installed).with_context(|| {
            format!(
                "failed to read installed versions from {}",
                cli.installed.display()
            )
        })?;
        serde_json::from_str(&raw).context("installed versions must be a JSON object")?
    };

    let token = std::env::var("GITHUB_TOKEN").ok();
    let releases = GitHubReleases::new(pgextver::registry::github::DEFAULT_BASE_URL, token);

    let records = reconcile(&catalog, &installed, &cli.server_version, &releases).await;
    let display = if cli.only_outdated {
        report::only_outdated(&records)
    } else {
        records
    };

    if !cli.quiet {
        if display.is_empty() && cli.only_outdated {
            println!("All tracked components are up to date.");
        } else {
            print!("{}", report::render_table(&display));
        }
    }

    Ok(())
}
