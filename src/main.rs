use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use nixsearch::{
    config::Config,
    context::Context,
    model::{Collection, Index},
    output::{print_record, print_results, print_stats, OutputFormat},
    refresh::{ReleaseFetcher, Refresher},
    search::search,
    server::{self, AppState},
    snapshot::SnapshotFile,
    store::IndexHandle,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nixsearch")]
#[command(
    author,
    version,
    about = "Search NixOS, Home Manager and nix-darwin options and Nixpkgs/NUR packages"
)]
struct Cli {
    /// Index snapshot to use instead of the configured one
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP search API and refresh the index periodically
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search the local index snapshot
    Search {
        /// Query terms, e.g. `package ^rip` or `option !darwin nginx`
        #[arg(required = true, allow_hyphen_values = true)]
        terms: Vec<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Maximum number of results to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show one option or package
    Show {
        /// Collection (nixos, home-manager, darwin, nixpkgs, nur)
        collection: String,

        /// Attribute path of the record
        key: String,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Download the upstream dumps and rebuild the local index snapshot
    Refresh,

    /// Show record counts of the local index snapshot
    Stats {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nixsearch=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { init, path } = cli.command {
        return handle_config(init, path);
    }

    let mut config = Config::load()?.apply_env()?;
    if let Some(index) = cli.index {
        config.index_path = index;
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            run_serve(config).await
        }
        Commands::Search {
            terms,
            format,
            limit,
        } => {
            let format = parse_format(&format)?;
            let index = load_index(&config)?;
            let results = search(&index, &terms.join(" "));
            let shown = &results[..results.len().min(limit)];
            print_results(shown, results.len(), format)
        }
        Commands::Show {
            collection,
            key,
            format,
        } => {
            let format = parse_format(&format)?;
            let collection: Collection = collection.parse().map_err(|e: String| anyhow!(e))?;
            let index = load_index(&config)?;
            match index.get(collection, &key) {
                Some(entry) => print_record(&key, entry, format),
                None => bail!("{} not found in {}", key, collection.display_name()),
            }
        }
        Commands::Refresh => run_refresh(&config).await,
        Commands::Stats { format } => {
            let format = parse_format(&format)?;
            let index = load_index(&config)?;
            print_stats(&index.info, format)
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn run_serve(config: Config) -> Result<()> {
    let every = config.refresh_interval()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let mut context = Context::from_config(&config).await;
    context.spawn_refresh_loop(every);

    let state = AppState::new(Arc::clone(context.index()), config.per_page);
    server::serve(listener, state, shutdown_signal()).await?;

    context.shutdown().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn run_refresh(config: &Config) -> Result<()> {
    let refresher = Refresher::new(
        ReleaseFetcher::new(config.release_url.clone()),
        Arc::new(IndexHandle::default()),
        Some(SnapshotFile::new(config.index_path.clone())),
    );

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Downloading and indexing...");

    match refresher.refresh().await {
        Ok(index) => {
            pb.finish_with_message(format!(
                "Indexed {} records into {}",
                index.total(),
                config.index_path.display()
            ));
            Ok(())
        }
        Err(e) => {
            pb.finish_and_clear();
            Err(e.into())
        }
    }
}

fn load_index(config: &Config) -> Result<Index> {
    let snapshot = SnapshotFile::new(config.index_path.clone());
    snapshot.load()?.ok_or_else(|| {
        anyhow!(
            "no index at {}. Run 'nixsearch refresh' first.",
            snapshot.path().display()
        )
    })
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    format.parse().map_err(|e: String| anyhow!(e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'nixsearch config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
