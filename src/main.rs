//! CLI entry point for spacetravelling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetravelling::generator::Generator;
use spacetravelling::Site;

#[derive(Parser)]
#[command(name = "spacetravelling")]
#[command(version)]
#[command(about = "A static blog generator for posts stored in Prismic", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate,

    /// Start a local server that regenerates stale pages
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Skip the initial full generation; pages are built on first request
        #[arg(long)]
        lazy: bool,
    },

    /// Clean the public folder
    Clean,

    /// List posts of the home page
    List {
        /// Follow every page instead of only the first one
        #[arg(short, long)]
        all: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetravelling=debug,info"
    } else {
        "spacetravelling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            spacetravelling::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::Generate => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Generating static files...");
            site.generate().await?;
            println!("Generated successfully!");
        }

        Commands::Server {
            port,
            ip,
            open,
            lazy,
        } => {
            let site = Site::new(&base_dir)?;
            let generator = Generator::new(&site, site.fetcher()?)?;

            if !lazy {
                tracing::info!("Generating static files...");
                if let Err(e) = generator.generate().await {
                    tracing::warn!("Initial generation failed, pages will be built on demand: {}", e);
                }
            }

            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetravelling::server::start(generator, &ip, port, open).await?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { all } => {
            let site = Site::new(&base_dir)?;
            spacetravelling::commands::list::run(&site, all).await?;
        }

        Commands::Version => {
            println!("spacetravelling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
