use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Helium Command Line Interface
///
/// Resolves application artifacts and runs packaged applications outside
/// of a notebook.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log at debug level
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve artifact coordinates and print the classpath
    Resolve {
        /// Comma separated artifact coordinates
        #[clap(long)]
        artifact: String,

        /// Loader configuration file
        #[clap(long)]
        config: Option<PathBuf>,
    },

    /// Load a package, run it and unload it
    Run {
        /// Package descriptor (JSON)
        #[clap(long)]
        package: PathBuf,

        /// Note the instance is bound to
        #[clap(long, default_value = "cli")]
        note: String,

        /// Paragraph the instance is bound to
        #[clap(long, default_value = "cli")]
        paragraph: String,

        /// Instance id; generated when omitted
        #[clap(long)]
        instance: Option<String>,

        /// Number of runs
        #[clap(long, default_value_t = 1)]
        times: usize,

        /// Loader configuration file
        #[clap(long)]
        config: Option<PathBuf>,

        /// Directory local artifact paths are resolved against
        #[clap(long)]
        local_root: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Resolve { artifact, config } => {
            commands::resolve::resolve(&artifact, config.as_deref()).await
        }
        Commands::Run {
            package,
            note,
            paragraph,
            instance,
            times,
            config,
            local_root,
        } => {
            let options = commands::run::RunOptions {
                package,
                note,
                paragraph,
                instance,
                times,
                config,
                local_root,
            };
            commands::run::run(options).await
        }
    }
}
