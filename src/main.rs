mod commands;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use plugin_feed::config::{Config, OutputFormat, OutputLimit, StabilityFilter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plugin-feed")]
#[command(author, version, about = "Release feeds for software plugins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render release feeds for one or more plugins
    Feed {
        /// Plugin ids
        #[arg(required = true)]
        plugins: Vec<String>,

        /// Output format (overrides OUTPUT_FORMAT)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Write <plugin>.<ext> files into this directory instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep fetched pages in memory only
        #[arg(long)]
        no_cache: bool,
    },

    /// List the releases found for a plugin
    Releases {
        /// Plugin id
        plugin: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Manage the page cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Remove expired entries
    Clear,
}

#[derive(Args)]
struct FilterArgs {
    /// Maximum number of releases, 0 for all (overrides OUTPUT_LIMIT)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Comma separated stabilities: stable, alpha, beta, rc or any (overrides RELEASE_STABILITY)
    #[arg(short, long)]
    stability: Option<String>,
}

impl FilterArgs {
    fn apply(&self, config: &mut Config) -> plugin_feed::Result<()> {
        if let Some(limit) = self.limit {
            config.output_limit = OutputLimit::from_count(limit);
        }
        if let Some(stability) = &self.stability {
            config.stability = StabilityFilter::parse(stability)?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("plugin_feed=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let mut config = Config::from_env()?;

    match cli.command {
        Some(Commands::Feed {
            plugins,
            format,
            filter,
            output,
            no_cache,
        }) => {
            filter.apply(&mut config)?;
            if let Some(format) = format {
                config.format = format;
            }

            let failed = commands::feed(&config, &plugins, output.as_deref(), no_cache).await?;
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Some(Commands::Releases { plugin, filter }) => {
            filter.apply(&mut config)?;
            commands::releases(&config, &plugin).await?;
        }
        Some(Commands::Cache {
            command: CacheCommand::Clear,
        }) => {
            commands::cache_clear(&config)?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "plugin-feed",
                &mut std::io::stdout(),
            );
        }
        None => {
            println!("{} Release feeds for software plugins", "==>".bold().green());
            println!("\nRun {} to see available commands.", "plugin-feed --help".cyan());
        }
    }

    Ok(())
}
