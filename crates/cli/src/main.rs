use clap::{Parser, Subcommand};
use sticky_core::sticky_files::StickyStore;
use sticky_core::CoreConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sticky")]
#[command(about = "Inspect and flush the sticky upload store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how many files, users and sessions are staged
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run an eviction sweep now
    Flush {
        /// Remove every staged session regardless of age
        #[arg(long)]
        force: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the configuration resolved from the environment
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sticky_files=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::from_env()?;

    match cli.command {
        Some(Commands::Stats { json }) => {
            let stats = StickyStore::new(cfg.store().clone()).stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else if stats.files == 0 {
                println!("No staged files in {}.", cfg.store().dir().display());
            } else {
                println!(
                    "Files: {}, Users: {}, Sessions: {}",
                    stats.files, stats.users, stats.sessions
                );
            }
        }
        Some(Commands::Flush { force, json }) => {
            let report = StickyStore::new(cfg.store().clone()).evict(force);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.root_purged {
                println!("Store was over capacity; removed {}", cfg.store().dir().display());
            } else {
                println!(
                    "Removed {} session(s) and {} user namespace(s)",
                    report.sessions_removed, report.users_removed
                );
            }
        }
        Some(Commands::Config) => {
            let store = cfg.store();
            println!("dir: {}", store.dir().display());
            println!("stickiness: {}s", store.stickiness().as_secs());
            println!("max_files_per_user: {}", store.max_files_per_user());
            println!("max_sticky_files: {}", store.max_sticky_files());
            println!("token_field: {}", cfg.token_field());
        }
        None => {
            println!("Use 'sticky --help' for commands");
        }
    }

    Ok(())
}
