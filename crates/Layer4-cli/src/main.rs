//! BotHarbor CLI - Main entry point

use clap::{Parser, Subcommand};
use harbor_foundation::{HarborConfig, JsonStore};
use harbor_supervisor::Supervisor;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// BotHarbor - host uploaded scripts as supervised child processes
#[derive(Parser, Debug)]
#[command(name = "harbor")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Data directory (scripts, logs and pid registry live here).
    /// Defaults to the platform data dir, e.g. ~/.local/share/botharbor
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a script as a new bot
    Upload {
        /// Script file to upload
        file: PathBuf,

        /// Bot name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Start the bot right after the upload
        #[arg(long)]
        start: bool,
    },
    /// Start a bot
    Start { name: String },
    /// Stop a bot (best-effort, signals the whole process group)
    Stop { name: String },
    /// Show one bot's status
    Status { name: String },
    /// List all bots
    List,
    /// Show the tail of a bot's log
    Logs {
        name: String,

        /// Number of lines to show
        #[arg(short = 'n', long)]
        lines: Option<usize>,
    },
    /// Stop a bot and remove its script
    Delete { name: String },
    /// Scan a bot's log for a missing dependency and try one install+restart
    Heal { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

    // Load configuration from the data dir (defaults if absent)
    let store = JsonStore::new(&data_dir);
    let config = HarborConfig::load(&store).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        HarborConfig::default()
    });

    let supervisor = Supervisor::open(&data_dir, config).await?;

    match run(args.command, &supervisor).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_user_facing() => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("botharbor"))
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn run(command: Command, supervisor: &Supervisor) -> harbor_foundation::Result<()> {
    match command {
        Command::Upload { file, name, start } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_string())
                    .ok_or_else(|| {
                        harbor_foundation::Error::InvalidName(format!(
                            "{}: not a usable file name",
                            file.display()
                        ))
                    })?,
            };
            let bytes = std::fs::read(&file)?;
            let unit = supervisor.upload(&name, &bytes).await?;
            println!("✓ Uploaded {}", unit.name);
            if start {
                let pid = supervisor.start(&unit.name).await?;
                println!("▶ Started {} (pid {})", unit.name, pid);
            }
        }
        Command::Start { name } => {
            let pid = supervisor.start(&name).await?;
            println!("▶ Started {} (pid {})", name, pid);
        }
        Command::Stop { name } => {
            supervisor.stop(&name).await?;
            println!("⏹ Stopped {}", name);
        }
        Command::Status { name } => {
            let status = supervisor.status(&name).await?;
            println!("{} {} - {}", status.state.symbol(), status.name, status.state);
            if let Some(pid) = status.pid {
                println!("  pid: {}", pid);
            }
            if let Some(cpu) = status.cpu_percent {
                println!("  cpu: {:.1}%", cpu);
            }
            if let Some(mem) = status.mem_percent {
                println!("  mem: {:.1}%", mem);
            }
        }
        Command::List => {
            let bots = supervisor.list().await?;
            if bots.is_empty() {
                println!("No bots uploaded yet.");
            }
            for bot in bots {
                let symbol = if bot.running { "🟢" } else { "🔴" };
                println!("{} {}", symbol, bot.name);
            }
        }
        Command::Logs { name, lines } => {
            let lines = lines.unwrap_or(supervisor.config().default_tail_lines);
            for line in supervisor.tail_log(&name, lines).await? {
                println!("{}", line);
            }
        }
        Command::Delete { name } => {
            supervisor.delete(&name).await?;
            println!("🗑 Deleted {}", name);
        }
        Command::Heal { name } => {
            match supervisor.scan_for_missing_module(&name).await? {
                Some(module) => {
                    println!("Found missing module '{}', installing...", module);
                    let pid = supervisor.remediate(&name, &module).await?;
                    println!("▶ Restarted {} (pid {})", name, pid);
                }
                None => {
                    println!("No recognizable missing-module failure in {}'s log.", name);
                }
            }
        }
    }
    Ok(())
}
