//! Binary entrypoint for the meshparrot CLI.
//!
//! Commands:
//! - `start` - connect to the MQTT broker and run the parrot
//! - `init` - create a starter `config.toml`
//!
//! See the library crate docs for module-level details: `meshparrot::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use meshparrot::config::Config;
use meshparrot::parrot::ParrotServer;

#[derive(Parser)]
#[command(name = "meshparrot")]
#[command(about = "An MQTT parrot bot for Meshtastic mesh networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the parrot
    Start,
    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting meshparrot v{}", env!("CARGO_PKG_VERSION"));

            let server = ParrotServer::new(config)?;
            server.run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            if tokio::fs::try_exists(&cli.config).await.unwrap_or(false) {
                eprintln!("Refusing to overwrite existing {}", cli.config);
                std::process::exit(1);
            }
            Config::create_default(&cli.config).await?;
            info!("Wrote default configuration to {}", cli.config);
            println!(
                "Created {}. Edit the node id and channel key before starting.",
                cli.config
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level: config's logging.level, raised by CLI verbosity.
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file_sink = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file_sink {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // If stdout is a terminal, echo log lines there as well as the file.
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
