//! keysync CLI - inspect and mutate a shared key-value store file
//!
//! This is the command-line interface for keysync. It opens the store
//! file as one execution context and exposes the core operations over it.

use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use comfy_table::Table;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use keysync_core::{
    is_storage_enabled, parse_str, Environment, ParseMode, StorageEvent, StorageManager,
    StoreScope, VERSION,
};

/// keysync - mirror application state into a shared key-value store
#[derive(Parser)]
#[command(name = "keysync")]
#[command(version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the store file
    #[arg(short, long, global = true, env = "KEYSYNC_STORE")]
    store: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a JSON value under a key
    Set {
        #[arg(value_name = "KEY")]
        key: String,

        /// Value to store (JSON; with --relaxed, a loose literal)
        #[arg(value_name = "VALUE")]
        value: String,

        /// Accept relaxed literals (single quotes, unquoted keys)
        #[arg(long)]
        relaxed: bool,
    },

    /// Read the value under a key
    Get {
        #[arg(value_name = "KEY")]
        key: String,

        /// Value substituted when the key is absent or malformed (JSON)
        #[arg(long, default_value = "null")]
        default: String,

        /// Pretty-print the value
        #[arg(long)]
        pretty: bool,
    },

    /// Remove a key
    Remove {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// List all keys and their raw stored values
    List,

    /// Probe the store for writability
    Probe,

    /// Watch a key and print every change
    Watch {
        #[arg(value_name = "KEY")]
        key: String,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Set {
            key,
            value,
            relaxed,
        }) => {
            let env = open_environment(cli.store.as_deref())?;
            let parsed = parse_value(&value, relaxed)?;
            let manager =
                StorageManager::new(&env, &key, serde_json::Value::Null, StoreScope::Local)?;
            manager.set_value(&parsed)?;
            if !cli.quiet {
                println!("Set {}", key);
            }
        }
        Some(Commands::Get {
            key,
            default,
            pretty,
        }) => {
            let env = open_environment(cli.store.as_deref())?;
            let initial: serde_json::Value = serde_json::from_str(&default)
                .map_err(|e| anyhow::anyhow!("Invalid --default JSON: {}", e))?;
            let manager = StorageManager::new(&env, &key, initial, StoreScope::Local)?;
            let value = manager.get_value();
            if pretty {
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", value);
            }
        }
        Some(Commands::Remove { key }) => {
            let env = open_environment(cli.store.as_deref())?;
            env.area(StoreScope::Local).remove_item(&key)?;
            if !cli.quiet {
                println!("Removed {}", key);
            }
        }
        Some(Commands::List) => {
            let env = open_environment(cli.store.as_deref())?;
            let area = env.area(StoreScope::Local);
            let keys = area.keys()?;
            if cli.quiet {
                for key in keys {
                    println!("{}", key);
                }
            } else {
                let mut table = Table::new();
                table.set_header(vec!["KEY", "VALUE"]);
                for key in keys {
                    let value = area.get_item(&key)?.unwrap_or_default();
                    table.add_row(vec![key, value]);
                }
                println!("{}", table);
            }
        }
        Some(Commands::Probe) => {
            let env = open_environment(cli.store.as_deref())?;
            let area = env.area(StoreScope::Local);
            if is_storage_enabled(area.as_ref()) {
                if !cli.quiet {
                    println!("{}", "Storage probe: OK".green());
                }
            } else {
                eprintln!("{}", "Storage probe: FAILED".red());
                return Err(anyhow::anyhow!("store is not writable"));
            }
        }
        Some(Commands::Watch { key, interval_ms }) => {
            let env = open_environment(cli.store.as_deref())?;
            let manager =
                StorageManager::new(&env, &key, serde_json::Value::Null, StoreScope::Local)?;
            let _subscription = manager.subscribe(|value: &serde_json::Value| {
                println!("{} {}", Local::now().format("%H:%M:%S%.3f"), value);
            });
            if !cli.quiet {
                println!("Watching {} (ctrl-c to stop)", key.bold());
            }

            // Poll the file and replay external writes as change events.
            let area = env.area(StoreScope::Local);
            let mut last = area.get_item(&key)?;
            loop {
                sleep(Duration::from_millis(interval_ms.max(1)));
                let current = area.get_item(&key)?;
                if current != last {
                    env.announce(StorageEvent::new(&key, current.clone(), StoreScope::Local));
                    last = current;
                }
            }
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "keysync", &mut io::stdout());
        }
        None => {
            println!("keysync v{}", VERSION);
            println!("\nRun `keysync --help` for usage information.");
        }
    }

    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();
}

fn open_environment(store: Option<&str>) -> anyhow::Result<Environment> {
    let path = store
        .ok_or_else(|| anyhow::anyhow!("No store path provided. Use --store or KEYSYNC_STORE."))?;
    Ok(Environment::persistent(Path::new(path))?)
}

fn parse_value(raw: &str, relaxed: bool) -> anyhow::Result<serde_json::Value> {
    if relaxed {
        parse_str(raw, ParseMode::Relaxed)
            .ok_or_else(|| anyhow::anyhow!("Value is not a recognizable literal: {}", raw))
    } else {
        serde_json::from_str(raw).map_err(|e| {
            anyhow::anyhow!("Invalid JSON value (use --relaxed for loose literals): {}", e)
        })
    }
}
