// goldrl command-line interface
// Inspect RAM dumps, event flags, ROM map connections and task plans

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "goldrl")]
#[command(about = "Pokémon Gold RL inspection tools", version)]
struct Cli {
    /// Configuration file supplying default ROM and plan paths
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a RAM dump into a game snapshot (JSON)
    Snapshot {
        /// RAM dump file
        ram: PathBuf,

        /// Address of the first byte in the dump
        #[arg(long, default_value = "0", value_parser = commands::parse_u16)]
        base: u16,

        /// Cartridge image for map connections
        #[arg(long)]
        rom: Option<PathBuf>,

        /// Print on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Locate an event flag by name or id
    Flag {
        /// Registry name, or a numeric id such as 0x1A00
        flag: String,

        /// RAM dump to read the bit from
        #[arg(long)]
        ram: Option<PathBuf>,

        #[arg(long, default_value = "0", value_parser = commands::parse_u16)]
        base: u16,
    },

    /// List registry flags
    Flags {
        /// Case-insensitive name filter
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Show the connections of one map from the ROM header tables
    Connections {
        /// Cartridge image; defaults to the configured ROM
        #[arg(long)]
        rom: Option<PathBuf>,

        #[arg(long)]
        bank: u8,

        #[arg(long)]
        map: u8,
    },

    /// Show a task plan and, given a RAM dump, how far it has progressed
    Plan {
        /// Plan file; defaults to the configured plan
        #[arg(long)]
        plan: Option<PathBuf>,

        #[arg(long)]
        ram: Option<PathBuf>,

        #[arg(long, default_value = "0", value_parser = commands::parse_u16)]
        base: u16,

        /// Write the opening plan first if the file does not exist
        #[arg(long)]
        init: bool,
    },

    /// Hex dump of an address range
    Peek {
        ram: PathBuf,

        #[arg(long, default_value = "0", value_parser = commands::parse_u16)]
        base: u16,

        #[arg(long, value_parser = commands::parse_u16)]
        start: u16,

        /// Inclusive end address
        #[arg(long, value_parser = commands::parse_u16)]
        end: u16,
    },

    /// List the address map, decoding each field when a dump is given
    Fields {
        #[arg(long)]
        ram: Option<PathBuf>,

        #[arg(long, default_value = "0", value_parser = commands::parse_u16)]
        base: u16,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write it to this file instead
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Snapshot { ram, base, rom, compact } => {
            commands::snapshot(&config, &ram, base, rom, compact)?;
        }
        Commands::Flag { flag, ram, base } => {
            commands::flag(&flag, ram.as_deref(), base)?;
        }
        Commands::Flags { pattern } => {
            commands::flags(pattern.as_deref());
        }
        Commands::Connections { rom, bank, map } => {
            commands::connections(&config, rom, bank, map)?;
        }
        Commands::Plan { plan, ram, base, init } => {
            commands::plan(&config, plan, ram.as_deref(), base, init)?;
        }
        Commands::Peek { ram, base, start, end } => {
            commands::peek(&ram, base, start, end)?;
        }
        Commands::Fields { ram, base } => {
            commands::fields(ram.as_deref(), base)?;
        }
        Commands::Config { output } => {
            commands::config(&config, output.as_deref())?;
        }
    }

    Ok(())
}
