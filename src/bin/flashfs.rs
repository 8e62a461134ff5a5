//! flashfs CLI
//!
//! Command-line access to a flashlog image.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flashlog::{Config, OpenMode, Result, Volume};
use tracing_subscriber::{fmt, EnvFilter};

/// flashfs
#[derive(Parser, Debug)]
#[command(name = "flashfs")]
#[command(about = "Inspect and modify an emulated flash filesystem image")]
#[command(version)]
struct Args {
    /// Flash image file
    #[arg(short, long, default_value = "flash.img")]
    image: PathBuf,

    /// Sector size in bytes
    #[arg(long, default_value = "65536")]
    sector_size: u32,

    /// Number of sectors
    #[arg(long, default_value = "20")]
    sector_count: u32,

    /// Log slot size in bytes
    #[arg(long, default_value = "1024")]
    entry_size: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Erase the whole device
    Format,

    /// List files
    Ls,

    /// Print a file to stdout
    Cat {
        /// File name
        name: String,
    },

    /// Replace a file's content
    Put {
        /// File name
        name: String,

        /// Content to write
        text: Option<String>,

        /// Read content from a host file instead
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Append text to a file
    Append {
        /// File name
        name: String,

        /// Content to append
        text: String,
    },

    /// Delete a file
    Rm {
        /// File name
        name: String,
    },

    /// Show log usage
    Stat,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flashlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("flashfs v{}", flashlog::VERSION);
    tracing::debug!("Image: {}", args.image.display());

    let config = Config::builder()
        .image_path(&args.image)
        .sector_size(args.sector_size)
        .sector_count(args.sector_count)
        .log_entry_size(args.entry_size)
        .build();

    if let Err(e) = run(&config, args.command) {
        tracing::error!("flashfs failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config, command: Commands) -> Result<()> {
    let volume = Volume::open(config)?;

    match command {
        Commands::Format => volume.format()?,
        Commands::Ls => {
            for name in volume.file_names()? {
                let size = volume.with_filesystem(|fs| {
                    let handle = fs.open_file(&name)?;
                    fs.file_size(handle)
                })?;
                println!("{:>8}  {}", size, name);
            }
        }
        Commands::Cat { name } => {
            let mut file = volume.open_file(&name, OpenMode::Read)?;
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            io::stdout().write_all(&content)?;
            file.close()?;
        }
        Commands::Put { name, text, from } => {
            let content = match (from, text) {
                (Some(path), _) => std::fs::read(path)?,
                (None, Some(text)) => text.into_bytes(),
                (None, None) => {
                    let mut buf = Vec::new();
                    io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let mut file = volume.open_file(&name, OpenMode::Write)?;
            file.write_all(&content)?;
            file.close()?;
        }
        Commands::Append { name, text } => {
            let mut file = volume.open_file(&name, OpenMode::Append)?;
            file.write_all(text.as_bytes())?;
            file.close()?;
        }
        Commands::Rm { name } => volume.remove(&name)?,
        Commands::Stat => {
            volume.with_filesystem(|fs| -> Result<()> {
                let files = fs.file_names()?.len();
                let layout = *fs.layout();
                println!("files:        {}", files);
                println!("slot size:    {}", layout.entry_size());
                println!("max payload:  {}", layout.max_payload());
                println!("slots used:   {}", fs.append_cursor());
                println!("slots free:   {}", fs.free_slots());
                println!("slots total:  {}", layout.total_entries());
                Ok(())
            })?;
        }
    }
    Ok(())
}
