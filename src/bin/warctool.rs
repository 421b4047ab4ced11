use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use warcstream::record::header::{WARC_RECORD_ID, WARC_TARGET_URI};
use warcstream::{Block, WarcFileReader};

#[derive(Parser)]
#[command(name = "warctool")]
#[command(about = "Inspect WARC files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List offset, type and record id for every record in the given files
    Ls {
        /// WARC files to list, plain or per-record gzip
        files: Vec<PathBuf>,
    },
    /// Print records (headers and block) from a file
    Cat {
        /// WARC file to read
        file: PathBuf,
        /// Byte offset of the first record to print
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Stop after printing this many records
        #[arg(long)]
        limit: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ls { files } => {
            for file in files {
                ls(&file)?;
            }
        }
        Command::Cat {
            file,
            offset,
            limit,
        } => cat(&file, offset, limit)?,
    }
    Ok(())
}

fn ls(file: &PathBuf) -> Result<()> {
    let mut reader = WarcFileReader::open(file, 0)
        .with_context(|| format!("open {}", file.display()))?;
    println!("{}:", file.display());
    while let Some(entry) = reader.next()? {
        let record_type = entry
            .record
            .record_type()
            .map(|t| t.as_str())
            .unwrap_or("unknown");
        let id = entry.record.headers().get(WARC_RECORD_ID).unwrap_or("-");
        let uri = entry.record.headers().get(WARC_TARGET_URI).unwrap_or("");
        println!("{:>12} {:<12} {} {}", entry.offset, record_type, id, uri);
        if !entry.validation.is_valid() {
            log::warn!("{}@{}: {}", file.display(), entry.offset, entry.validation);
        }
    }
    Ok(())
}

fn cat(file: &PathBuf, offset: u64, limit: Option<u64>) -> Result<()> {
    let mut reader = WarcFileReader::open(file, offset)
        .with_context(|| format!("open {}", file.display()))?;
    let mut printed = 0u64;
    while let Some(entry) = reader.next()? {
        if let Some(limit) = limit {
            if printed >= limit {
                break;
            }
        }
        println!("{}", entry.record.version());
        for (name, value) in entry.record.headers().iter() {
            println!("{name}: {value}");
        }
        println!();
        match entry.record.block() {
            Block::WarcFields(fields) => {
                for (name, value) in fields {
                    println!("{name}: {value}");
                }
            }
            Block::Raw(bytes) | Block::Http(bytes) => {
                println!("{}", String::from_utf8_lossy(bytes));
            }
        }
        printed += 1;
    }
    Ok(())
}
