//! `sombra-leaf`: inspect B-tree leaf pages stored in a page file.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sombra_btree_leaf::config::LeafConfig;
use sombra_btree_leaf::primitives::pager::{FilePageStore, PageStore};
use sombra_btree_leaf::storage::btree::page::{self, LeafHeader};
use sombra_btree_leaf::types::{PageId, SombraError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sombra-leaf",
    version,
    about = "Inspect B-tree leaf pages",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "SOMBRA_CONFIG",
        value_name = "FILE",
        help = "TOML config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "SOMBRA_LOG",
        value_name = "FILTER",
        help = "tracing filter directives (overrides the config)"
    )]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one leaf page header, offset table and raw rows.
    Inspect(InspectCmd),
}

#[derive(Args, Debug)]
struct InspectCmd {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long, value_name = "ID", help = "Page id to decode")]
    page: u32,

    #[arg(long, help = "Page size in bytes (defaults to the config value)")]
    page_size: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize, Debug)]
struct PageReport {
    page: u32,
    page_size: usize,
    parent: Option<u32>,
    table: u32,
    position_only: bool,
    entry_count: u16,
    free_space: usize,
    slots: Vec<SlotReport>,
}

#[derive(Serialize, Debug)]
struct SlotReport {
    slot: usize,
    offset: usize,
    len: usize,
    bytes: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LeafConfig::load(path)?,
        None => LeafConfig::default(),
    };
    init_tracing(cli.log.as_deref().unwrap_or_else(|| config.log_filter()));

    match cli.command {
        Command::Inspect(cmd) => {
            let page_size = cmd.page_size.unwrap_or_else(|| config.page_size());
            let report = inspect(&cmd, page_size)?;
            match cmd.format {
                OutputFormat::Text => print_text(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn inspect(cmd: &InspectCmd, page_size: usize) -> Result<PageReport, Box<dyn Error>> {
    if !cmd.file.is_file() {
        return Err(format!("{} does not exist", cmd.file.display()).into());
    }
    let store = FilePageStore::open(&cmd.file, page_size)?;
    debug!(
        path = %cmd.file.display(),
        page = cmd.page,
        pages = store.page_count(),
        "cli.inspect"
    );
    let data = store.read_page(PageId(cmd.page))?;
    let header = LeafHeader::parse(&data)?;
    let offsets = page::read_offsets(&data, header.entry_count)?;
    let mut slots = Vec::with_capacity(offsets.len());
    for slot in 0..offsets.len() {
        let (start, end) = page::slot_extent(&offsets, page_size, slot)?;
        if start < header.offsets_end() {
            return Err(SombraError::Corruption("row offset inside offset table").into());
        }
        slots.push(SlotReport {
            slot,
            offset: start,
            len: end - start,
            bytes: hex::encode(&data[start..end]),
        });
    }
    let rows_start = offsets.last().copied().unwrap_or(page_size);
    Ok(PageReport {
        page: cmd.page,
        page_size,
        parent: header.parent.map(|p| p.0),
        table: header.table.0,
        position_only: header.mode.is_position_only(),
        entry_count: header.entry_count,
        free_space: rows_start.saturating_sub(header.offsets_end()),
        slots,
    })
}

fn print_text(report: &PageReport) {
    println!("page {} (page size {})", report.page, report.page_size);
    match report.parent {
        Some(parent) => println!("  parent:     {parent}"),
        None => println!("  parent:     root"),
    }
    println!("  table:      {}", report.table);
    println!(
        "  rows:       {}",
        if report.position_only {
            "position-only"
        } else {
            "full"
        }
    );
    println!("  entries:    {}", report.entry_count);
    println!("  free space: {}", report.free_space);
    for slot in &report.slots {
        println!(
            "  [{:>3}] offset {:>5} len {:>4}  {}",
            slot.slot, slot.offset, slot.len, slot.bytes
        );
    }
}
