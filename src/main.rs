// Sat Jan 18 2026 - Alex

#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use remote_vm_scanner::{
    config::ScanConfig,
    memory::{Address, MemoryRange, ReadStatus, RegionDescriptor, RegionFilter, ScanDriver, VmPrimitives},
    search::{BytePattern, PatternSearch},
};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "vmscan")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Read-only virtual memory inspector for Mach tasks", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Target process id
    #[arg(short, long)]
    pid: i32,

    /// JSON scan configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    no_color: bool,

    #[arg(long)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the region map of the target
    Regions {
        #[arg(long)]
        json: bool,
    },
    /// Copy a byte range out of the target
    Dump {
        #[arg(short, long, value_parser = parse_u64)]
        address: u64,

        #[arg(short, long, value_parser = parse_u64)]
        length: u64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search readable memory for a byte pattern such as "48 8B ?? 05"
    Search {
        #[arg(long)]
        pattern: String,

        /// Only writable, non-executable regions
        #[arg(long)]
        writable: bool,

        #[arg(long, value_parser = parse_u64)]
        start: Option<u64>,

        #[arg(long, value_parser = parse_u64)]
        end: Option<u64>,

        #[arg(long, default_value = "100")]
        max_results: usize,
    },
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("'{}' is not a valid number: {}", s, e))
}

fn setup_logging(args: &Args) {
    let level = match args.log_level.as_deref().map(str::to_lowercase).as_deref() {
        Some("trace") => log::LevelFilter::Trace,
        Some("debug") => log::LevelFilter::Debug,
        Some("info") => log::LevelFilter::Info,
        Some("warn") => log::LevelFilter::Warn,
        Some("error") => log::LevelFilter::Error,
        Some(_) => log::LevelFilter::Info,
        None => match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        },
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }
    setup_logging(&args);

    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };

    #[cfg(target_os = "macos")]
    {
        use remote_vm_scanner::memory::TaskPort;

        let port = TaskPort::for_pid(args.pid).with_context(|| format!("Failed to attach to pid {}", args.pid))?;
        let driver = ScanDriver::new(port.task(), config)?;
        dispatch(&driver, args)
    }

    #[cfg(not(target_os = "macos"))]
    {
        let _ = config;
        Err(remote_vm_scanner::MemoryError::NotSupported(format!(
            "task ports are only available on macOS (pid {})",
            args.pid
        ))
        .into())
    }
}

fn dispatch<P: VmPrimitives>(driver: &ScanDriver<P>, args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Regions { json } => cmd_regions(driver, json),
        Command::Dump { address, length, output } => cmd_dump(driver, address, length, output),
        Command::Search {
            pattern,
            writable,
            start,
            end,
            max_results,
        } => {
            let pattern = BytePattern::parse(&pattern)?;
            let mut filter = driver.config().filter.clone();
            if writable {
                filter = RegionFilter::writable_data();
            }
            let bounds = match (start, end) {
                (None, None) => driver.config().bounds,
                (s, e) => Some(MemoryRange::new(
                    Address::new(s.unwrap_or(0)),
                    Address::new(e.unwrap_or(u64::MAX)),
                )?),
            };
            cmd_search(driver, pattern, filter, bounds, max_results, !args.no_progress)
        }
    }
}

fn cmd_regions<P: VmPrimitives>(driver: &ScanDriver<P>, json: bool) -> anyhow::Result<()> {
    let regions: Vec<RegionDescriptor> = driver.enumerator().regions().collect::<Result<_, _>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }

    println!("{}", "Region map".cyan().bold());
    println!("{}", "-".repeat(78).cyan());
    let mut total = 0u64;
    for region in &regions {
        let prot = region.protection().to_string();
        let prot = if region.is_executable() {
            prot.red()
        } else if region.is_writable() {
            prot.yellow()
        } else if region.is_readable() {
            prot.green()
        } else {
            prot.dimmed()
        };
        println!(
            "  {}-{}  {}/{}  {:<9} {:>12}",
            region.base(),
            region.end(),
            prot,
            region.max_protection(),
            region.kind().to_string(),
            format_bytes(region.size())
        );
        total += region.size();
    }
    println!("{}", "-".repeat(78).cyan());
    println!("{} {} regions, {} mapped", "[+]".green(), regions.len(), format_bytes(total));
    Ok(())
}

fn cmd_dump<P: VmPrimitives>(
    driver: &ScanDriver<P>,
    address: u64,
    length: u64,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let result = driver.reader().read_at(Address::new(address), length)?;

    match result.status() {
        ReadStatus::Complete => println!("{} Read {}", "[+]".green(), format_bytes(result.len() as u64)),
        ReadStatus::Partial => println!(
            "{} Partial read: {} of {}",
            "[~]".yellow(),
            format_bytes(result.len() as u64),
            format_bytes(result.requested())
        ),
        ReadStatus::Failed(failure) => anyhow::bail!("Read at 0x{:x} failed: {}", address, failure),
    }

    match output {
        Some(path) => {
            let mut file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(result.data())?;
            println!("{} Saved to: {}", "[+]".green(), path.display());
        }
        None => {
            for (i, line) in result.data().chunks(16).enumerate() {
                let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
                let ascii: String = line
                    .iter()
                    .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                    .collect();
                println!("{}  {:<47}  {}", Address::new(address + i as u64 * 16), hex.join(" "), ascii);
            }
        }
    }
    Ok(())
}

fn cmd_search<P: VmPrimitives>(
    driver: &ScanDriver<P>,
    pattern: BytePattern,
    filter: RegionFilter,
    bounds: Option<MemoryRange>,
    max_results: usize,
    show_progress: bool,
) -> anyhow::Result<()> {
    println!("{} Searching for: {}", "[*]".blue(), pattern);
    let start_time = Instant::now();

    let progress = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {bytes} scanned {msg}")
                .map_err(|e| anyhow::anyhow!(e))?,
        );
        Some(pb)
    } else {
        None
    };

    let mut search = PatternSearch::new(pattern);
    let mut scan = driver.scan(bounds, |region| filter.matches(region));
    for chunk in scan.by_ref() {
        let chunk = chunk?;
        let found = search.feed(&chunk);
        if let Some(pb) = &progress {
            pb.inc(chunk.result.len() as u64);
            pb.set_message(format!("{} matches", search.matches().len()));
        }
        if !found.is_empty() {
            log::debug!("{} matches in {}", found.len(), chunk.region);
        }
        if search.matches().len() >= max_results {
            break;
        }
    }
    let stats = *scan.stats();
    drop(scan);

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    for address in search.matches().iter().take(max_results) {
        println!("  {}", address.to_string().green());
    }
    println!();
    println!(
        "{} {} matches in {} ({} regions, {} partial, {} failed chunks) in {:.2}s",
        "[+]".green(),
        search.matches().len().min(max_results),
        format_bytes(stats.bytes_read),
        stats.regions_selected,
        stats.partial_chunks,
        stats.failed_chunks,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
