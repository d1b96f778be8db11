use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codec::CodecLimits;
use dsync_tools::{decode_packet_json, format_decode_pretty, inspect_packet, InspectReport};
use glob::Pattern;

#[derive(Parser)]
#[command(
    name = "dsync-tools",
    version,
    about = "dsync delta-set inspection and decoding tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect packet structure and record sizes.
    Inspect {
        /// A captured packet, or a directory of them.
        packet_path: PathBuf,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected packets.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected packets (after sorting).
        #[arg(long)]
        limit: Option<usize>,
        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Decode every delta of a packet.
    Decode {
        /// Path to the packet bytes.
        packet_file: PathBuf,
        /// Output format.
        #[arg(long, value_enum, default_value_t = DecodeFormat::Json)]
        format: DecodeFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecodeFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Captures may come from servers with any budget.
    let limits = CodecLimits::unlimited();
    match cli.command {
        Command::Inspect {
            packet_path,
            glob,
            sort,
            limit,
            json,
        } => {
            if packet_path.is_dir() {
                let entries = collect_packet_entries(&packet_path, glob.as_deref())?;
                let mut entries = maybe_sort_entries(entries, sort);
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                for entry in entries {
                    let report = inspect_file(&entry.path, &limits)?;
                    if json {
                        print_json(&report)?;
                    } else {
                        println!("== {} ({} bytes) ==", entry.path.display(), entry.size);
                        print_inspect_report(&report);
                    }
                }
            } else {
                let report = inspect_file(&packet_path, &limits)?;
                if json {
                    print_json(&report)?;
                } else {
                    print_inspect_report(&report);
                }
            }
        }
        Command::Decode {
            packet_file,
            format,
        } => {
            let bytes = fs::read(&packet_file)
                .with_context(|| format!("read packet {}", packet_file.display()))?;
            let output = decode_packet_json(&bytes, &limits)
                .with_context(|| format!("decode packet {}", packet_file.display()))?;
            match format {
                DecodeFormat::Json => print_json(&output)?,
                DecodeFormat::Pretty => print!("{}", format_decode_pretty(&output)),
            }
        }
    }
    Ok(())
}

fn inspect_file(path: &Path, limits: &CodecLimits) -> Result<InspectReport> {
    let bytes = fs::read(path).with_context(|| format!("read packet {}", path.display()))?;
    inspect_packet(&bytes, limits).with_context(|| format!("inspect packet {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{json}");
    Ok(())
}

struct PacketEntry {
    path: PathBuf,
    size: u64,
}

fn collect_packet_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<PacketEntry>> {
    let pattern = glob
        .map(Pattern::new)
        .transpose()
        .context("invalid glob pattern")?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("bin") {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(PacketEntry { path, size });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn maybe_sort_entries(
    mut entries: Vec<PacketEntry>,
    sort: Option<InspectSort>,
) -> Vec<PacketEntry> {
    if let Some(InspectSort::Size) = sort {
        entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    }
    entries
}

fn print_inspect_report(report: &InspectReport) {
    let header = &report.header;
    println!(
        "version: {} kind: {} flags: 0x{:02x} map_id: {}",
        header.version, header.kind, header.flags, header.map_id
    );
    println!(
        "sequence: {} count: {} payload_len: {} bytes (packet {} bytes)",
        header.sequence, header.count, header.payload_len, report.packet_bytes
    );
    if header.snapshot {
        let part = if header.snapshot_end { "last" } else { "partial" };
        println!("snapshot: {part}");
    }
    if report.deltas.is_empty() {
        return;
    }
    println!("by kind:");
    for total in report.totals.iter().filter(|total| total.deltas > 0) {
        println!("  {}: {} deltas ({} bytes)", total.kind, total.deltas, total.bytes);
    }
    println!("records:");
    for delta in &report.deltas {
        println!(
            "  {} [{}] ({} bytes)",
            delta.element,
            delta.fields.join(", "),
            delta.record_bytes
        );
    }
}
