//! eclkw Inspection Binary
//!
//! Lists, dumps, converts and indexes keyword files.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use eclkw::fileset::format_from_extension;
use eclkw::keyword::{BinaryKeywordWriter, FormattedKeywordWriter, KeywordSink};
use eclkw::{
    ArrayData, Config, EclError, EclFile, EndianMode, FileFormat, IndexMode, OpenMode,
};
use tracing_subscriber::{fmt, EnvFilter};

/// eclkw inspector
#[derive(Parser, Debug)]
#[command(name = "eclkw-inspect")]
#[command(about = "Inspect ECLIPSE keyword files")]
#[command(version)]
struct Args {
    /// Byte order of binary files
    #[arg(short, long, value_enum, default_value = "detect")]
    endian: EndianArg,

    /// Largest plausible record payload in MB
    #[arg(long, default_value = "16")]
    max_record_mb: u32,

    /// Keep the keywords before the first damaged record
    #[arg(long, conflicts_with = "salvage")]
    partial: bool,

    /// Skip damaged regions and resynchronize on the next header
    #[arg(long)]
    salvage: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EndianArg {
    Big,
    Little,
    Detect,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Binary,
    Formatted,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every keyword with occurrence number and offsets
    List {
        file: PathBuf,
    },

    /// Show how a marker keyword partitions the file
    Blocks {
        file: PathBuf,

        /// Marker keyword
        #[arg(short, long, default_value = "SEQNUM")]
        marker: String,
    },

    /// Print the values of one keyword occurrence
    Dump {
        file: PathBuf,

        /// Keyword name
        keyword: String,

        /// Occurrence (default: last)
        #[arg(short, long)]
        occurrence: Option<usize>,

        /// Restrict to this block of the SEQNUM partition
        #[arg(short, long)]
        block: Option<usize>,

        /// Print at most this many values
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Rewrite a file in another codec
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Output codec (default: from the output extension)
        #[arg(short, long, value_enum)]
        to: Option<FormatArg>,
    },

    /// Write a persisted index next to the file
    Index {
        file: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eclkw=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        tracing::error!("{} error: {}", error_kind(&e), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> eclkw::Result<()> {
    let config = config_from_args(args);

    match &args.command {
        Commands::List { file } => list(file, config),
        Commands::Blocks { file, marker } => blocks(file, marker, config),
        Commands::Dump {
            file,
            keyword,
            occurrence,
            block,
            limit,
        } => dump(file, keyword, *occurrence, *block, *limit, config),
        Commands::Convert { input, output, to } => convert(input, output, *to, config),
        Commands::Index { file } => index(file, config),
    }
}

fn config_from_args(args: &Args) -> Config {
    let endian = match args.endian {
        EndianArg::Big => EndianMode::Big,
        EndianArg::Little => EndianMode::Little,
        EndianArg::Detect => EndianMode::Detect,
    };
    let index_mode = if args.salvage {
        IndexMode::Salvage
    } else if args.partial {
        IndexMode::Partial
    } else {
        IndexMode::Strict
    };
    Config::builder()
        .endian(endian)
        .max_record_size(args.max_record_mb.saturating_mul(1024 * 1024))
        .index_mode(index_mode)
        .build()
}

fn error_kind(error: &EclError) -> &'static str {
    match error {
        EclError::Framing { .. } | EclError::ImplausibleLength { .. } => "Framing",
        EclError::Truncated { .. } => "Truncated",
        EclError::InvalidTypeTag { .. } | EclError::InvalidHeader { .. } => "Header",
        EclError::Format { .. } => "Format",
        EclError::UnknownKeyword { .. } => "UnknownKeyword",
        EclError::NotFound { .. } => "NotFound",
        EclError::EmptyType { .. } => "EmptyType",
        EclError::TypeMismatch { .. } => "TypeMismatch",
        EclError::Io(_) => "IO",
        _ => "Other",
    }
}

/// Print how the scan went when it did not reach the end cleanly
fn report_damage(file: &EclFile) {
    let outcome = file.index_report();
    if let eclkw::index::IndexStatus::Truncated { offset, reason } = &outcome.status {
        println!("# index truncated at offset {}: {}", offset, reason);
    }
    for region in &outcome.skipped {
        println!(
            "# skipped bytes {}..{} ({} bytes): {}",
            region.start,
            region.end,
            region.len(),
            region.reason
        );
    }
}

fn list(path: &Path, config: Config) -> eclkw::Result<()> {
    let file = EclFile::open_with(path, OpenMode::Read, config)?;
    report_damage(&file);

    println!(
        "{:>6}  {:<8}  {:>4}  {:>10}  {:>4}  {:>12}  {:>12}",
        "#", "NAME", "TYPE", "COUNT", "OCC", "HEADER", "DATA"
    );
    for (position, entry) in file.index().entries().iter().enumerate() {
        println!(
            "{:>6}  {:<8}  {:>4}  {:>10}  {:>4}  {:>12}  {:>12}",
            position,
            entry.name,
            entry.element_type,
            entry.count,
            entry.occurrence,
            entry.header_offset,
            entry.data_offset
        );
    }
    Ok(())
}

fn blocks(path: &Path, marker: &str, config: Config) -> eclkw::Result<()> {
    let file = EclFile::open_with(path, OpenMode::Read, config)?;
    report_damage(&file);

    let mut view = file.view(None)?.with_marker(marker);
    let steps = view.report_steps().unwrap_or_default();
    for block in view.blocks()? {
        let step = steps.iter().find(|s| s.block == block.id).map(|s| s.step);
        match step {
            Some(step) => println!(
                "block {:>4}  entries {:>6}..{:<6}  step {}",
                block.id, block.range.start, block.range.end, step
            ),
            None => println!(
                "block {:>4}  entries {:>6}..{:<6}  {}",
                block.id,
                block.range.start,
                block.range.end,
                if block.marker.is_some() { "" } else { "(before first marker)" }
            ),
        }
    }
    Ok(())
}

fn dump(
    path: &Path,
    keyword: &str,
    occurrence: Option<usize>,
    block: Option<usize>,
    limit: usize,
    config: Config,
) -> eclkw::Result<()> {
    let file = EclFile::open_with(path, OpenMode::Read, config)?;
    let mut view = file.view(block)?;
    let keyword = match occurrence {
        Some(n) => view.get_occurrence(keyword, n)?,
        None => view.get(keyword)?,
    };

    println!("{} {} {}", keyword.name(), keyword.element_type(), keyword.count());
    let lines: Vec<String> = match keyword.data() {
        ArrayData::Int32(v) => v.iter().take(limit).map(|x| x.to_string()).collect(),
        ArrayData::Float32(v) => v.iter().take(limit).map(|x| format!("{:e}", x)).collect(),
        ArrayData::Float64(v) => v.iter().take(limit).map(|x| format!("{:e}", x)).collect(),
        ArrayData::Char(v) => v.iter().take(limit).map(|x| format!("'{}'", x)).collect(),
        ArrayData::Bool(v) => v.iter().take(limit).map(|x| x.to_string()).collect(),
        ArrayData::Message => Vec::new(),
    };
    for (i, line) in lines.iter().enumerate() {
        println!("{:>8}  {}", i, line);
    }
    if keyword.count() > limit {
        println!("... {} more", keyword.count() - limit);
    }
    Ok(())
}

fn convert(input: &Path, output: &Path, to: Option<FormatArg>, config: Config) -> eclkw::Result<()> {
    let source = EclFile::open_with(input, OpenMode::Read, config.clone())?;
    report_damage(&source);

    let format = match to {
        Some(FormatArg::Binary) => FileFormat::Binary,
        Some(FormatArg::Formatted) => FileFormat::Formatted,
        None => format_from_extension(output).unwrap_or(match source.format() {
            FileFormat::Binary => FileFormat::Formatted,
            FileFormat::Formatted => FileFormat::Binary,
        }),
    };

    let writer = BufWriter::new(File::create(output)?);
    let mut sink: Box<dyn KeywordSink> = match format {
        FileFormat::Binary => {
            let endian = source.endian().unwrap_or(eclkw::Endian::Big);
            Box::new(BinaryKeywordWriter::with_config(writer, &config, endian, 0))
        }
        FileFormat::Formatted => Box::new(FormattedKeywordWriter::new(writer, config.layout)),
    };

    let view = source.view(None)?;
    for entry in view.entries() {
        let keyword = view.lazy(&entry.name, entry.occurrence)?.load()?;
        sink.write_keyword(&keyword)?;
    }
    sink.flush()?;

    tracing::info!(
        "Converted {} keywords from {} to {} ({:?})",
        view.len(),
        input.display(),
        output.display(),
        format
    );
    Ok(())
}

fn index(path: &Path, config: Config) -> eclkw::Result<()> {
    let mut file = EclFile::open_with(path, OpenMode::Read, config)?;
    let sidecar = file.save_index()?;
    println!(
        "Indexed {} keywords into {}",
        file.index().len(),
        sidecar.display()
    );
    Ok(())
}
