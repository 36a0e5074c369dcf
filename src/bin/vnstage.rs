use std::{
    fs::File,
    io::{BufReader, BufWriter, Read as _, Write},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use vnstage::{FrameIndex, FrameRange};

#[derive(Parser, Debug)]
#[command(name = "vnstage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a cue sheet headlessly and write one JSON line per frame.
    Dump(DumpArgs),
    /// Validate a cue sheet.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct DumpArgs {
    /// Input cue sheet JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// First frame to write (0-based).
    #[arg(long)]
    from: Option<u64>,

    /// Frame to stop before (exclusive). Defaults to the cue sheet's frame count.
    #[arg(long)]
    to: Option<u64>,

    /// Output path. Writes to stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input cue sheet JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Dump(args) => cmd_dump(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn read_cue_sheet_json(path: &Path) -> anyhow::Result<vnstage::CueSheet> {
    let f = File::open(path).with_context(|| format!("open cue sheet '{}'", path.display()))?;
    let mut json = String::new();
    BufReader::new(f)
        .read_to_string(&mut json)
        .with_context(|| format!("read cue sheet '{}'", path.display()))?;
    let sheet = vnstage::CueSheet::from_json(&json).with_context(|| "parse cue sheet JSON")?;
    Ok(sheet)
}

fn cmd_dump(args: DumpArgs) -> anyhow::Result<()> {
    let sheet = read_cue_sheet_json(&args.in_path)?;
    let range = FrameRange::new(
        FrameIndex(args.from.unwrap_or(0)),
        FrameIndex(args.to.unwrap_or(sheet.frames).min(sheet.frames)),
    )?;
    if range.is_empty() {
        anyhow::bail!("empty frame range {}..{}", range.start.0, range.end.0);
    }

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let f = File::create(path)
                .with_context(|| format!("create output '{}'", path.display()))?;
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    // Earlier frames still run so the stage reaches the same state.
    let mut export = vnstage::OfflineExport::new(sheet)?;
    while export.frame() < range.end {
        let dump = export.step()?;
        if !range.contains(FrameIndex(dump.frame)) {
            continue;
        }
        serde_json::to_writer(&mut out, &dump).with_context(|| "serialize frame dump")?;
        out.write_all(b"\n").with_context(|| "write frame dump")?;
    }
    out.flush().with_context(|| "flush output")?;
    export.stage().destroy();

    if let Some(path) = &args.out {
        eprintln!("wrote {} frames to {}", range.len_frames(), path.display());
    }
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let sheet = read_cue_sheet_json(&args.in_path)?;
    println!(
        "ok: {} frames at {}/{} fps, {} cues, {} property assignments",
        sheet.frames,
        sheet.config.fps.num,
        sheet.config.fps.den,
        sheet.cues.len(),
        sheet.command_count()
    );
    Ok(())
}
