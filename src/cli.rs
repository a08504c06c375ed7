//! Command line arguments, e.g. `ucd app.core -b 3=/usr/lib/libc.so.6 segments -t`.
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Inspect a core file the way the unwinder sees it", long_about = None)]
#[command(infer_subcommands(true))] // allow abreviations
pub struct Cli {
    /// Path to core file
    pub core: PathBuf,

    /// Supply the bytes of a segment from a file, e.g. 3=/usr/lib/libc.so.6
    #[arg(short, long, value_name = "INDEX=PATH", value_parser = parse_backing)]
    pub backing: Vec<Backing>,

    /// Log more, may be repeated (RUST_LOG overrides this)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: MainCommand,
}

#[derive(Subcommand)]
pub enum MainCommand {
    /// Show the ELF header
    Header(ExplainArgs),

    /// Print process memory as hex and ascii
    Hexdump(HexdumpArgs),

    /// Show the notes in the PT_NOTE segment
    Notes(TableArgs),

    /// Show information about the process that cored
    Process(ExplainArgs),

    /// Show general purpose registers of the thread that crashed
    Registers(RegistersArgs),

    /// Show program headers and their backing files
    Segments(TableArgs),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Backing {
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Explain columns, fields, etc.
    #[arg(short, long)]
    pub explain: bool,
}

#[derive(Args)]
pub struct TableArgs {
    /// Explain columns, fields, etc.
    #[arg(short, long)]
    pub explain: bool,

    /// Add column headers
    #[arg(short, long)]
    pub titles: bool,
}

#[derive(Args)]
pub struct RegistersArgs {
    /// Also dump rarely used registers such as segment registers
    #[arg(short, long)]
    pub all: bool,

    /// Explain columns, fields, etc.
    #[arg(short, long)]
    pub explain: bool,

    /// Add column headers
    #[arg(short, long)]
    pub titles: bool,
}

#[derive(Args)]
pub struct HexdumpArgs {
    /// Number of bytes to dump
    #[arg(short, long)]
    #[arg(default_value_t = 16)]
    pub count: usize,

    /// How to display the start of each row
    #[arg(short, long, name = "TYPE")]
    #[arg(default_value_t = HexdumpLabels::Addr)]
    pub labels: HexdumpLabels,

    /// A virtual address in the process that cored
    #[arg(value_parser = parse_u64_expr)]
    pub addr: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum HexdumpLabels {
    /// Show nothing at the start of lines
    None,

    /// Show the address for the first byte on each line
    Addr,

    /// Show the offset from zero for the first byte on each line
    Zero,
}

impl fmt::Display for HexdumpLabels {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HexdumpLabels::None => fmt.write_str("none"),
            HexdumpLabels::Addr => fmt.write_str("addr"),
            HexdumpLabels::Zero => fmt.write_str("zero"),
        }
    }
}

fn parse_backing(s: &str) -> Result<Backing, String> {
    let (index, path) = s
        .split_once('=')
        .ok_or_else(|| format!("`{s}` should look like INDEX=PATH"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("`{index}` isn't a segment index"))?;
    if path.is_empty() {
        return Err(format!("`{s}` is missing a path"));
    }
    Ok(Backing {
        index,
        path: PathBuf::from(path),
    })
}

fn parse_u64_expr(s: &str) -> Result<u64, String> {
    if let Some(t) = s.strip_prefix("0x") {
        u64::from_str_radix(t, 16).map_err(|_| format!("`{s}` isn't a hex or decimal number"))
    } else {
        s.parse()
            .map_err(|_| format!("`{s}` isn't a hex or decimal number"))
    }
}
