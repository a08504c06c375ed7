mod cli;
mod commands;

#[cfg(test)]
mod fixtures;

use clap::Parser;
use cli::{Cli, MainCommand};
use commands::styles::Styling;
use std::error::Error;
use std::io::{self, Write};
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use ucd::CoreImage;

fn warn(mesg: &str) {
    eprintln!("{}", mesg.warn());
}

/// Logs go to stderr so they don't interleave with reports. RUST_LOG wins over -v.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn load_core(cli: &Cli) -> Result<CoreImage, String> {
    let mut core = CoreImage::new(&cli.core)
        .map_err(|err| format!("Couldn't load {}: {err}", cli.core.display()))?;
    for backing in cli.backing.iter() {
        core.associate(backing.index, &backing.path).map_err(|err| {
            format!(
                "Couldn't use {} for segment {}: {err}",
                backing.path.display(),
                backing.index
            )
        })?;
    }
    Ok(core)
}

fn run(
    core: &CoreImage,
    command: &MainCommand,
    mut out: impl Write,
) -> Result<(), Box<dyn Error>> {
    use MainCommand::*;
    match command {
        Header(args) => commands::info_header(core, args, &mut out)?,
        Hexdump(args) => commands::hexdump(core, args, &mut out)?,
        Notes(args) => commands::info_notes(core, args, &mut out)?,
        Process(args) => commands::info_process(core, args, &mut out)?,
        Registers(args) => commands::info_registers(core, args, &mut out)?,
        Segments(args) => commands::info_segments(core, args, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

fn is_broken_pipe(err: &(dyn Error + 'static)) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|err| err.kind() == io::ErrorKind::BrokenPipe)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let core = match load_core(&cli) {
        Ok(core) => core,
        Err(mesg) => {
            warn(&mesg);
            process::exit(1);
        }
    };

    let code = match run(&core, &cli.command, io::stdout().lock()) {
        Ok(()) => 0,
        Err(err) if is_broken_pipe(err.as_ref()) => 0, // e.g. piped into head
        Err(err) => {
            warn(&err.to_string());
            1
        }
    };
    drop(core);
    process::exit(code);
}
