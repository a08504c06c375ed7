use super::styles::Styling;
use crate::cli::{HexdumpArgs, HexdumpLabels};
use std::error::Error;
use std::io::Write;
use ucd::CoreImage;

/// Dumps process memory, using backing files for bytes that weren't dumped.
pub fn hexdump(
    core: &CoreImage,
    args: &HexdumpArgs,
    out: impl Write,
) -> Result<(), Box<dyn Error>> {
    let mut bytes = vec![0; args.count];
    core.read_memory(args.addr, &mut bytes)?;
    write_hex(out, args.addr, &bytes, args.labels)?;
    Ok(())
}

fn write_hex(
    mut out: impl Write,
    addr: u64,
    bytes: &[u8],
    labels: HexdumpLabels,
) -> std::io::Result<()> {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let delta = row * 16;
        match labels {
            HexdumpLabels::None => (),
            HexdumpLabels::Addr => {
                let label = format!("{:012x}: ", addr + delta as u64);
                write!(out, "{}", label.hex_offset())?;
            }
            HexdumpLabels::Zero => {
                let label = format!("{delta:04x}: ");
                write!(out, "{}", label.hex_offset())?;
            }
        }

        // short rows are padded so the ascii column lines up
        let (first, second) = chunk.split_at(chunk.len().min(8));
        for half in [first, second] {
            for i in 0..8 {
                match half.get(i) {
                    Some(byte) => write!(out, "{}", format!("{byte:02x} ").hex_hex())?,
                    None => write!(out, "   ")?,
                }
            }
            write!(out, " ")?;
        }
        write!(out, "  ")?;

        let ascii: String = chunk
            .iter()
            .map(|&b| {
                let ch = b as char;
                if ch.is_ascii_graphic() { ch } else { '.' }
            })
            .collect();
        writeln!(out, "{}", ascii.hex_ascii())?;
    }
    Ok(())
}
