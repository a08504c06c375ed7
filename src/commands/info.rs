use super::styles::Styling;
use super::tables::{SimpleTableBuilder, TableBuilder, add_field, add_simple};
use crate::cli::{ExplainArgs, RegistersArgs, TableArgs};
use std::cmp::Ordering;
use std::io::{self, Write};
use ucd::CoreImage;
use ucd::elf::{ElfClass, signal_name};

pub fn info_header(core: &CoreImage, args: &ExplainArgs, out: impl Write) -> io::Result<()> {
    let mut b = SimpleTableBuilder::new();
    let header = core.header();

    match header.class {
        ElfClass::Elf32 => {
            add_simple!(b, "class", "ELF32", "pointers and offsets are four bytes");
        }
        ElfClass::Elf64 => {
            add_simple!(b, "class", "ELF64", "pointers and offsets are eight bytes");
        }
    }
    add_simple!(b, "type", header.stype(), "type of ELF file, should be core");
    add_simple!(b, "machine", header.machine(), "CPU architecture");
    add_simple!(b, "version", header.version, "always 1");
    add_simple!(b, "entry", "0x{:x}", header.entry, "zero for core files");
    add_simple!(b, "flags", header.flags, "Linux has no defined flags");
    add_simple!(
        b,
        "header_size",
        header.header_size,
        "size of the ELF header in bytes"
    );
    add_simple!(
        b,
        "ph_offset",
        "0x{:x}",
        header.ph_offset,
        "offset in the core to the program header table"
    );
    add_simple!(
        b,
        "ph_entry_size",
        header.ph_entry_size,
        "size of one entry in the program header table"
    );
    add_simple!(
        b,
        "num_ph_entries",
        header.num_ph_entries,
        "number of entries in the program header table"
    );
    b.writeln(out, args.explain)
}

pub fn info_notes(core: &CoreImage, args: &TableArgs, out: impl Write) -> io::Result<()> {
    let mut builder = TableBuilder::new();
    builder.add_col_l("name", "who defined the note, CORE for the kernel's own notes");
    builder.add_col_l("type", "what the note describes");
    builder.add_col_r("offset", "offset of the descriptor within the note segment");
    builder.add_col_r("size", "size of the descriptor in bytes (decimal)");

    for note in core.notes() {
        add_field!(builder, "name", note.name);
        add_field!(builder, "type", note.ntype);
        add_field!(builder, "offset", "{:x}", note.desc.start);
        add_field!(builder, "size", note.desc.len());
    }

    builder.writeln(out, args.titles, args.explain)
}

pub fn info_process(core: &CoreImage, args: &ExplainArgs, out: impl Write) -> io::Result<()> {
    let status = core.process_status();
    let mut b = SimpleTableBuilder::new();

    add_simple!(
        b,
        "pid",
        status.pid(),
        "the process id for the exe that produced the core"
    );
    let signal = status.signal();
    add_simple!(
        b,
        "signal",
        format!("{signal} ({})", signal_name(signal)),
        "the signal that terminated the process"
    );
    add_simple!(
        b,
        "cursig",
        status.current_signal(),
        "the signal that was being handled when the core was written"
    );
    add_simple!(
        b,
        "ip",
        "0x{:x}",
        status.ip(),
        "address of the instruction that was executing"
    );
    add_simple!(b, "sp", "0x{:x}", status.sp(), "top of the stack");
    let backed = (0..core.len()).filter(|&i| core.backing(i).is_some()).count();
    add_simple!(
        b,
        "backed",
        backed,
        "number of segments with a backing file"
    );
    add_simple!(
        b,
        "file",
        core.path().display(),
        "path to the core file that was loaded"
    );

    b.writeln(out, args.explain)
}

pub fn info_registers(
    core: &CoreImage,
    args: &RegistersArgs,
    mut out: impl Write,
) -> io::Result<()> {
    // These come out in a really annoying order so we'll sort them.
    let status = core.process_status();
    let mut tuples: Vec<(&'static str, u64)> = status
        .registers()
        .enumerate()
        .filter(|(i, _)| args.all || !status.is_rare_register(*i))
        .map(|(i, value)| (status.register_name(i), value))
        .filter(|(name, _)| *name != "?")
        .collect();

    tuples.sort_by(|lhs, rhs| {
        let lhs_num = lhs.0[1..].parse::<i32>();
        let rhs_num = rhs.0[1..].parse::<i32>();
        if let Ok(n1) = lhs_num
            && let Ok(n2) = rhs_num
        {
            // numeric registers are sorted by value, eg r9 before r11
            n1.cmp(&n2)
        } else if lhs_num.is_ok() {
            // alpha registers appear before numeric, eg rbp before r10
            Ordering::Greater
        } else if rhs_num.is_ok() {
            Ordering::Less
        } else {
            lhs.cmp(rhs)
        }
    });

    let mut builder = TableBuilder::new();
    builder.add_col_l("name", "the register name");
    builder.add_col_r("hex", "the register value in hex");
    builder.add_col_r("decimal", "the register value in decimal");

    for (name, value) in tuples.iter() {
        add_field!(builder, "name", name);
        add_field!(builder, "hex", "{:x}", value);
        add_field!(builder, "decimal", value);
    }

    builder.writeln(&mut out, args.titles, args.explain)?;
    if args.explain {
        writeln!(out)?;
        explain(&mut out, status.ip_name(), "the instruction that was executing")?;
        explain(
            &mut out,
            status.sp_name(),
            "the top of the stack, where unwinding starts",
        )?;
    }
    Ok(())
}

pub fn info_segments(core: &CoreImage, args: &TableArgs, out: impl Write) -> io::Result<()> {
    let mut builder = TableBuilder::new();
    builder.add_col_r("index", "use this with --backing to supply a file for the segment");
    builder.add_col_l("type", "the segment type");
    builder.add_col_r(
        "offset",
        "the offset into the core file at which the segment appears",
    );
    builder.add_col_r("vaddr", "the virtual address the segment starts at");
    builder.add_col_r("file size", "number of bytes of the segment in the core");
    builder.add_col_r("mem size", "the size of the segment in memory");
    builder.add_col_r("flags", "readable, writeable, and/or executable");
    builder.add_col_l(
        "backing",
        "file supplying the bytes the kernel didn't dump",
    );

    for (i, segment) in core.segments().iter().enumerate() {
        let backing = core
            .backing(i)
            .map(|b| b.path.display().to_string())
            .unwrap_or_default();

        add_field!(builder, "index", i);
        add_field!(builder, "type", segment.stype);
        add_field!(builder, "offset", "{:x}", segment.obytes.start.0);
        add_field!(builder, "vaddr", "{:x}", segment.vbytes.start.0);
        add_field!(builder, "file size", "{:x}", segment.file_size());
        add_field!(builder, "mem size", "{:x}", segment.mem_size());
        add_field!(builder, "flags", segment.perms());
        add_field!(builder, "backing", backing);
    }

    builder.writeln(out, args.titles, args.explain)
}

fn explain(mut out: impl Write, title: &str, text: &str) -> io::Result<()> {
    writeln!(out, "{}: {}", title.explain_title(), text.explain_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::styles::strip_escapes;
    use crate::fixtures::{self, CoreBuilder, PF_R, PF_W, PF_X};

    fn core(dir: &tempfile::TempDir) -> CoreImage {
        let regs: Vec<u64> = (0..27).map(|i| 0x100 + i).collect();
        let path = CoreBuilder::new(true)
            .with_status(4242, &regs)
            .load(0x400000, PF_R | PF_X, &[], 0x1000)
            .load(0x7ffd0000, PF_R | PF_W, &[0; 16], 16)
            .write(dir.path());
        CoreImage::new(path).unwrap()
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut bytes = Vec::new();
        f(&mut bytes).unwrap();
        strip_escapes(&String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn header() {
        let dir = tempfile::tempdir().unwrap();
        let core = core(&dir);
        let args = ExplainArgs { explain: true };
        let text = output(|out| info_header(&core, &args, out));
        assert!(text.contains("ELF64"));
        assert!(text.contains("core"));
        assert!(text.contains("x86-64"));
        assert!(text.contains("num_ph_entries: number of entries"));
    }

    #[test]
    fn segments() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = core(&dir);
        let lib = fixtures::write_file(dir.path(), "libfoo.so", &[0; 0x1000]);
        core.associate(1, &lib).unwrap();

        let args = TableArgs {
            explain: false,
            titles: true,
        };
        let text = output(|out| info_segments(&core, &args, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 + 3);
        assert!(lines[0].contains("mem size"));
        assert!(lines[2].contains("note"));
        assert!(lines[3].contains("400000"));
        assert!(lines[3].contains("r-x"));
        assert!(lines[3].contains("libfoo.so"));
        assert!(lines[4].contains("7ffd0000"));
        assert!(lines[4].contains("rw-"));
    }

    #[test]
    fn notes() {
        let dir = tempfile::tempdir().unwrap();
        let core = core(&dir);
        let args = TableArgs {
            explain: false,
            titles: false,
        };
        let text = output(|out| info_notes(&core, &args, out));
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("CORE"));
        assert!(text.contains("NT_PRSTATUS"));
        assert!(text.contains("336"));
    }

    #[test]
    fn process() {
        let dir = tempfile::tempdir().unwrap();
        let core = core(&dir);
        let args = ExplainArgs { explain: false };
        let text = output(|out| info_process(&core, &args, out));
        assert!(text.contains("4242"));
        assert!(text.contains("11 (SIGSEGV)"));
        assert!(text.contains("0x110")); // rip is register 16
        assert!(text.contains("0x113")); // rsp is register 19
    }

    #[test]
    fn registers() {
        let dir = tempfile::tempdir().unwrap();
        let core = core(&dir);
        let mut args = RegistersArgs {
            all: false,
            explain: false,
            titles: false,
        };
        let text = output(|out| info_registers(&core, &args, out));
        let names: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(
            names,
            vec![
                "rax", "rbp", "rbx", "rcx", "rdi", "rdx", "rip", "rsi", "rsp", "r8", "r9", "r10",
                "r11", "r12", "r13", "r14", "r15"
            ]
        );

        args.all = true;
        args.explain = true;
        let text = output(|out| info_registers(&core, &args, out));
        assert!(text.contains("eflags"));
        assert!(text.contains("gs_base"));
        assert!(text.contains("rsp: the top of the stack"));
    }

    #[test]
    fn aarch64_registers() {
        let dir = tempfile::tempdir().unwrap();
        let regs: Vec<u64> = (0..34).collect();
        let path = CoreBuilder::new(true)
            .machine(fixtures::EM_AARCH64)
            .note(fixtures::note_record(
                b"CORE\0",
                fixtures::NT_PRSTATUS,
                &fixtures::aarch64_prstatus(8, &regs),
            ))
            .write(dir.path());
        let core = CoreImage::new(path).unwrap();

        let args = RegistersArgs {
            all: false,
            explain: true,
            titles: false,
        };
        let text = output(|out| info_registers(&core, &args, out));
        let names: Vec<&str> = text
            .lines()
            .take(33)
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(&names[..4], &["pc", "sp", "x0", "x1"]);
        assert_eq!(names[32], "x30");
        assert!(!text.contains("pstate"));
        assert!(text.contains("pc: the instruction that was executing"));
        assert!(text.contains("sp: the top of the stack"));
    }
}
