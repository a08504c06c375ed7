//! Column aligned reports rendered with tabled, optionally followed by a line of help for
//! each column or row.
use super::styles::Styling;
use std::io::{self, Write};
use tabled::{
    builder::Builder,
    settings::{Alignment, Padding, Style, object::Columns},
};

struct Column {
    title: &'static str,
    help: &'static str,
    align: Alignment,
}

/// Table with titled columns, filled a row at a time:
///
/// ```text
/// index  type  offset   vaddr  ...     with titles
/// -----  ----  ------   -----
///     0  note     120       0
///     1  load    1000  400000
///
/// index: use this with --backing ...   with explain
/// ```
pub struct TableBuilder {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn add_col_l(&mut self, title: &'static str, help: &'static str) {
        self.add_col(title, help, Alignment::left());
    }

    pub fn add_col_r(&mut self, title: &'static str, help: &'static str) {
        self.add_col(title, help, Alignment::right());
    }

    /// Sets a cell in the last row. Setting the first column starts a new row.
    pub fn add_str_field(&mut self, title: &str, value: String) {
        let Some(index) = self.columns.iter().position(|c| c.title == title) else {
            panic!("no column named {title}");
        };
        if index == 0 || self.rows.is_empty() {
            self.rows.push(vec![String::new(); self.columns.len()]);
        }
        if let Some(row) = self.rows.last_mut() {
            row[index] = value;
        }
    }

    pub fn writeln(&self, out: impl Write, titles: bool, explain: bool) -> io::Result<()> {
        let mut records: Vec<Vec<String>> = Vec::with_capacity(self.rows.len() + 2);
        if titles {
            records.push(self.columns.iter().map(|c| c.title.table_header()).collect());
            records.push(
                self.columns
                    .iter()
                    .map(|c| "-".repeat(c.title.len()).table_sep())
                    .collect(),
            );
        }
        records.extend(self.rows.iter().cloned());

        let aligns: Vec<Alignment> = self.columns.iter().map(|c| c.align).collect();
        let help = self.columns.iter().map(|c| (c.title, c.help));
        write_table(out, records, &aligns, explain.then_some(help))
    }

    fn add_col(&mut self, title: &'static str, help: &'static str, align: Alignment) {
        debug_assert!(self.rows.is_empty());
        debug_assert!(self.columns.iter().all(|c| c.title != title));
        self.columns.push(Column { title, help, align });
    }
}

macro_rules! add_field {
    ($builder:ident, $title:literal, $value:expr) => {
        $builder.add_str_field($title, format!("{}", $value).table_field());
    };
    ($builder:ident, $title:literal, $format:literal, $value:expr) => {
        $builder.add_str_field($title, format!($format, $value).table_field());
    };
}
pub(crate) use add_field;

/// Untitled name/value table, one row per property:
///
/// ```text
/// pid     4242
/// signal  11 (SIGSEGV)
///
/// pid: the process id ...              with explain
/// ```
pub struct SimpleTableBuilder {
    rows: Vec<(&'static str, String, &'static str)>,
}

impl SimpleTableBuilder {
    pub fn new() -> SimpleTableBuilder {
        SimpleTableBuilder { rows: Vec::new() }
    }

    pub fn add_str_row(&mut self, name: &'static str, value: String, help: &'static str) {
        self.rows.push((name, value, help));
    }

    pub fn writeln(&self, out: impl Write, explain: bool) -> io::Result<()> {
        let records: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|(name, value, _)| vec![name.to_string(), value.clone()])
            .collect();
        let help = self.rows.iter().map(|(name, _, help)| (*name, *help));
        write_table(
            out,
            records,
            &[Alignment::left(), Alignment::left()],
            explain.then_some(help),
        )
    }
}

macro_rules! add_simple {
    ($builder:ident, $name:literal, $value:expr, $help:expr) => {
        $builder.add_str_row($name, format!("{}", $value).table_field(), $help);
    };
    ($builder:ident, $name:literal, $format:literal, $value:expr, $help:expr) => {
        $builder.add_str_row($name, format!($format, $value).table_field(), $help);
    };
}
pub(crate) use add_simple;

fn write_table<'a>(
    mut out: impl Write,
    records: Vec<Vec<String>>,
    aligns: &[Alignment],
    help: Option<impl Iterator<Item = (&'a str, &'a str)>>,
) -> io::Result<()> {
    let mut builder = Builder::default();
    for record in records {
        // tabled mangles the layout of empty cells
        builder.push_record(record.into_iter().map(|cell| {
            if cell.is_empty() {
                " ".to_string()
            } else {
                cell
            }
        }));
    }

    let mut table = builder.build();
    for (i, align) in aligns.iter().enumerate() {
        table.modify(Columns::one(i), *align);
    }
    table.modify(Columns::first(), Padding::new(0, 1, 0, 0));
    table.with(Style::empty());
    writeln!(out, "{table}")?;

    if let Some(help) = help {
        writeln!(out)?;
        for (title, text) in help {
            writeln!(out, "{}: {}", title.explain_title(), text.explain_text())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::styles::strip_escapes;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> Vec<String> {
        let mut bytes = Vec::new();
        f(&mut bytes).unwrap();
        strip_escapes(&String::from_utf8(bytes).unwrap())
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    #[test]
    fn columns() {
        let mut builder = TableBuilder::new();
        builder.add_col_l("name", "what it's called");
        builder.add_col_r("n", "how many");
        add_field!(builder, "name", "a");
        add_field!(builder, "n", 1);
        add_field!(builder, "name", "bcd");
        add_field!(builder, "n", "{:x}", 34);
        add_field!(builder, "name", "");

        let lines = render(|out| builder.writeln(out, true, true));
        assert_eq!(lines.len(), 2 + 3 + 1 + 2);
        assert!(lines[0].starts_with("name"));
        assert!(lines[1].starts_with("----"));
        assert!(lines[2].starts_with("a "));
        assert!(lines[3].starts_with("bcd "));
        assert!(lines[3].ends_with("22"));
        // right aligned so the values end in the same place
        assert_eq!(lines[2].len(), lines[3].len());
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "name: what it's called");
        assert_eq!(lines[7], "n: how many");

        let lines = render(|out| builder.writeln(out, false, false));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("a "));
    }

    #[test]
    fn simple() {
        let mut builder = SimpleTableBuilder::new();
        add_simple!(builder, "pid", 4242, "process id");
        add_simple!(builder, "ip", "0x{:x}", 0x1000, "where it crashed");

        let lines = render(|out| builder.writeln(out, false));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["pid", "4242"]);
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), ["ip", "0x1000"]);
        // left aligned values start in the same place
        assert_eq!(lines[0].find('4'), lines[1].find('0'));

        let lines = render(|out| builder.writeln(out, true));
        assert_eq!(lines[3..], ["pid: process id", "ip: where it crashed"]);
    }
}
