//! Used to color and otherwise style bits of output. Styling is dropped when the stream
//! it's written to isn't a terminal or NO_COLOR is set.
use nu_ansi_term::{Color, Style};
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::sync::LazyLock;

static STDOUT_ENABLED: LazyLock<bool> =
    LazyLock::new(|| wants_color(io::stdout().is_terminal(), std::env::var_os("NO_COLOR")));

static STDERR_ENABLED: LazyLock<bool> =
    LazyLock::new(|| wants_color(io::stderr().is_terminal(), std::env::var_os("NO_COLOR")));

// See https://no-color.org, an empty NO_COLOR doesn't count.
fn wants_color(terminal: bool, no_color: Option<OsString>) -> bool {
    terminal && no_color.is_none_or(|value| value.is_empty())
}

pub trait Styling {
    fn explain_title(&self) -> String;
    fn explain_text(&self) -> String;
    fn hex_offset(&self) -> String;
    fn hex_hex(&self) -> String;
    fn hex_ascii(&self) -> String;
    fn table_header(&self) -> String;
    fn table_sep(&self) -> String;
    fn table_field(&self) -> String;
    fn warn(&self) -> String;
}

impl<T: AsRef<str>> Styling for T {
    fn explain_title(&self) -> String {
        paint(Style::new().bold(), self.as_ref())
    }

    fn explain_text(&self) -> String {
        paint(Style::new().italic(), self.as_ref())
    }

    fn hex_offset(&self) -> String {
        paint(Color::DarkGray.normal(), self.as_ref())
    }

    fn hex_hex(&self) -> String {
        paint(Style::new(), self.as_ref())
    }

    fn hex_ascii(&self) -> String {
        paint(Color::Green.normal(), self.as_ref())
    }

    fn table_header(&self) -> String {
        paint(Color::Blue.bold(), self.as_ref())
    }

    fn table_sep(&self) -> String {
        paint(Color::Blue.normal(), self.as_ref())
    }

    fn table_field(&self) -> String {
        paint(Style::new(), self.as_ref())
    }

    fn warn(&self) -> String {
        paint_if(*STDERR_ENABLED, Color::Red.bold(), self.as_ref())
    }
}

fn paint(style: Style, s: &str) -> String {
    paint_if(*STDOUT_ENABLED, style, s)
}

fn paint_if(enabled: bool, style: Style, s: &str) -> String {
    if enabled && style != Style::new() {
        style.paint(s).to_string()
    } else {
        s.to_string()
    }
}

/// Remove escape sequences from the string (e.g. for colors).
#[cfg(test)]
pub fn strip_escapes(s: &str) -> String {
    // Note that escape sequences can be fairly gnarly, e.g. for RGB colors.
    // See https://gist.github.com/fnky/458719343aabd01cfb17a3a4f7296797
    let mut result = String::with_capacity(s.len());
    let mut escaping = false;
    for c in s.chars() {
        if c == '\x1b' {
            escaping = true;
        } else if escaping {
            if c == 'm' {
                escaping = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}
