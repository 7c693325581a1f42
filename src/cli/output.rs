//! Colored terminal output for the release pipeline

use std::io::{self, IsTerminal, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager. `quiet` suppresses everything but errors.
    pub fn new(quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(color_choice(io::stdout().is_terminal())),
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.tagged("✓", ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true), None, message)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> io::Result<()> {
        let mut body = ColorSpec::new();
        body.set_fg(Some(Color::Yellow));
        self.tagged(
            "⚠",
            ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true),
            Some(&body),
            message,
        )
    }

    /// Print a progress line for a running step
    pub fn progress(&self, message: &str) -> io::Result<()> {
        self.tagged("⋯", ColorSpec::new().set_fg(Some(Color::Magenta)), None, message)
    }

    /// Print an error message to stderr (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(color_choice(io::stderr().is_terminal()));
        let mut buffer = bufwtr.buffer();
        let mut body = ColorSpec::new();
        body.set_fg(Some(Color::Red));
        let written = write_tagged(
            &mut buffer,
            "✗",
            ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true),
            Some(&body),
            message,
        )
        .and_then(|()| bufwtr.print(&buffer));

        if written.is_err() {
            eprintln!("✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> io::Result<()> {
        self.emit(|buffer| {
            writeln!(buffer)?;
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
            writeln!(buffer, "═══ {title} ═══")?;
            buffer.reset()
        })
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.emit(|buffer| writeln!(buffer, "    {message}"))
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) -> io::Result<()> {
        self.emit(|buffer| writeln!(buffer, "{message}"))
    }

    fn tagged(
        &self,
        symbol: &str,
        symbol_color: &ColorSpec,
        body_color: Option<&ColorSpec>,
        message: &str,
    ) -> io::Result<()> {
        self.emit(|buffer| write_tagged(buffer, symbol, symbol_color, body_color, message))
    }

    fn emit(&self, write: impl FnOnce(&mut Buffer) -> io::Result<()>) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.bufwtr.buffer();
        write(&mut buffer)?;
        self.bufwtr.print(&buffer)
    }
}

/// Piped or redirected output never carries escape codes
fn color_choice(is_terminal: bool) -> ColorChoice {
    if is_terminal {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn write_tagged(
    buffer: &mut Buffer,
    symbol: &str,
    symbol_color: &ColorSpec,
    body_color: Option<&ColorSpec>,
    message: &str,
) -> io::Result<()> {
    buffer.set_color(symbol_color)?;
    write!(buffer, "{symbol}")?;
    buffer.reset()?;
    if let Some(color) = body_color {
        buffer.set_color(color)?;
    }
    writeln!(buffer, " {message}")?;
    buffer.reset()
}
