//! Write-through sinks for verbose builds. A sink either appends lines or,
//! when it controls a cursor, can overwrite the previous line in place for
//! download progress bars.

use std::io::Write;

pub trait BuildSink {
    fn write_line(&mut self, line: &str);

    /// Whether `overwrite_line` actually rewrites the previous line.
    /// Sinks without cursor control get progress lines appended instead.
    fn supports_cursor(&self) -> bool {
        false
    }

    fn overwrite_line(&mut self, line: &str) {
        self.write_line(line);
    }
}

/// Sink over any `Write`. Plain by default; `with_cursor_control` enables
/// in-place progress overwrites via ANSI escapes (only meaningful when the
/// underlying writer is a terminal).
pub struct WriterSink<W: Write> {
    writer: W,
    ansi: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            ansi: false,
        }
    }

    pub fn with_cursor_control(writer: W) -> Self {
        Self { writer, ansi: true }
    }
}

impl<W: Write> BuildSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) {
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.flush();
    }

    fn supports_cursor(&self) -> bool {
        self.ansi
    }

    fn overwrite_line(&mut self, line: &str) {
        // Move up one line, clear it, and rewrite from column zero.
        let _ = self.writer.write_all(b"\x1b[1A\x1b[2K\r");
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.flush();
    }
}
