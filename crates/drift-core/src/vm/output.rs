//! Output sink for the `Output` operation.
//!
//! - `Stdout`: one line per emitted value (default)
//! - `Buffer`: captured lines, for tests and embedding hosts
//! - `Silent`: discards everything

use std::io::{self, Write};

use crate::error::DriftResult;

#[derive(Debug, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Buffer(Vec<String>),
    Silent,
}

impl OutputSink {
    pub fn buffer() -> Self {
        OutputSink::Buffer(Vec::new())
    }

    /// Emit one line; a closed or failing stdout is reported as `Io`
    pub fn emit(&mut self, line: &str) -> DriftResult<()> {
        match self {
            OutputSink::Stdout => write_line(&mut io::stdout().lock(), line)?,
            OutputSink::Buffer(lines) => lines.push(line.to_string()),
            OutputSink::Silent => {}
        }
        Ok(())
    }

    /// Captured lines; empty for sinks that don't capture
    pub fn lines(&self) -> &[String] {
        match self {
            OutputSink::Buffer(lines) => lines,
            OutputSink::Stdout | OutputSink::Silent => &[],
        }
    }

    /// Take captured lines, leaving the buffer empty
    pub fn take(&mut self) -> Vec<String> {
        match self {
            OutputSink::Buffer(lines) => std::mem::take(lines),
            OutputSink::Stdout | OutputSink::Silent => Vec::new(),
        }
    }
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriftError;

    /// Writer whose reader has gone away
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn buffer_captures_lines_in_order() {
        let mut sink = OutputSink::buffer();
        sink.emit("100").expect("emit failed");
        sink.emit("800").expect("emit failed");
        assert_eq!(sink.lines(), &["100".to_string(), "800".to_string()]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn silent_captures_nothing() {
        let mut sink = OutputSink::Silent;
        sink.emit("ignored").expect("emit failed");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn closed_writer_reports_io_error() {
        let err = write_line(&mut Closed, "100").map_err(DriftError::from);
        assert_eq!(err, Err(DriftError::Io("broken pipe".to_string())));
    }

    #[test]
    fn lines_are_newline_terminated() {
        let mut out = Vec::new();
        write_line(&mut out, "100").expect("write failed");
        write_line(&mut out, "\"Drift!!\"").expect("write failed");
        assert_eq!(out, b"100\n\"Drift!!\"\n");
    }
}
