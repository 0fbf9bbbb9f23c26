//! Shared output sink for engine debug channels.
//!
//! Every debug channel of a run is bound to one sink, so all channel
//! output lands interleaved in a single stream in emission order. The
//! sink is a cheaply cloneable handle over a guarded writer; dropping
//! the last clone flushes and closes the underlying stream, so the log
//! file is released on every exit path, including early aborts.

use log::warn;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Cloneable handle to the write stream shared by all debug channels
/// of a simulation run.
#[derive(Clone)]
pub struct ChannelSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ChannelSink {
    /// Create a sink over an arbitrary writer.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Open a file-backed sink, creating missing parent directories.
    /// An existing file is truncated so each run starts a fresh log.
    pub fn file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Create an in-memory sink together with a readable view of
    /// everything written to it.
    pub fn memory() -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Append one line to the sink.
    ///
    /// Debug channels are write-only taps: a failing write is reported
    /// through the process log and otherwise ignored, so the simulation
    /// outcome never depends on the log stream.
    pub fn write_line(&self, line: &str) {
        let mut guard = self.inner.lock().unwrap();
        if let Err(e) = writeln!(guard, "{}", line) {
            warn!("Debug channel write failed: {}", e);
        }
    }

    /// Flush buffered output to the underlying stream.
    pub fn flush(&self) -> io::Result<()> {
        self.inner.lock().unwrap().flush()
    }
}

/// Shared byte buffer used as the backing store of an in-memory sink.
#[derive(Clone, Default)]
pub struct MemoryBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    /// Return everything written so far as a string.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock().unwrap()).to_string()
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clones_share_one_stream() {
        let (sink, buffer) = ChannelSink::memory();
        let other = sink.clone();

        sink.write_line("first");
        other.write_line("second");
        sink.write_line("third");

        assert_eq!(buffer.contents(), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_file_sink_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run.txt");

        let sink = ChannelSink::file(&path).unwrap();
        sink.write_line("hello");
        sink.flush().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "hello\n");
    }

    #[test]
    fn test_file_sink_truncates_previous_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        std::fs::write(&path, "stale content from an earlier run\n").unwrap();

        let sink = ChannelSink::file(&path).unwrap();
        sink.write_line("fresh");
        drop(sink);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "fresh\n");
    }

    #[test]
    fn test_drop_flushes_buffered_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");

        {
            let sink = ChannelSink::file(&path).unwrap();
            sink.write_line("buffered line");
            // No explicit flush: the drop of the last clone must do it.
        }

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "buffered line\n");
    }
}
