//! Shared status channel for harness lines and worker ready markers.
//!
//! All benchmark output goes to this channel and nowhere else; the process
//! standard output stays untouched. Workers hold clones of the handle and are
//! restricted to single-token writes.

use std::env;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Platform output capabilities, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleCaps {
    /// Flush after every write. Some console stacks only surface
    /// single-character writes after an explicit flush; Windows hosts get
    /// this unconditionally, elsewhere `LANEBENCH_AUTOFLUSH=1` opts in.
    pub autoflush: bool,
}

impl ConsoleCaps {
    /// Resolve capabilities for the current platform and environment.
    ///
    /// Called exactly once per run, by the harness; workers receive the
    /// resolved value through their console handle and never re-detect.
    pub fn detect() -> Self {
        let forced = env::var_os("LANEBENCH_AUTOFLUSH").is_some_and(|v| v != "0");
        Self {
            autoflush: cfg!(windows) || forced,
        }
    }
}

/// Handle to the shared output channel.
///
/// Clones share the underlying sink. Every write takes the sink lock, so a
/// ready marker is exactly one token and never interleaves with bytes from
/// another writer.
#[derive(Clone)]
pub struct Console {
    caps: ConsoleCaps,
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    /// Channel writing to the process error stream.
    pub fn stderr(caps: ConsoleCaps) -> Self {
        Self::with_sink(caps, Box::new(io::stderr()))
    }

    /// Channel writing to an arbitrary sink.
    pub fn with_sink(caps: ConsoleCaps, sink: Box<dyn Write + Send>) -> Self {
        Self {
            caps,
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// In-memory channel plus a handle for reading back what was written.
    pub fn capture() -> (Self, CaptureHandle) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = CaptureSink {
            buffer: Arc::clone(&buffer),
        };
        let console = Self::with_sink(ConsoleCaps { autoflush: false }, Box::new(sink));
        (console, CaptureHandle { buffer })
    }

    pub fn caps(&self) -> ConsoleCaps {
        self.caps
    }

    /// Write one full line.
    pub fn line(&self, message: &str) {
        self.write_bytes(message.as_bytes(), true);
    }

    /// Terminate the marker stream and write the blank separator line.
    pub fn separator(&self) {
        self.write_bytes(b"\n", true);
    }

    /// Write a single status token, no separator, best-effort.
    pub fn token(&self, token: char) {
        let mut buf = [0u8; 4];
        self.write_bytes(token.encode_utf8(&mut buf).as_bytes(), false);
    }

    fn write_bytes(&self, bytes: &[u8], newline: bool) {
        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        let _ = sink.write_all(bytes);
        if newline {
            let _ = sink.write_all(b"\n");
        }
        if self.caps.autoflush {
            let _ = sink.flush();
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("caps", &self.caps)
            .finish_non_exhaustive()
    }
}

struct CaptureSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut bytes) = self.buffer.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads back everything written through a capture console.
#[derive(Clone)]
pub struct CaptureHandle {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureHandle {
    pub fn contents(&self) -> String {
        let bytes = self.buffer.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
