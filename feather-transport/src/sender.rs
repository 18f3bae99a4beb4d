//! Destinations for serialized frames.
//!
//! Every sender writes one record per frame followed by a newline.

use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::serializer::SerializationError;

/// Error types that can occur during data transport (sending).
#[derive(Error, Debug)]
pub enum TransportError {
    /// An I/O error occurred (e.g., writing to a file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// An error occurred during serialization before sending.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    /// An error occurred due to invalid transport configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Sends serialized data to a destination.
pub trait Sender: Send {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Flushes any buffered output. A no-op for unbuffered senders.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Sends data to standard output, one frame per line.
pub struct StdioSender {
    stdout: io::Stdout,
}

impl StdioSender {
    pub fn new() -> Self {
        StdioSender { stdout: io::stdout() }
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for StdioSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut out = self.stdout.lock();
        out.write_all(data)?;
        out.write_all(b"\n")?;
        out.flush()?; // Renderers read frames as they arrive
        Ok(())
    }
}

/// Appends frames to a file through a buffer.
pub struct FileSender {
    writer: BufWriter<File>,
}

impl FileSender {
    pub fn create(path: &Path) -> Result<Self, TransportError> {
        let file = File::create(path)?;
        debug!("Writing frames to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl Sender for FileSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(data)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards everything. Useful for benchmarking the simulation alone.
#[derive(Default)]
pub struct NullSender;

impl Sender for NullSender {
    fn send(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }
}
