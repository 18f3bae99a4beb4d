mod sender;
mod serializer;

use feather_config::{SenderType, SerializerType, TransportSettings};
use feather_simulation::FrameSnapshot;
use log::{debug, info};

// Re-export types
pub use self::sender::{FileSender, NullSender, Sender, StdioSender, TransportError};
pub use self::serializer::{BinarySerializer, JsonSerializer, SerializationError, Serializer};

/// Serializes snapshots and hands them to a sender, every `output_frequency` frames.
pub struct TransportController {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    output_frequency: u32,
    frames_sent: u64,
    bytes_sent: u64,
}

impl TransportController {
    /// Create a new transport controller with the provided serializer and sender
    pub fn new(
        serializer: Box<dyn Serializer>,
        sender: Box<dyn Sender>,
        output_frequency: u32,
    ) -> Self {
        Self {
            serializer,
            sender,
            output_frequency: output_frequency.max(1),
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Create a transport controller from configuration. Returns `None` when
    /// either the serializer or the sender is disabled.
    pub fn from_config(config: &TransportSettings) -> Result<Option<Self>, TransportError> {
        let serializer: Box<dyn Serializer> = match config.serializer {
            SerializerType::Json => Box::new(JsonSerializer),
            SerializerType::Binary => Box::new(BinarySerializer),
            SerializerType::None => {
                info!("Frame output disabled");
                return Ok(None);
            }
        };

        let sender: Box<dyn Sender> = match config.sender {
            SenderType::Stdio => Box::new(StdioSender::new()),
            SenderType::File => {
                let path = config.path.as_deref().ok_or_else(|| {
                    TransportError::Configuration("file sender requires a path".to_string())
                })?;
                Box::new(FileSender::create(path)?)
            }
            SenderType::None => {
                info!("Frame output disabled");
                return Ok(None);
            }
        };

        debug!(
            "Transport: {:?} serializer, {:?} sender, every {} frame(s)",
            config.serializer, config.sender, config.output_frequency
        );
        Ok(Some(Self::new(serializer, sender, config.output_frequency)))
    }

    /// Sends `snapshot` if its frame number is a multiple of the output
    /// frequency. Returns whether it was sent.
    pub fn publish(&mut self, snapshot: &FrameSnapshot) -> Result<bool, TransportError> {
        if snapshot.frame % self.output_frequency as u64 != 0 {
            return Ok(false);
        }

        let bytes = self.serializer.serialize(snapshot)?;
        self.sender.send(&bytes)?;
        self.frames_sent += 1;
        self.bytes_sent += bytes.len() as u64;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.sender.flush()
    }

    pub fn output_frequency(&self) -> u32 {
        self.output_frequency
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Payload bytes handed to the sender, excluding record separators.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}
