use feather_simulation::FrameSnapshot;
use thiserror::Error;

/// Error types for serialization operations
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary serialization error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("Base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Turns a frame snapshot into bytes for a [`Sender`](crate::Sender).
pub trait Serializer: Send + Sync {
    fn serialize(&self, snapshot: &FrameSnapshot) -> Result<Vec<u8>, SerializationError>;
}

/// One JSON object per frame.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, snapshot: &FrameSnapshot) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(snapshot)?)
    }
}

/// Compact bincode encoding of the same snapshot, base64-encoded so that
/// records never contain the newline separator.
pub struct BinarySerializer;

impl BinarySerializer {
    /// Inverse of [`Serializer::serialize`] for one record.
    pub fn decode(record: &[u8]) -> Result<FrameSnapshot, SerializationError> {
        let bytes = base64::decode(record)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

impl Serializer for BinarySerializer {
    fn serialize(&self, snapshot: &FrameSnapshot) -> Result<Vec<u8>, SerializationError> {
        let bytes = bincode::serialize(snapshot)?;
        Ok(base64::encode(bytes).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feather_core::AgentId;
    use feather_simulation::{AgentView, Census, Species};

    fn snapshot() -> FrameSnapshot {
        FrameSnapshot {
            frame: 12,
            time: 0.2,
            agents: vec![
                AgentView {
                    id: AgentId::new(0),
                    species: Species::Red,
                    x: 10.0,
                    y: 20.5,
                    heading: 90.0,
                },
                AgentView {
                    id: AgentId::new(1),
                    species: Species::Blue,
                    x: 300.0,
                    y: 4.0,
                    heading: -45.0,
                },
            ],
            census: Census {
                red: 1,
                green: 0,
                blue: 1,
            },
        }
    }

    #[test]
    fn json_layout_is_flat() {
        let bytes = JsonSerializer.serialize(&snapshot()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["frame"], 12);
        assert_eq!(json["agents"][0]["id"], 0);
        assert_eq!(json["agents"][0]["species"], "red");
        assert_eq!(json["agents"][1]["x"], 300.0);
        assert_eq!(json["census"]["blue"], 1);
    }

    #[test]
    fn binary_is_smaller_and_decodes() {
        let original = snapshot();
        let binary = BinarySerializer.serialize(&original).unwrap();
        let json = JsonSerializer.serialize(&original).unwrap();
        assert!(binary.len() < json.len());
        assert!(!binary.contains(&b'\n'));

        assert_eq!(BinarySerializer::decode(&binary).unwrap(), original);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            BinarySerializer::decode(b"not base64!"),
            Err(SerializationError::Base64(_))
        ));
    }
}
