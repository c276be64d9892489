//! Stream domain types — Event, Stream
//!
//! Serializable, cloneable, and immutable once handed to a state machine.

use serde::{Deserialize, Serialize};

/// Single action record of a session stream
///
/// JSON form is internally tagged by `type`:
/// `{"type":"ssh","name":"alice","passwd":"secret"}`, `{"type":"sudo","passwd":"secret"}`,
/// `{"type":"dir"}`. Other tags never construct an `Event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Ssh { name: String, passwd: String },
    Sudo { passwd: String },
    Dir,
}

impl Event {
    pub fn ssh(name: impl Into<String>, passwd: impl Into<String>) -> Self {
        Self::Ssh {
            name: name.into(),
            passwd: passwd.into(),
        }
    }

    pub fn sudo(passwd: impl Into<String>) -> Self {
        Self::Sudo {
            passwd: passwd.into(),
        }
    }

    /// Tag string as it appears on the wire and in stream files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ssh { .. } => "ssh",
            Self::Sudo { .. } => "sudo",
            Self::Dir => "dir",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Ordered event log submitted under one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub stream_id: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Stream {
    pub fn new(stream_id: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            stream_id: stream_id.into(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
