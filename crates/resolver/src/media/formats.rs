use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery family of a resolved source.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// Separate audio/video representations addressed through a segment index.
    Dash,
    Mp4,
    Flv,
}

impl StreamFormat {
    pub fn as_str(&self) -> &str {
        match self {
            StreamFormat::Dash => "dash",
            StreamFormat::Mp4 => "mp4",
            StreamFormat::Flv => "flv",
        }
    }

    /// Maps the server's container label (`mp4`, `flv720`, `flv_p60`, ...) to a family.
    pub fn from_label(s: &str) -> Self {
        let s = s.to_lowercase();
        if s.starts_with("mp4") {
            StreamFormat::Mp4
        } else if s.starts_with("dash") {
            StreamFormat::Dash
        } else {
            StreamFormat::Flv
        }
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" => Ok(StreamFormat::Dash),
            "mp4" => Ok(StreamFormat::Mp4),
            "flv" => Ok(StreamFormat::Flv),
            _ => Err(()),
        }
    }
}
