//! Presence status classification.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    #[default]
    Offline,
}

pub const ONLINE_COLOR: Rgba<u8> = Rgba([0x43, 0xB5, 0x81, 0xFF]);
pub const IDLE_COLOR: Rgba<u8> = Rgba([0xFA, 0xA6, 0x1A, 0xFF]);
pub const DND_COLOR: Rgba<u8> = Rgba([0xC8, 0x41, 0x42, 0xFF]);
pub const OFFLINE_COLOR: Rgba<u8> = Rgba([0x74, 0x7E, 0x8C, 0xFF]);

impl StatusKind {
    /// Maps a gateway status value to its kind. Unknown values (including
    /// `invisible`) read as offline.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "online" => StatusKind::Online,
            "idle" => StatusKind::Idle,
            "dnd" => StatusKind::DoNotDisturb,
            _ => StatusKind::Offline,
        }
    }

    pub fn color(self) -> Rgba<u8> {
        match self {
            StatusKind::Online => ONLINE_COLOR,
            StatusKind::Idle => IDLE_COLOR,
            StatusKind::DoNotDisturb => DND_COLOR,
            StatusKind::Offline => OFFLINE_COLOR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusKind::Online => "online",
            StatusKind::Idle => "idle",
            StatusKind::DoNotDisturb => "dnd",
            StatusKind::Offline => "offline",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display color and canonical tag for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub color: Rgba<u8>,
    pub kind: StatusKind,
}

pub fn classify_status(raw: &str) -> Status {
    let kind = StatusKind::classify(raw);
    Status {
        color: kind.color(),
        kind,
    }
}
