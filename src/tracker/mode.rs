use serde::{Deserialize, Serialize};

/// Operating mode of the tracking state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Idle; no commands issued. Initial mode and the mode after any fatal failure.
    #[default]
    Standby,
    /// Sweeping the scan pattern while no target is present
    Scanning,
    /// Correcting towards a detected target
    Tracking,
}

impl TrackingMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Scanning => "scanning",
            Self::Tracking => "tracking",
        }
    }
}
