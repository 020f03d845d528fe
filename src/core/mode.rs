use serde::{Deserialize, Serialize};

/// Battery work mode as set by the user, or by the automatic energy management.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
pub enum UserMode {
    #[display("automatic")]
    Automatic,

    #[display("self-use")]
    SelfUse,

    #[display("time of use")]
    TimeOfUse,

    #[display("backup")]
    Backup,

    #[display("feed-in priority")]
    FeedInPriority,

    #[display("manual")]
    Manual,

    #[display("off-grid")]
    OffGrid,

    #[display("unknown")]
    Unknown,
}

impl UserMode {
    /// Whether the mode forbids taking the battery over from the EMS.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Automatic | Self::Unknown)
    }
}
