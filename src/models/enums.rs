use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Pending => "pending",
    Completed => "completed",
    Missed => "missed",
});

str_enum!(SessionType {
    Individual => "individual",
    Group => "group",
    Family => "family",
    CheckIn => "check_in",
    Crisis => "crisis",
    Consultation => "consultation",
});

str_enum!(ClaimStatus {
    InProgress => "in_progress",
    Submitted => "submitted",
});

impl AppointmentStatus {
    /// Map the status spellings used across screens onto the canonical set.
    ///
    /// Appointment lists say "Upcoming", detail screens "Scheduled", and the
    /// billing tab "No Show"; all collapse to pending/completed/missed.
    pub fn normalize(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "pending" | "upcoming" | "scheduled" | "confirmed" => Some(Self::Pending),
            "completed" | "complete" | "done" | "attended" => Some(Self::Completed),
            "missed" | "noshow" | "absent" | "cancelled" | "canceled" => Some(Self::Missed),
            _ => None,
        }
    }
}

impl ClaimStatus {
    /// Label shown in the claims list ("In Progress" is also the navigation
    /// parameter value used to resume a draft).
    pub fn label(&self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Submitted => "Submitted",
        }
    }
}
