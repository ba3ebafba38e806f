//! Campus branches that publish their own timetable feed.

use std::fmt;

/// A campus branch. The set is fixed; unknown names never map to a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Soc,
    Nic,
    Sob,
    Kd,
    Kic,
}

impl Branch {
    /// Every branch, in the order requests are planned.
    pub const ALL: [Branch; 5] = [
        Branch::Soc,
        Branch::Nic,
        Branch::Sob,
        Branch::Kd,
        Branch::Kic,
    ];

    /// The `wing` keyword the upstream expects for this branch.
    pub fn upstream_keyword(self) -> &'static str {
        match self {
            Branch::Soc => "CO",
            Branch::Nic => "NIC",
            Branch::Sob => "RJ",
            Branch::Kd => "KD",
            Branch::Kic => "KIC",
        }
    }

    /// The name shown to users and accepted as a filter.
    pub fn display_name(self) -> &'static str {
        match self {
            Branch::Soc => "SOC",
            Branch::Nic => "NIC",
            Branch::Sob => "SOB",
            Branch::Kd => "KD",
            Branch::Kic => "KIC",
        }
    }

    /// Exact, case-sensitive lookup by display name.
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|branch| branch.display_name() == name)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
