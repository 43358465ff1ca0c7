use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::utils::normalize::{self, Schema};

/// Government open-data feeds re-served by the proxy endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Adopt,
    Lost,
    Shelters,
    Stats,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Adopt,
        Dataset::Lost,
        Dataset::Shelters,
        Dataset::Stats,
    ];

    /// Cache key.
    pub fn key(self) -> &'static str {
        match self {
            Dataset::Adopt => "adopt",
            Dataset::Lost => "lost",
            Dataset::Shelters => "shelters",
            Dataset::Stats => "stats",
        }
    }

    /// `UnitId` query parameter of the open-data TransService.
    pub fn unit_id(self) -> &'static str {
        match self {
            Dataset::Adopt => "QcbUEzN6E6DL",
            Dataset::Lost => "IFJomqVzyB0i",
            Dataset::Shelters => "2thVboChxuKs",
            Dataset::Stats => "DyplMIk3U1hf",
        }
    }

    pub fn schema(self) -> &'static Schema {
        match self {
            Dataset::Adopt => &normalize::ADOPT,
            Dataset::Lost => &normalize::LOST,
            Dataset::Shelters => &normalize::SHELTERS,
            Dataset::Stats => &normalize::STATS,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown dataset: {0}")]
pub struct UnknownDataset(pub String);

impl FromStr for Dataset {
    type Err = UnknownDataset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|dataset| dataset.key() == s)
            .ok_or_else(|| UnknownDataset(s.to_string()))
    }
}
