use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Voices accepted by the speech endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
    Coral,
    Verse,
    Ballad,
    Ash,
    Sage,
    Marin,
    Cedar,
}

impl Voice {
    /// All voices in display order.
    pub const ALL: [Voice; 13] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
        Voice::Coral,
        Voice::Verse,
        Voice::Ballad,
        Voice::Ash,
        Voice::Sage,
        Voice::Marin,
        Voice::Cedar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
            Voice::Coral => "coral",
            Voice::Verse => "verse",
            Voice::Ballad => "ballad",
            Voice::Ash => "ash",
            Voice::Sage => "sage",
            Voice::Marin => "marin",
            Voice::Cedar => "cedar",
        }
    }

    /// Voice identifiers as plain strings (for `/voices`)
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Voice::as_str).collect()
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown voice '{0}'")]
pub struct UnknownVoice(pub String);

impl FromStr for Voice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}
