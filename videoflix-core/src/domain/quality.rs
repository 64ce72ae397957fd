//! Discrete playback quality tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Playback resolution level, ordered from lowest to highest.
///
/// The backend transcodes every upload into these four renditions and the
/// signed-URL endpoint addresses them by label (`120p` .. `1080p`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum QualityTier {
    /// 120p, chosen for very slow links
    #[serde(rename = "120p")]
    Low,
    /// 360p
    #[serde(rename = "360p")]
    Medium,
    /// 720p, the default when no bandwidth signal is available
    #[default]
    #[serde(rename = "720p")]
    Standard,
    /// 1080p
    #[serde(rename = "1080p")]
    High,
}

impl QualityTier {
    /// All tiers from lowest to highest.
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Low,
        QualityTier::Medium,
        QualityTier::Standard,
        QualityTier::High,
    ];

    /// Builds a tier from an ordinal, clamping out-of-range values.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Ordinal of this tier (0 = lowest, 3 = highest).
    pub fn index(self) -> usize {
        match self {
            QualityTier::Low => 0,
            QualityTier::Medium => 1,
            QualityTier::Standard => 2,
            QualityTier::High => 3,
        }
    }

    /// Rendition label used by the API.
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Low => "120p",
            QualityTier::Medium => "360p",
            QualityTier::Standard => "720p",
            QualityTier::High => "1080p",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    /// Accepts either a rendition label (`720p`) or an ordinal (`2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        if let Some(tier) = Self::ALL.iter().find(|tier| tier.label() == trimmed) {
            return Ok(*tier);
        }
        match trimmed.parse::<usize>() {
            Ok(index) if index < Self::ALL.len() => Ok(Self::from_index(index)),
            _ => Err(format!("Invalid quality tier: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index_clamps() {
        assert_eq!(QualityTier::from_index(0), QualityTier::Low);
        assert_eq!(QualityTier::from_index(3), QualityTier::High);
        assert_eq!(QualityTier::from_index(17), QualityTier::High);
    }

    #[test]
    fn test_parse_label_and_ordinal() {
        assert_eq!("720p".parse::<QualityTier>().unwrap(), QualityTier::Standard);
        assert_eq!("1080P".parse::<QualityTier>().unwrap(), QualityTier::High);
        assert_eq!("1".parse::<QualityTier>().unwrap(), QualityTier::Medium);
        assert!("4".parse::<QualityTier>().is_err());
        assert!("4k".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&QualityTier::Medium).unwrap();
        assert_eq!(json, "\"360p\"");
        let tier: QualityTier = serde_json::from_str("\"120p\"").unwrap();
        assert_eq!(tier, QualityTier::Low);
    }

    #[test]
    fn test_default_is_standard() {
        assert_eq!(QualityTier::default().index(), 2);
    }
}
