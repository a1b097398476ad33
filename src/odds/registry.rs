//! Known bookmakers and their reliability tiers.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use strum::{Display, EnumString};

/// How far a bookmaker can be trusted to honour a winning bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Reliability {
    /// Frequent payout or limiting complaints.
    Low,
    /// Generally pays out.
    Medium,
    /// Regulated and reputable.
    High,
    /// Not in the registry.
    #[default]
    Unknown,
}

/// Market segment the bookmaker operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BookmakerKind {
    /// India-focused.
    Indian,
    /// Offshore licence.
    Offshore,
    /// Crypto-native.
    Crypto,
}

/// Registry entry for one bookmaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmakerInfo {
    /// Bookmaker id as it appears in provider documents.
    pub id: String,
    /// Landing page.
    pub url: String,
    /// Market segment.
    pub kind: BookmakerKind,
    /// Reliability tier.
    pub reliability: Reliability,
}

/// Lookup table of known bookmakers, preserving registration order.
#[derive(Debug, Clone, Default)]
pub struct BookmakerRegistry {
    entries: Vec<BookmakerInfo>,
    index: HashMap<String, usize>,
}

static DEFAULT_REGISTRY: Lazy<BookmakerRegistry> = Lazy::new(|| {
    use BookmakerKind::{Crypto, Indian, Offshore};
    use Reliability::{Low, Medium};

    [
        ("1xBet", "https://1xbet.com/en/live", Offshore, Low),
        ("Rajabet", "https://rajabet.com/sports", Offshore, Low),
        ("Dafabet", "https://www.dafabet.com/en/sports", Offshore, Medium),
        ("1Win", "https://1win.com/live", Offshore, Low),
        ("BC.Game", "https://bc.game/sports", Crypto, Low),
        ("Hash.game", "https://hash.game/sports", Crypto, Low),
        ("Parimatch", "https://parimatch.com/en/sports", Offshore, Medium),
        ("Melbet", "https://melbet.com/en/live", Offshore, Low),
        ("Mostbet", "https://mostbet.com/en/live", Offshore, Low),
        ("Betwinner", "https://betwinner.com/en/live", Offshore, Low),
        ("22Bet", "https://22bet.com/en/live", Offshore, Low),
        ("10Cric", "https://www.10cric.com/sports/cricket", Indian, Medium),
    ]
    .into_iter()
    .fold(BookmakerRegistry::new(), |registry, (id, url, kind, reliability)| {
        registry.with(BookmakerInfo {
            id: id.to_string(),
            url: url.to_string(),
            kind,
            reliability,
        })
    })
});

impl BookmakerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry of supported bookmakers.
    pub fn builtin() -> &'static BookmakerRegistry {
        &DEFAULT_REGISTRY
    }

    /// Add or replace an entry.
    pub fn with(mut self, info: BookmakerInfo) -> Self {
        self.register(info);
        self
    }

    /// Add or replace an entry in place.
    pub fn register(&mut self, info: BookmakerInfo) {
        match self.index.get(&info.id) {
            Some(&pos) => self.entries[pos] = info,
            None => {
                self.index.insert(info.id.clone(), self.entries.len());
                self.entries.push(info);
            }
        }
    }

    /// Look up a bookmaker.
    pub fn get(&self, id: &str) -> Option<&BookmakerInfo> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    /// Whether the bookmaker is known.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Reliability tier, `Unknown` for unregistered bookmakers.
    pub fn reliability(&self, id: &str) -> Reliability {
        self.get(id).map(|info| info.reliability).unwrap_or_default()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|info| info.id.as_str())
    }

    /// Number of registered bookmakers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn builtin_registry_has_expected_tiers() {
        let registry = BookmakerRegistry::builtin();

        assert_eq!(registry.len(), 12);
        assert_eq!(registry.reliability("Dafabet"), Reliability::Medium);
        assert_eq!(registry.reliability("1xBet"), Reliability::Low);
        assert_eq!(registry.get("BC.Game").unwrap().kind, BookmakerKind::Crypto);
        assert_eq!(registry.get("10Cric").unwrap().kind, BookmakerKind::Indian);
    }

    #[test]
    fn unknown_bookmaker_is_unknown_tier() {
        let registry = BookmakerRegistry::builtin();

        assert!(!registry.contains("Pinnacle"));
        assert_eq!(registry.reliability("Pinnacle"), Reliability::Unknown);
    }

    #[test]
    fn register_replaces_existing_entry_in_place() {
        let mut registry = BookmakerRegistry::new().with(BookmakerInfo {
            id: "Pinnacle".to_string(),
            url: "https://pinnacle.com".to_string(),
            kind: BookmakerKind::Offshore,
            reliability: Reliability::Medium,
        });
        registry.register(BookmakerInfo {
            id: "Pinnacle".to_string(),
            url: "https://pinnacle.com".to_string(),
            kind: BookmakerKind::Offshore,
            reliability: Reliability::High,
        });

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.reliability("Pinnacle"), Reliability::High);
    }

    #[test]
    fn reliability_parses_case_insensitively() {
        assert_eq!(Reliability::from_str("MEDIUM").unwrap(), Reliability::Medium);
        assert_eq!(Reliability::Low.to_string(), "low");
    }
}
