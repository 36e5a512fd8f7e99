//! Upstream schema adapters.
//!
//! The upstream API has gone through three payload generations. Each one is
//! normalized by its own adapter; the generation in use is chosen by
//! configuration, never by inspecting the payload.
//!
//! | Generation | Shape |
//! |------------|-------|
//! | `legacy` | Collection wrappers (`records`, `dates`, `people`, `roster`) |
//! | `locale-v1` | Nested locale objects, box score stats under `boxscore` |
//! | `locale-v2` | As `locale-v1`, stats at the root, `placeName` team names |

mod legacy;
mod locale;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{GameDate, LiveFeed, Player, Team};
use crate::error::{ApiError, ValidationError};

/// Upstream payload generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchemaGeneration {
    #[serde(rename = "legacy")]
    Legacy,
    #[serde(rename = "locale-v1")]
    LocaleV1,
    #[default]
    #[serde(rename = "locale-v2")]
    LocaleV2,
}

impl SchemaGeneration {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::LocaleV1 => "locale-v1",
            Self::LocaleV2 => "locale-v2",
        }
    }
}

impl Display for SchemaGeneration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaGeneration {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "locale-v1" | "v1" => Ok(Self::LocaleV1),
            "locale-v2" | "v2" => Ok(Self::LocaleV2),
            _ => Err(ValidationError::InvalidSchemaGeneration {
                value: value.to_owned(),
            }),
        }
    }
}

/// Normalizes raw upstream JSON into domain records for one generation.
///
/// `base_url` is used to build external links for generations that do not
/// carry them.
#[derive(Debug, Clone)]
pub struct SchemaAdapter {
    generation: SchemaGeneration,
    base_url: String,
}

impl SchemaAdapter {
    pub fn new(generation: SchemaGeneration, base_url: impl Into<String>) -> Self {
        Self {
            generation,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub const fn generation(&self) -> SchemaGeneration {
        self.generation
    }

    pub fn standings_teams(&self, raw: Value) -> Result<Vec<Team>, ApiError> {
        match self.generation {
            SchemaGeneration::Legacy => legacy::standings_teams(raw),
            SchemaGeneration::LocaleV1 | SchemaGeneration::LocaleV2 => {
                locale::standings_teams(raw, self.locale())
            }
        }
    }

    pub fn scoreboard_teams(&self, raw: Value) -> Result<Vec<Team>, ApiError> {
        match self.generation {
            SchemaGeneration::Legacy => legacy::scoreboard_teams(raw),
            SchemaGeneration::LocaleV1 | SchemaGeneration::LocaleV2 => {
                locale::scoreboard_teams(raw, self.locale())
            }
        }
    }

    pub fn roster(&self, raw: Value) -> Result<Vec<Player>, ApiError> {
        match self.generation {
            SchemaGeneration::Legacy => legacy::roster(raw),
            SchemaGeneration::LocaleV1 | SchemaGeneration::LocaleV2 => {
                locale::roster(raw, self.locale())
            }
        }
    }

    /// `None` when the payload carries no usable player.
    pub fn player(&self, raw: Value) -> Result<Option<Player>, ApiError> {
        match self.generation {
            SchemaGeneration::Legacy => legacy::player(raw),
            SchemaGeneration::LocaleV1 | SchemaGeneration::LocaleV2 => {
                locale::player(raw, self.locale())
            }
        }
    }

    /// Game references scheduled on exactly `date`.
    pub fn schedule(&self, raw: Value, date: GameDate) -> Result<Vec<String>, ApiError> {
        let date = date.to_string();
        match self.generation {
            SchemaGeneration::Legacy => legacy::schedule(raw, &date),
            SchemaGeneration::LocaleV1 | SchemaGeneration::LocaleV2 => {
                locale::schedule(raw, &date)
            }
        }
    }

    /// `None` when the payload has neither a home nor an away side.
    pub fn live_feed(&self, raw: Value, game_id: i64) -> Result<Option<LiveFeed>, ApiError> {
        match self.generation {
            SchemaGeneration::Legacy => legacy::live_feed(raw, game_id),
            SchemaGeneration::LocaleV1 | SchemaGeneration::LocaleV2 => {
                locale::live_feed(raw, game_id, self.locale())
            }
        }
    }

    fn locale(&self) -> locale::Options<'_> {
        locale::Options {
            stats_at_root: self.generation == SchemaGeneration::LocaleV2,
            base_url: &self.base_url,
        }
    }
}

fn decode<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(raw)
        .map_err(|error| ApiError::parse(format!("unexpected {what} payload: {error}")))
}

/// Localized text: a plain string or `{"default": "...", "<lang>": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum LocalizedText {
    Plain(String),
    Localized {
        #[serde(default)]
        default: Option<String>,
    },
}

impl LocalizedText {
    fn text(&self) -> Option<&str> {
        let value = match self {
            Self::Plain(value) => Some(value.as_str()),
            Self::Localized { default } => default.as_deref(),
        };
        value.map(str::trim).filter(|value| !value.is_empty())
    }
}

fn localized(value: &Option<LocalizedText>) -> Option<String> {
    value.as_ref().and_then(LocalizedText::text).map(str::to_string)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) if value.is_finite() => Some(*value as i64),
            Self::Float(_) => None,
            Self::Text(value) => value.trim().parse().ok(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }
}

/// Integer that may arrive as a number, a numeric string or null. Missing or
/// unparseable values become zero.
fn loose_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.as_i64()).unwrap_or(0))
}

fn loose_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| value.as_i64())
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0))
}

fn loose_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| value.as_f64())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0))
}

/// A list that may be missing or `null`, both read as empty.
fn null_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `1st`/`2nd`/`3rd` for regulation, `OT`, `SO`, else the number as text.
fn period_label(number: Option<u32>, period_type: Option<&str>) -> Option<String> {
    match (period_type.map(str::trim), number) {
        (Some("OT"), _) => Some(String::from("OT")),
        (Some("SO"), _) => Some(String::from("SO")),
        (Some("REG") | None, Some(1)) => Some(String::from("1st")),
        (Some("REG") | None, Some(2)) => Some(String::from("2nd")),
        (Some("REG") | None, Some(3)) => Some(String::from("3rd")),
        (_, Some(number)) => Some(number.to_string()),
        (_, None) => None,
    }
}

/// Last path segment that is entirely digits, scanning from the end.
pub fn trailing_game_id(reference: &str) -> Option<i64> {
    reference
        .split(['/', '?', '#'])
        .rev()
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .find_map(|segment| segment.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generation_names() {
        assert_eq!(
            "locale-v1".parse::<SchemaGeneration>(),
            Ok(SchemaGeneration::LocaleV1)
        );
        assert_eq!(" LEGACY ".parse::<SchemaGeneration>(), Ok(SchemaGeneration::Legacy));
        assert!("v3".parse::<SchemaGeneration>().is_err());
        assert_eq!(SchemaGeneration::default(), SchemaGeneration::LocaleV2);
    }

    #[test]
    fn localized_text_accepts_both_shapes() {
        let plain: LocalizedText = serde_json::from_str("\"PIT\"").expect("plain");
        let nested: LocalizedText =
            serde_json::from_str(r#"{"default":"Penguins","fr":"Pingouins"}"#).expect("nested");
        let blank: LocalizedText = serde_json::from_str(r#"{"fr":"x"}"#).expect("blank");

        assert_eq!(plain.text(), Some("PIT"));
        assert_eq!(nested.text(), Some("Penguins"));
        assert_eq!(blank.text(), None);
    }

    #[test]
    fn period_labels_follow_descriptor() {
        assert_eq!(period_label(Some(1), Some("REG")).as_deref(), Some("1st"));
        assert_eq!(period_label(Some(3), None).as_deref(), Some("3rd"));
        assert_eq!(period_label(Some(4), Some("OT")).as_deref(), Some("OT"));
        assert_eq!(period_label(Some(5), Some("SO")).as_deref(), Some("SO"));
        assert_eq!(period_label(Some(4), Some("REG")).as_deref(), Some("4"));
        assert_eq!(period_label(None, None), None);
    }

    #[test]
    fn trailing_game_id_handles_paths_and_bare_ids() {
        assert_eq!(trailing_game_id("2024010071"), Some(2_024_010_071));
        assert_eq!(
            trailing_game_id("/gamecenter/det-vs-pit/2024/10/01/2024010071"),
            Some(2_024_010_071)
        );
        assert_eq!(
            trailing_game_id("/api/v1/game/2024010071/feed/live"),
            Some(2_024_010_071)
        );
        assert_eq!(trailing_game_id("/gamecenter/det-vs-pit"), None);
    }
}
