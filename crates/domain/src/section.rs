//! Room sections and their wire `sLocale` tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// A sub-area of a room. Each one maps to a fixed wire locale token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Bedroom,
    Bathroom,
    Living,
    /// Room-wide service actions (resets, turn-down).
    Settings,
}

impl Section {
    /// Sections that have physical lights and climate zones.
    pub const PHYSICAL: [Section; 3] = [Section::Bedroom, Section::Bathroom, Section::Living];

    /// The `sLocale` token used on the wire.
    #[must_use]
    pub fn locale(self) -> &'static str {
        match self {
            Self::Bedroom => "Camera",
            Self::Bathroom => "Bagno",
            Self::Living => "Soggiorno",
            Self::Settings => "Globale",
        }
    }

    /// Resolve a wire locale token.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownLocale`] for tokens outside the table.
    pub fn from_locale(token: &str) -> Result<Self, ProtocolError> {
        match token {
            "Camera" => Ok(Self::Bedroom),
            "Bagno" => Ok(Self::Bathroom),
            "Soggiorno" => Ok(Self::Living),
            "Globale" => Ok(Self::Settings),
            other => Err(ProtocolError::UnknownLocale(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bedroom => "bedroom",
            Self::Bathroom => "bathroom",
            Self::Living => "living",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bedroom" => Ok(Self::Bedroom),
            "bathroom" => Ok(Self::Bathroom),
            "living" => Ok(Self::Living),
            "settings" => Ok(Self::Settings),
            other => Err(ProtocolError::UnknownLocale(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_sections_to_locale_tokens() {
        assert_eq!(Section::Bedroom.locale(), "Camera");
        assert_eq!(Section::Bathroom.locale(), "Bagno");
        assert_eq!(Section::Living.locale(), "Soggiorno");
        assert_eq!(Section::Settings.locale(), "Globale");
    }

    #[test]
    fn should_resolve_locale_back_to_section() {
        for section in [
            Section::Bedroom,
            Section::Bathroom,
            Section::Living,
            Section::Settings,
        ] {
            assert_eq!(Section::from_locale(section.locale()).unwrap(), section);
        }
    }

    #[test]
    fn should_fail_with_unknown_locale_when_section_name_is_unknown() {
        let err = "garage".parse::<Section>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownLocale(name) if name == "garage"));
    }

    #[test]
    fn should_fail_with_unknown_locale_when_token_is_unknown() {
        assert!(Section::from_locale("Cucina").is_err());
    }

    #[test]
    fn should_serialize_as_lowercase_name() {
        let json = serde_json::to_string(&Section::Living).unwrap();
        assert_eq!(json, "\"living\"");
    }
}
