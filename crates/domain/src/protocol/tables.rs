//! Fixed lookup tables of the controller protocol.

use crate::section::Section;

/// A dimmer zone on the wire: `<prefix>Liv` / `<prefix>Set`, and the device
/// wire name it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmerZone {
    pub prefix: &'static str,
    pub wire_name: &'static str,
}

const fn zone(prefix: &'static str, wire_name: &'static str) -> DimmerZone {
    DimmerZone { prefix, wire_name }
}

const BEDROOM_ZONES: &[DimmerZone] = &[
    zone("nTota", "Totale"),
    zone("nParz", "Parziale"),
    zone("nLett", "Letto"),
    zone("nCoSx", "ComodinoSx"),
    zone("nCoDx", "ComodinoDx"),
    zone("nScri", "Scrivania"),
];

const BATHROOM_ZONES: &[DimmerZone] = &[
    zone("nTota", "Totale"),
    zone("nParz", "Parziale"),
    zone("nSpec", "Speciale"),
];

const LIVING_ZONES: &[DimmerZone] = &[
    zone("nTota", "Totale"),
    zone("nParz", "Parziale"),
    zone("nDiv", "Divano"),
    zone("nTv", "Televisione"),
];

/// Dimmer zones reported for a section.
#[must_use]
pub fn dimmer_zones(section: Section) -> &'static [DimmerZone] {
    match section {
        Section::Bedroom => BEDROOM_ZONES,
        Section::Bathroom => BATHROOM_ZONES,
        Section::Living => LIVING_ZONES,
        Section::Settings => &[],
    }
}

/// Switches whose boolean field is not the generic `bOnOff`.
const SWITCH_FIELD_OVERRIDES: &[(&str, &str)] = &[("ScaldaOnOff", "bScaldaOnOff")];

pub const GENERIC_SWITCH_FIELD: &str = "bOnOff";

/// Boolean field carrying a switch's state, in commands and state reports.
#[must_use]
pub fn switch_field(wire_name: &str) -> &'static str {
    SWITCH_FIELD_OVERRIDES
        .iter()
        .find(|(name, _)| *name == wire_name)
        .map_or(GENERIC_SWITCH_FIELD, |&(_, field)| field)
}

/// Momentary actions with a dedicated flag field.
const MOMENTARY_FLAGS: &[(&str, &str)] = &[
    ("ResetLuci", "bResetLuci"),
    ("ResetClima", "bResetClima"),
    ("TurnDown", "bTurnDown"),
];

pub const GENERIC_MOMENTARY_FLAG: &str = "bCommand";

/// Flag field raised by a momentary action.
#[must_use]
pub fn momentary_flag(wire_name: &str) -> &'static str {
    MOMENTARY_FLAGS
        .iter()
        .find(|(name, _)| *name == wire_name)
        .map_or(GENERIC_MOMENTARY_FLAG, |&(_, field)| field)
}

/// Every flag field a momentary command may carry.
pub fn momentary_flag_fields() -> impl Iterator<Item = &'static str> {
    MOMENTARY_FLAGS
        .iter()
        .map(|(_, field)| *field)
        .chain(std::iter::once(GENERIC_MOMENTARY_FLAG))
}

/// What a controller `sNome` tag announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    Dimmer(Section),
    /// `None` for the room-wide `Clima` report.
    Climate(Option<Section>),
    Switch(Section),
    Momentary(Section),
}

/// Match a state discriminator such as `CameraLuci` or `Clima`.
#[must_use]
pub fn discriminator(name: &str) -> Option<Discriminator> {
    if name == "Clima" {
        return Some(Discriminator::Climate(None));
    }
    let physical = |locale: &str| {
        Section::from_locale(locale)
            .ok()
            .filter(|section| *section != Section::Settings)
    };
    if let Some(locale) = name.strip_suffix("Luci") {
        return physical(locale).map(Discriminator::Dimmer);
    }
    if let Some(locale) = name.strip_suffix("Clima") {
        return physical(locale).map(|s| Discriminator::Climate(Some(s)));
    }
    if let Some(locale) = name.strip_suffix("OnOff") {
        return physical(locale).map(Discriminator::Switch);
    }
    if let Some(locale) = name.strip_suffix("Mono") {
        return Section::from_locale(locale).ok().map(Discriminator::Momentary);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_override_field_for_towel_heater() {
        assert_eq!(switch_field("ScaldaOnOff"), "bScaldaOnOff");
        assert_eq!(switch_field("Ventilatore"), "bOnOff");
    }

    #[test]
    fn should_fall_back_to_generic_momentary_flag() {
        assert_eq!(momentary_flag("ResetLuci"), "bResetLuci");
        assert_eq!(momentary_flag("TurnDown"), "bTurnDown");
        assert_eq!(momentary_flag("ChiamaMaggiordomo"), "bCommand");
    }

    #[test]
    fn should_classify_known_discriminators() {
        assert_eq!(
            discriminator("CameraLuci"),
            Some(Discriminator::Dimmer(Section::Bedroom))
        );
        assert_eq!(discriminator("Clima"), Some(Discriminator::Climate(None)));
        assert_eq!(
            discriminator("BagnoClima"),
            Some(Discriminator::Climate(Some(Section::Bathroom)))
        );
        assert_eq!(
            discriminator("SoggiornoOnOff"),
            Some(Discriminator::Switch(Section::Living))
        );
        assert_eq!(
            discriminator("GlobaleMono"),
            Some(Discriminator::Momentary(Section::Settings))
        );
    }

    #[test]
    fn should_not_classify_unknown_discriminators() {
        assert_eq!(discriminator("GlobaleLuci"), None);
        assert_eq!(discriminator("CucinaLuci"), None);
        assert_eq!(discriminator("Ascensore"), None);
    }

    #[test]
    fn should_list_special_zone_for_bathroom_only() {
        assert!(dimmer_zones(Section::Bathroom).iter().any(|z| z.prefix == "nSpec"));
        assert!(!dimmer_zones(Section::Bedroom).iter().any(|z| z.prefix == "nSpec"));
        assert!(dimmer_zones(Section::Settings).is_empty());
    }
}
