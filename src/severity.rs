//! The closed accident-severity taxonomy.
//!
//! Colors, emoji and recommendations are keyed on the enum identity, never on
//! label text, so renaming a display label cannot change behavior.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityClass {
    MinorDamage,
    ModerateDamage,
    SevereCrash,
}

impl SeverityClass {
    /// Ordered set of all classes; the index matches the model output slot.
    pub const ALL: [SeverityClass; 3] = [
        SeverityClass::MinorDamage,
        SeverityClass::ModerateDamage,
        SeverityClass::SevereCrash,
    ];

    pub fn from_index(index: usize) -> Option<SeverityClass> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            SeverityClass::MinorDamage => 0,
            SeverityClass::ModerateDamage => 1,
            SeverityClass::SevereCrash => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityClass::MinorDamage => "Minor Damage",
            SeverityClass::ModerateDamage => "Moderate Damage",
            SeverityClass::SevereCrash => "Severe Crash",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SeverityClass::MinorDamage => "Minor scratches, dents, or cosmetic damage",
            SeverityClass::ModerateDamage => "Significant structural damage, airbag deployment",
            SeverityClass::SevereCrash => "Major structural failure, potential injuries",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            SeverityClass::MinorDamage => "green",
            SeverityClass::ModerateDamage => "yellow",
            SeverityClass::SevereCrash => "red",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            SeverityClass::MinorDamage => "🟢",
            SeverityClass::ModerateDamage => "🟡",
            SeverityClass::SevereCrash => "🔴",
        }
    }

    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            SeverityClass::MinorDamage => &[
                "Minor repairs sufficient",
                "Document for insurance",
                "A local mechanic can handle the repair",
                "Affordable repair costs",
            ],
            SeverityClass::ModerateDamage => &[
                "Medical evaluation recommended",
                "File an insurance claim",
                "Take detailed photographs",
                "Vehicle inspection needed",
            ],
            SeverityClass::SevereCrash => &[
                "Immediate medical attention required",
                "Contact emergency services",
                "Document the scene thoroughly",
                "Secure the area",
            ],
        }
    }
}

impl fmt::Display for SeverityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn taxonomy_is_closed_and_ordered() {
        assert_eq!(SeverityClass::ALL.len(), 3);
        for (i, class) in SeverityClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(SeverityClass::from_index(i), Some(*class));
        }
        assert_eq!(SeverityClass::from_index(3), None);
    }

    #[test]
    fn labels_are_distinct() {
        let labels: HashSet<_> = SeverityClass::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn presentation_is_keyed_on_identity() {
        assert_eq!(SeverityClass::MinorDamage.color(), "green");
        assert_eq!(SeverityClass::ModerateDamage.color(), "yellow");
        assert_eq!(SeverityClass::SevereCrash.color(), "red");
        for class in SeverityClass::ALL {
            assert!(!class.recommendations().is_empty());
            assert!(!class.description().is_empty());
            assert!(!class.emoji().is_empty());
        }
    }

    #[test]
    fn display_matches_label() {
        assert_eq!(SeverityClass::SevereCrash.to_string(), "Severe Crash");
    }

    #[test]
    fn serializes_as_snake_case_identifier() {
        let json = serde_json::to_string(&SeverityClass::MinorDamage).unwrap();
        assert_eq!(json, "\"minor_damage\"");
    }
}
