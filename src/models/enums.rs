use serde::{Deserialize, Serialize};

use super::ParseEnumError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serde representation.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Severity {
    None => "none",
    Low => "low",
    Moderate => "moderate",
    High => "high",
    Critical => "critical",
    Unknown => "unknown",
});

str_enum!(HealthStatus {
    Healthy => "healthy",
    Diseased => "diseased",
    Unknown => "unknown",
});

str_enum!(PlantPart {
    Leaf => "leaf",
    Trunk => "trunk",
    WholeTree => "whole_tree",
    Unknown => "unknown",
});

str_enum!(ProductivityStatus {
    Optimal => "optimal",
    AtRisk => "at_risk",
    Critical => "critical",
    Unknown => "unknown",
});

str_enum!(ContaminationLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(Grade {
    A => "A",
    B => "B",
    C => "C",
    D => "D",
});

impl Severity {
    /// Only `None` counts as healthy; `Unknown` does not.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl Grade {
    /// One step worse, saturating at D.
    pub fn downgrade(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::C,
            Self::C | Self::D => Self::D,
        }
    }

    /// Grades sold as ribbed smoked sheet.
    pub fn is_sheet_grade(&self) -> bool {
        matches!(self, Self::A | Self::B)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn severity_round_trips_through_str() {
        for s in ["none", "low", "moderate", "high", "critical", "unknown"] {
            assert_eq!(Severity::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn plant_part_uses_snake_case() {
        let json = serde_json::to_string(&PlantPart::WholeTree).unwrap();
        assert_eq!(json, "\"whole_tree\"");
    }

    #[test]
    fn unknown_value_is_an_error() {
        let err = HealthStatus::from_str("sickly").unwrap_err();
        assert_eq!(err.field, "HealthStatus");
        assert_eq!(err.value, "sickly");
    }

    #[test]
    fn grade_downgrade_saturates() {
        assert_eq!(Grade::A.downgrade(), Grade::B);
        assert_eq!(Grade::C.downgrade(), Grade::D);
        assert_eq!(Grade::D.downgrade(), Grade::D);
    }

    #[test]
    fn sheet_grades() {
        assert!(Grade::A.is_sheet_grade());
        assert!(Grade::B.is_sheet_grade());
        assert!(!Grade::C.is_sheet_grade());
    }
}
