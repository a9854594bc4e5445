use once_cell::sync::Lazy;
use std::{collections::HashMap, fmt::Display, str::FromStr};
use strsim::jaro_winkler;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;

/// Muscle group an exercise primarily trains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MuscleCategory {
    #[serde(alias = "Brust")]
    Chest,
    #[serde(alias = "Schulter")]
    Shoulders,
    #[serde(alias = "Trizeps")]
    Triceps,
    #[serde(alias = "Bauch")]
    Abs,
    #[serde(alias = "Rücken")]
    Back,
    #[serde(alias = "Bizeps")]
    Biceps,
    #[serde(alias = "Beine")]
    Legs,
}

impl MuscleCategory {
    pub const ALL: [MuscleCategory; 7] = [
        Self::Chest,
        Self::Shoulders,
        Self::Triceps,
        Self::Abs,
        Self::Back,
        Self::Biceps,
        Self::Legs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::Shoulders => "shoulders",
            Self::Triceps => "triceps",
            Self::Abs => "abs",
            Self::Back => "back",
            Self::Biceps => "biceps",
            Self::Legs => "legs",
        }
    }
}

impl Display for MuscleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercased spellings (canonical names plus the legacy German labels)
/// mapped to their category.
pub static MUSCLE_LOOKUP: Lazy<HashMap<&'static str, MuscleCategory>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, MuscleCategory> =
        MuscleCategory::ALL.iter().map(|m| (m.as_str(), *m)).collect();
    map.extend([
        ("brust", MuscleCategory::Chest),
        ("schulter", MuscleCategory::Shoulders),
        ("trizeps", MuscleCategory::Triceps),
        ("bauch", MuscleCategory::Abs),
        ("rücken", MuscleCategory::Back),
        ("bizeps", MuscleCategory::Biceps),
        ("beine", MuscleCategory::Legs),
    ]);
    map
});

impl FromStr for MuscleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        canonical_muscle(s).ok_or_else(|| format!("unknown muscle category `{s}`"))
    }
}

/// Returns the category for `m` in any letter case, or `None` if not allowed.
pub fn canonical_muscle<S: AsRef<str>>(m: S) -> Option<MuscleCategory> {
    let m = m.as_ref().trim().to_lowercase();
    MUSCLE_LOOKUP.get(m.as_str()).copied()
}

/// Return the closest allowed category for `input`
/// if similarity ≥ 0.80 *and* clearly better than the runner-up.
/// Otherwise return `None` (no suggestion shown).
pub fn best_muscle_suggestion(input: &str) -> Option<MuscleCategory> {
    let inp = input.trim().to_lowercase();
    if inp.is_empty() {
        return None;
    }

    let mut scores: Vec<(MuscleCategory, f64)> = MuscleCategory::ALL
        .iter()
        .map(|m| (*m, jaro_winkler(&inp, m.as_str())))
        .collect();

    // Highest score first.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = scores[0];
    let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best)
    } else {
        None
    }
}

/// Category of a workout template. Only push, pull and legs take part in
/// the category cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DayCategory {
    Push,
    Pull,
    Legs,
    FullBody,
}

impl DayCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Legs => "legs",
            Self::FullBody => "full-body",
        }
    }
}

impl Display for DayCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DayCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            "legs" => Ok(Self::Legs),
            "full-body" | "fullbody" | "full_body" => Ok(Self::FullBody),
            other => Err(format!("unknown day category `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Dark => "dark",
            Self::Light => "light",
        })
    }
}

/// How command output is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFmt {
    Text,
    Json,
}

impl OutputFmt {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Print `value` as pretty JSON, or run the text renderer.
pub fn emit<T: Serialize, F: FnOnce()>(fmt: OutputFmt, value: &T, text: F) {
    match fmt {
        OutputFmt::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error: could not encode output: {e}"),
        },
        OutputFmt::Text => text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muscle_lookup_is_case_insensitive_and_accepts_legacy_labels() {
        assert_eq!(canonical_muscle("CHEST"), Some(MuscleCategory::Chest));
        assert_eq!(canonical_muscle("Rücken"), Some(MuscleCategory::Back));
        assert_eq!(canonical_muscle("Beine"), Some(MuscleCategory::Legs));
        assert_eq!(canonical_muscle("wings"), None);
    }

    #[test]
    fn legacy_labels_deserialize() {
        let m: MuscleCategory = serde_json::from_str("\"Bizeps\"").unwrap();
        assert_eq!(m, MuscleCategory::Biceps);
        let d: DayCategory = serde_json::from_str("\"full-body\"").unwrap();
        assert_eq!(d, DayCategory::FullBody);
    }

    #[test]
    fn suggestion_for_typo() {
        assert_eq!(best_muscle_suggestion("tricep"), Some(MuscleCategory::Triceps));
        assert_eq!(best_muscle_suggestion("   "), None);
    }

    #[test]
    fn day_category_parses_variants() {
        assert_eq!("Full-Body".parse::<DayCategory>(), Ok(DayCategory::FullBody));
        assert!("arms".parse::<DayCategory>().is_err());
    }
}
