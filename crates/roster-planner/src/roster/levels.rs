use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::placement::{Sex, Student};

/// Level names from the youngest cohort to the oldest.
const LEVEL_LADDER: [&str; 8] = [
    "CM2",
    "6EME",
    "5EME",
    "4EME",
    "3EME",
    "SECONDE",
    "PREMIERE",
    "TERMINALE",
];

/// Feeder level of a target level; unknown levels feed themselves.
pub fn source_level(target_level: &str) -> String {
    let target = target_level.trim().to_uppercase();
    let source = match target.as_str() {
        "SECONDE" => "3EME",
        "PREMIERE" => "SECONDE",
        "TERMINALE" => "PREMIERE",
        "3EME" => "4EME",
        "4EME" => "5EME",
        "5EME" => "6EME",
        "6EME" => "CM2",
        _ => return target,
    };
    source.to_string()
}

/// Headcount of one level detected in the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: String,
    pub total: usize,
    pub boys: usize,
    pub girls: usize,
    pub unspecified_sex: usize,
}

/// Leading alphanumeric run of an origin class, uppercased: "3EME A" gives "3EME".
pub fn main_level(origin_class: &str) -> Option<String> {
    let level: String = origin_class
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    (!level.is_empty()).then(|| level.to_uppercase())
}

/// Levels present in the roster, oldest first; unrecognised names come last.
pub fn detect_levels(students: &[Student]) -> Vec<LevelStats> {
    let mut by_level: BTreeMap<String, LevelStats> = BTreeMap::new();

    for student in students {
        let Some(level) = main_level(&student.origin_class) else {
            continue;
        };
        let stats = by_level.entry(level.clone()).or_insert_with(|| LevelStats {
            level,
            ..LevelStats::default()
        });
        stats.total += 1;
        match student.sex {
            Sex::Male => stats.boys += 1,
            Sex::Female => stats.girls += 1,
            Sex::Unspecified => stats.unspecified_sex += 1,
        }
    }

    let mut levels: Vec<LevelStats> = by_level.into_values().collect();
    levels.sort_by(|left, right| level_order(&left.level, &right.level));
    levels
}

fn level_order(left: &str, right: &str) -> Ordering {
    let rank = |level: &str| LEVEL_LADDER.iter().position(|known| *known == level);
    match (rank(left), rank(right)) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => leading_number(right)
            .cmp(&leading_number(left))
            .then_with(|| right.cmp(left)),
    }
}

fn leading_number(level: &str) -> u32 {
    level
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}
