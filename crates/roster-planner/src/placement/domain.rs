use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalize::{normalize, student_key};

/// Stable identity of a student across roster edits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentKey(pub String);

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Sex {
    /// Parse the `SEXE` column ("MASCULIN" / "FÉMININ").
    pub fn from_label(value: &str) -> Self {
        match normalize(value.trim()).as_str() {
            "masculin" => Self::Male,
            "feminin" => Self::Female,
            _ => Self::Unspecified,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "MASCULIN",
            Self::Female => "FÉMININ",
            Self::Unspecified => "",
        }
    }

    pub const fn is_specified(self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

/// Academic level bucket; `D` marks the students needing the most support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AcademicLevel {
    A,
    B,
    C,
    D,
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,
}

impl AcademicLevel {
    pub const fn ordered() -> [Self; 5] {
        [Self::A, Self::B, Self::C, Self::D, Self::Unspecified]
    }

    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "B" => Self::B,
            "C" => Self::C,
            "D" => Self::D,
            _ => Self::Unspecified,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::Unspecified => "",
        }
    }

    pub const fn display(self) -> &'static str {
        match self {
            Self::Unspecified => "Non spécifié",
            other => other.label(),
        }
    }

    pub const fn is_specified(self) -> bool {
        !matches!(self, Self::Unspecified)
    }

    /// Automatic placement handles D first and A last.
    pub(crate) const fn placement_priority(self) -> u8 {
        match self {
            Self::D => 1,
            Self::C => 2,
            Self::B => 3,
            Self::A => 4,
            Self::Unspecified => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VigilanceCode {
    #[default]
    None,
    Orange,
    Red,
}

impl VigilanceCode {
    /// Parse the `CODE_VIGILANCE` column ("ROUGE" / "ORANGE").
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ROUGE" => Self::Red,
            "ORANGE" => Self::Orange,
            _ => Self::None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Red => "ROUGE",
            Self::Orange => "ORANGE",
            Self::None => "",
        }
    }

    pub const fn display(self) -> &'static str {
        match self {
            Self::Red => "Rouge",
            Self::Orange => "Orange",
            Self::None => "Non spécifié",
        }
    }
}

/// Weak reference to another student, resolved by name at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub last_name: String,
    pub first_name: String,
}

impl PersonName {
    /// Both halves are required for the reference to exist.
    pub fn new(last_name: &str, first_name: &str) -> Option<Self> {
        let last_name = last_name.trim();
        let first_name = first_name.trim();
        if last_name.is_empty() || first_name.is_empty() {
            return None;
        }
        Some(Self {
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
        })
    }

    pub fn matches(&self, student: &Student) -> bool {
        normalize(&self.last_name) == normalize(&student.last_name)
            && normalize(&self.first_name) == normalize(&student.first_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub sex: Sex,
    pub origin_class: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub level: AcademicLevel,
    #[serde(default)]
    pub do_not_pair_with: Option<PersonName>,
    #[serde(default)]
    pub assign_together_with: Option<PersonName>,
    #[serde(default)]
    pub vigilance: VigilanceCode,
    #[serde(default)]
    pub accommodation_plan: String,
    #[serde(default)]
    pub notes: String,
    /// Name of the future class; empty while unassigned.
    #[serde(default)]
    pub future_class: String,
    /// Columns outside the known vocabulary, kept for export.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Student {
    pub fn new(
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        origin_class: impl Into<String>,
    ) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            birth_date: String::new(),
            sex: Sex::Unspecified,
            origin_class: origin_class.into(),
            options: Vec::new(),
            level: AcademicLevel::Unspecified,
            do_not_pair_with: None,
            assign_together_with: None,
            vigilance: VigilanceCode::None,
            accommodation_plan: String::new(),
            notes: String::new(),
            future_class: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> StudentKey {
        student_key(self)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_placed(&self) -> bool {
        !self.future_class.trim().is_empty()
    }

    pub fn is_in(&self, class_name: &str) -> bool {
        self.future_class == class_name
    }

    pub fn has_accommodation_plan(&self) -> bool {
        !self.accommodation_plan.trim().is_empty()
    }

    /// Normalised option labels, blanks dropped.
    pub fn normalized_options(&self) -> impl Iterator<Item = String> + '_ {
        self.options
            .iter()
            .map(|option| normalize(option.trim()))
            .filter(|option| !option.is_empty())
    }

    /// Loose match against a free-text name: first, last, or either full ordering.
    pub fn answers_to(&self, name: &str) -> bool {
        let wanted = normalize(name.trim());
        if wanted.is_empty() {
            return false;
        }
        normalize(&self.first_name) == wanted
            || normalize(&self.last_name) == wanted
            || normalize(&format!("{} {}", self.first_name, self.last_name)) == wanted
            || normalize(&format!("{} {}", self.last_name, self.first_name)) == wanted
    }
}

/// Track group of a future class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Barrette {
    One,
    Two,
}

impl Barrette {
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Barrette {
    type Error = ClassSetupError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ClassSetupError::UnknownBarrette(other)),
        }
    }
}

impl From<Barrette> for u8 {
    fn from(value: Barrette) -> Self {
        value.number()
    }
}

impl fmt::Display for Barrette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureClassShell {
    pub id: String,
    pub name: String,
    pub barrette: Barrette,
}

pub const MAX_CLASSES_PER_BARRETTE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassSetupError {
    #[error("barrette {barrette} asks for {requested} classes; at most 10 are allowed")]
    TooManyClasses { barrette: u8, requested: usize },
    #[error("barrette must be 1 or 2, got {0}")]
    UnknownBarrette(u8),
}

/// Build the class shells for a target level, numbering across both barrettes.
pub fn generate_class_shells(
    target_level: &str,
    first_barrette: usize,
    second_barrette: usize,
) -> Result<Vec<FutureClassShell>, ClassSetupError> {
    for (barrette, requested) in [(1, first_barrette), (2, second_barrette)] {
        if requested > MAX_CLASSES_PER_BARRETTE {
            return Err(ClassSetupError::TooManyClasses {
                barrette,
                requested,
            });
        }
    }

    let level = target_level.trim().to_uppercase();
    let id_stem = level.split_whitespace().collect::<Vec<_>>().join("-");
    let mut shells = Vec::with_capacity(first_barrette + second_barrette);
    let mut counter = 0;

    for (barrette, count) in [(Barrette::One, first_barrette), (Barrette::Two, second_barrette)] {
        for index in 1..=count {
            counter += 1;
            shells.push(FutureClassShell {
                id: format!("class-{id_stem}-b{}-{index}", barrette.number()),
                name: format!("{level} {counter}"),
                barrette,
            });
        }
    }

    Ok(shells)
}
