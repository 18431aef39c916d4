use serde::{Deserialize, Serialize};

use super::domain::{FutureClassShell, Sex, Student, VigilanceCode};
use super::lookup::NameIndex;

pub const PARTNER_PRESENT_BONUS: f64 = 200.0;
pub const PARTNER_ELSEWHERE_PENALTY: f64 = 150.0;
pub const PARTNER_PENDING_BONUS: f64 = 20.0;
pub const SIZE_PENALTY: f64 = 2.0;
pub const GENDER_DEVIATION_WEIGHT: f64 = 8.0;
pub const LEVEL_PENALTY: f64 = 3.0;
pub const RED_PENALTY: f64 = 10.0;
pub const ORANGE_PENALTY: f64 = 5.0;
pub const ACCOMMODATION_PENALTY: f64 = 4.0;

/// Cohort-wide share of boys and girls among students with a recorded sex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderRatios {
    pub boys: f64,
    pub girls: f64,
}

impl Default for GenderRatios {
    fn default() -> Self {
        Self {
            boys: 0.5,
            girls: 0.5,
        }
    }
}

impl GenderRatios {
    /// Falls back to an even split when nobody has a recorded sex.
    pub fn from_students<'a>(students: impl IntoIterator<Item = &'a Student>) -> Self {
        let (boys, girls) = students
            .into_iter()
            .fold((0usize, 0usize), |(boys, girls), student| match student.sex {
                Sex::Male => (boys + 1, girls),
                Sex::Female => (boys, girls + 1),
                Sex::Unspecified => (boys, girls),
            });
        let gendered = boys + girls;
        if gendered == 0 {
            return Self::default();
        }
        Self {
            boys: boys as f64 / gendered as f64,
            girls: girls as f64 / gendered as f64,
        }
    }

    fn is_informative(&self) -> bool {
        self.boys > 0.0 || self.girls > 0.0
    }
}

/// Desirability of placing `student` into `class`; higher is better.
///
/// Only meaningful for admissible candidates. `roster` and `index` are used to
/// resolve the student's assign-together partner.
pub fn score(
    student: &Student,
    class: &FutureClassShell,
    occupants: &[&Student],
    roster: &[Student],
    index: &NameIndex,
    ratios: GenderRatios,
) -> f64 {
    let mut score = partner_term(student, class, occupants, roster, index);

    score -= occupants.len() as f64 * SIZE_PENALTY;

    let projected_size = (occupants.len() + 1) as f64;
    if student.sex.is_specified() && ratios.is_informative() {
        let mut boys = occupants.iter().filter(|s| s.sex == Sex::Male).count();
        let mut girls = occupants.iter().filter(|s| s.sex == Sex::Female).count();
        if student.sex == Sex::Male {
            boys += 1;
        } else {
            girls += 1;
        }
        let deviation = (boys as f64 / projected_size - ratios.boys).abs()
            + (girls as f64 / projected_size - ratios.girls).abs();
        score -= deviation * GENDER_DEVIATION_WEIGHT;
    }

    let same_level = occupants.iter().filter(|s| s.level == student.level).count();
    score -= (same_level + 1) as f64 * LEVEL_PENALTY;

    let red = with_candidate(occupants, student, |s| s.vigilance == VigilanceCode::Red);
    let orange = with_candidate(occupants, student, |s| s.vigilance == VigilanceCode::Orange);
    score -= red as f64 * RED_PENALTY;
    score -= orange as f64 * ORANGE_PENALTY;

    let plans = with_candidate(occupants, student, Student::has_accommodation_plan);
    score -= plans as f64 * ACCOMMODATION_PENALTY;

    score
}

fn partner_term(
    student: &Student,
    class: &FutureClassShell,
    occupants: &[&Student],
    roster: &[Student],
    index: &NameIndex,
) -> f64 {
    let Some(partner) = student
        .assign_together_with
        .as_ref()
        .and_then(|name| index.resolve(roster, name))
    else {
        return 0.0;
    };

    let partner_key = partner.key();
    if occupants.iter().any(|s| s.key() == partner_key) || partner.is_in(&class.name) {
        PARTNER_PRESENT_BONUS
    } else if partner.is_placed() {
        -PARTNER_ELSEWHERE_PENALTY
    } else {
        PARTNER_PENDING_BONUS
    }
}

/// Occupants matching `predicate`, counting the candidate as already seated.
fn with_candidate(
    occupants: &[&Student],
    student: &Student,
    predicate: impl Fn(&Student) -> bool,
) -> usize {
    let seated = occupants.iter().filter(|&&s| predicate(s)).count();
    seated + usize::from(predicate(student))
}
