use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AcademicLevel, Barrette, FutureClassShell, Sex, Student, VigilanceCode};
use super::lookup::NameIndex;
use super::scorer::GenderRatios;
use super::violations::ClassViolation;

const PAIR_TOGETHER_BONUS: f64 = 50.0;
const SIZE_PENALTY: f64 = 2.0;
const GENDER_DEVIATION_WEIGHT: f64 = 8.0;
const LEVEL_CLUSTER_PENALTY: f64 = 3.0;
const RED_PENALTY: f64 = 10.0;
const ORANGE_PENALTY: f64 = 5.0;
const ACCOMMODATION_PENALTY: f64 = 4.0;
const VIOLATION_PENALTY: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBreakdown {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
    pub unspecified: usize,
}

impl LevelBreakdown {
    fn record(&mut self, level: AcademicLevel) {
        match level {
            AcademicLevel::A => self.a += 1,
            AcademicLevel::B => self.b += 1,
            AcademicLevel::C => self.c += 1,
            AcademicLevel::D => self.d += 1,
            AcademicLevel::Unspecified => self.unspecified += 1,
        }
    }

    fn buckets(&self) -> [usize; 5] {
        [self.a, self.b, self.c, self.d, self.unspecified]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VigilanceBreakdown {
    pub red: usize,
    pub orange: usize,
    pub none: usize,
}

/// Comparative snapshot of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReportInfo {
    pub class_id: String,
    pub class_name: String,
    pub barrette: Barrette,
    pub score: i64,
    pub student_count: usize,
    pub boys: usize,
    pub girls: usize,
    pub unspecified_sex: usize,
    pub levels: LevelBreakdown,
    pub vigilance: VigilanceBreakdown,
    pub accommodation_plans: usize,
    pub violations: Vec<String>,
}

/// Rank classes by holistic score, best first. Read-only over its inputs.
///
/// Gender ratios are taken over the students seated in any of `classes`;
/// `violations` is the checker's output for the same roster.
pub fn generate_report(
    roster: &[Student],
    classes: &[FutureClassShell],
    violations: &BTreeMap<String, ClassViolation>,
) -> Vec<ClassReportInfo> {
    let ratios = GenderRatios::from_students(
        roster
            .iter()
            .filter(|s| classes.iter().any(|class| s.is_in(&class.name))),
    );
    let index = NameIndex::build(roster);

    let mut report: Vec<ClassReportInfo> = classes
        .iter()
        .map(|class| {
            let messages = violations
                .get(&class.id)
                .map(|violation| violation.messages.clone())
                .unwrap_or_default();
            class_report(class, roster, &index, ratios, messages)
        })
        .collect();

    report.sort_by(|left, right| right.score.cmp(&left.score));
    report
}

fn class_report(
    class: &FutureClassShell,
    roster: &[Student],
    index: &NameIndex,
    ratios: GenderRatios,
    violations: Vec<String>,
) -> ClassReportInfo {
    let occupants: Vec<&Student> = roster.iter().filter(|s| s.is_in(&class.name)).collect();

    let mut levels = LevelBreakdown::default();
    let mut vigilance = VigilanceBreakdown::default();
    let (mut boys, mut girls, mut plans) = (0, 0, 0);
    for student in &occupants {
        levels.record(student.level);
        match student.vigilance {
            VigilanceCode::Red => vigilance.red += 1,
            VigilanceCode::Orange => vigilance.orange += 1,
            VigilanceCode::None => vigilance.none += 1,
        }
        match student.sex {
            Sex::Male => boys += 1,
            Sex::Female => girls += 1,
            Sex::Unspecified => {}
        }
        if student.has_accommodation_plan() {
            plans += 1;
        }
    }

    let together = occupants
        .iter()
        .filter(|student| {
            student
                .assign_together_with
                .as_ref()
                .and_then(|name| index.resolve(roster, name))
                .is_some_and(|partner| partner.is_in(&class.name))
        })
        .count();

    let count = occupants.len();
    let mut score = together as f64 * PAIR_TOGETHER_BONUS;
    score -= count as f64 * SIZE_PENALTY;

    let gendered = boys + girls;
    if count > 0 && gendered > 0 && (ratios.boys > 0.0 || ratios.girls > 0.0) {
        let deviation = (boys as f64 / gendered as f64 - ratios.boys).abs()
            + (girls as f64 / gendered as f64 - ratios.girls).abs();
        let weight = gendered as f64 / count as f64;
        score -= deviation * GENDER_DEVIATION_WEIGHT * weight * count as f64;
    }

    for bucket in levels.buckets() {
        if bucket > 1 {
            score -= (bucket - 1) as f64 * LEVEL_CLUSTER_PENALTY;
        }
    }

    score -= vigilance.red as f64 * RED_PENALTY;
    score -= vigilance.orange as f64 * ORANGE_PENALTY;
    score -= plans as f64 * ACCOMMODATION_PENALTY;
    score -= violations.len() as f64 * VIOLATION_PENALTY;

    ClassReportInfo {
        class_id: class.id.clone(),
        class_name: class.name.clone(),
        barrette: class.barrette,
        score: round_half_up(score),
        student_count: count,
        boys,
        girls,
        unspecified_sex: count - gendered,
        levels,
        vigilance,
        accommodation_plans: plans,
        violations,
    }
}

/// Halves round towards positive infinity, so -2.5 becomes -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
