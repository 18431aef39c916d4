use serde::Serialize;

use super::domain::{FutureClassShell, Sex, Student};
use super::rules::{PlacementRule, RuleKind};

/// Fallback gender gap when the cohort gives nothing to derive it from.
pub const DEFAULT_GENDER_GAP: usize = 5;

/// Why a candidate class cannot take a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    Capacity { capacity: usize },
    GenderGap { boys: usize, girls: usize, allowed: usize },
    Rule { rule_id: String },
}

/// Largest boy/girl difference a class may reach, proportionate to the cohort skew.
pub fn max_gender_gap(boys: usize, girls: usize, classes: usize, margin: usize) -> usize {
    if classes == 0 || boys + girls == 0 {
        return DEFAULT_GENDER_GAP;
    }
    boys.abs_diff(girls).div_ceil(classes) + margin
}

/// Admissibility predicate used before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardConstraintFilter {
    capacity: usize,
}

impl Default for HardConstraintFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl HardConstraintFilter {
    pub const DEFAULT_CAPACITY: usize = 30;

    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_inadmissible(
        &self,
        student: &Student,
        class: &FutureClassShell,
        occupants: &[&Student],
        rules: &[PlacementRule],
        max_gender_gap: usize,
    ) -> bool {
        self.check(student, class, occupants, rules, max_gender_gap)
            .is_err()
    }

    /// First failing constraint, checked in order: capacity, gender gap, then rules.
    pub fn check(
        &self,
        student: &Student,
        class: &FutureClassShell,
        occupants: &[&Student],
        rules: &[PlacementRule],
        max_gender_gap: usize,
    ) -> Result<(), Rejection> {
        if occupants.len() >= self.capacity {
            return Err(Rejection::Capacity {
                capacity: self.capacity,
            });
        }

        if student.sex.is_specified() {
            let mut boys = count(occupants, |s| s.sex == Sex::Male);
            let mut girls = count(occupants, |s| s.sex == Sex::Female);
            match student.sex {
                Sex::Male => boys += 1,
                Sex::Female => girls += 1,
                Sex::Unspecified => {}
            }
            if boys.abs_diff(girls) > max_gender_gap {
                return Err(Rejection::GenderGap {
                    boys,
                    girls,
                    allowed: max_gender_gap,
                });
            }
        }

        match rules
            .iter()
            .find(|rule| blocks(rule, student, class, occupants))
        {
            Some(rule) => Err(Rejection::Rule {
                rule_id: rule.id.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn blocks(
    rule: &PlacementRule,
    student: &Student,
    class: &FutureClassShell,
    occupants: &[&Student],
) -> bool {
    match &rule.kind {
        RuleKind::NoStudentNamedInClass {
            student_name,
            class_name,
        } => {
            let applies = class_name.as_deref().map_or(true, |name| name == class.name);
            applies && student.answers_to(student_name)
        }
        RuleKind::AvoidNpmaPairing => student
            .do_not_pair_with
            .as_ref()
            .is_some_and(|name| occupants.iter().any(|other| name.matches(other))),
        // Pairing incentive only; handled by the scorer.
        RuleKind::AssignTogetherAma => false,
        RuleKind::OptionBarretteRestriction { option, barrette } => {
            class.barrette != *barrette && option.matches(student)
        }
        RuleKind::OptionClassRestriction { option, class_name } => {
            class.name == *class_name && option.matches(student)
        }
        RuleKind::BalanceLevelInClass { level, max } => {
            student.level == *level && count(occupants, |s| s.level == *level) + 1 > *max
        }
        RuleKind::BalanceVigilanceInClass { vigilance, max } => {
            student.vigilance == *vigilance
                && count(occupants, |s| s.vigilance == *vigilance) + 1 > *max
        }
        RuleKind::BalancePapInClass { max } => {
            student.has_accommodation_plan()
                && count(occupants, |s| s.has_accommodation_plan()) + 1 > *max
        }
    }
}

fn count(occupants: &[&Student], predicate: impl Fn(&Student) -> bool) -> usize {
    occupants.iter().filter(|&&student| predicate(student)).count()
}
