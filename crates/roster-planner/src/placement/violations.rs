use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::domain::{FutureClassShell, Student, StudentKey};
use super::lookup::NameIndex;
use super::normalize::pair_key;
use super::rules::{PlacementRule, RuleKind};

/// Rule breaches currently present in one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassViolation {
    pub has_violation: bool,
    pub messages: Vec<String>,
}

impl ClassViolation {
    fn from_messages(messages: Vec<String>) -> Self {
        Self {
            has_violation: !messages.is_empty(),
            messages,
        }
    }
}

/// Re-check every rule against the current occupants of every class, keyed by class id.
///
/// Messages follow rule order, then discovery order within a rule.
pub fn check_violations(
    roster: &[Student],
    classes: &[FutureClassShell],
    rules: &[PlacementRule],
) -> BTreeMap<String, ClassViolation> {
    let index = NameIndex::build(roster);

    classes
        .iter()
        .map(|class| {
            let occupants: Vec<&Student> =
                roster.iter().filter(|s| s.is_in(&class.name)).collect();
            let mut audit = ClassAudit {
                class,
                occupants: &occupants,
                roster,
                index: &index,
                messages: Vec::new(),
                npma_pairs: HashSet::new(),
                ama_pairs: HashSet::new(),
            };
            for rule in rules {
                audit.apply(rule);
            }
            (class.id.clone(), ClassViolation::from_messages(audit.messages))
        })
        .collect()
}

struct ClassAudit<'a> {
    class: &'a FutureClassShell,
    occupants: &'a [&'a Student],
    roster: &'a [Student],
    index: &'a NameIndex,
    messages: Vec<String>,
    npma_pairs: HashSet<(StudentKey, StudentKey)>,
    ama_pairs: HashSet<(StudentKey, StudentKey)>,
}

impl ClassAudit<'_> {
    fn apply(&mut self, rule: &PlacementRule) {
        let occupants = self.occupants;
        match &rule.kind {
            RuleKind::NoStudentNamedInClass {
                student_name,
                class_name,
            } => {
                if class_name.as_deref().is_some_and(|name| name != self.class.name) {
                    return;
                }
                let class_label = class_name.as_deref().unwrap_or(&self.class.name);
                for student in occupants.iter().filter(|s| s.answers_to(student_name)) {
                    self.messages.push(rule.render(&[
                        ("student_name", student.display_name().as_str()),
                        ("class_name", class_label),
                    ]));
                }
            }
            RuleKind::AvoidNpmaPairing => self.npma(rule),
            RuleKind::AssignTogetherAma => self.ama(rule),
            RuleKind::OptionBarretteRestriction { option, barrette } => {
                if self.class.barrette == *barrette {
                    return;
                }
                let barrette = barrette.to_string();
                let rendered = rule.render(&[
                    ("option_name", option.display_name.as_str()),
                    ("barrette", barrette.as_str()),
                ]);
                for student in occupants.iter().filter(|s| option.matches(s)) {
                    self.messages
                        .push(format!("{} : {rendered}", student.display_name()));
                }
            }
            RuleKind::OptionClassRestriction { option, class_name } => {
                if self.class.name != *class_name {
                    return;
                }
                let rendered = rule.render(&[
                    ("option_name", option.display_name.as_str()),
                    ("class_name", class_name.as_str()),
                ]);
                for student in occupants.iter().filter(|s| option.matches(s)) {
                    self.messages
                        .push(format!("{} : {rendered}", student.display_name()));
                }
            }
            RuleKind::BalanceLevelInClass { level, max } => {
                if self.count(|s| s.level == *level) > *max {
                    self.messages.push(rule.render(&[
                        ("max", max.to_string().as_str()),
                        ("level", level.display()),
                    ]));
                }
            }
            RuleKind::BalanceVigilanceInClass { vigilance, max } => {
                if self.count(|s| s.vigilance == *vigilance) > *max {
                    self.messages.push(rule.render(&[
                        ("max", max.to_string().as_str()),
                        ("vigilance", vigilance.display()),
                    ]));
                }
            }
            RuleKind::BalancePapInClass { max } => {
                if self.count(Student::has_accommodation_plan) > *max {
                    self.messages
                        .push(rule.render(&[("max", max.to_string().as_str())]));
                }
            }
        }
    }

    fn count(&self, predicate: impl Fn(&Student) -> bool) -> usize {
        self.occupants.iter().filter(|&&s| predicate(s)).count()
    }

    /// One message per unordered pair of occupants where one refuses the other.
    fn npma(&mut self, rule: &PlacementRule) {
        let occupants = self.occupants;
        for (i, first) in occupants.iter().enumerate() {
            let Some(refused) = first.do_not_pair_with.as_ref() else {
                continue;
            };
            for (j, second) in occupants.iter().enumerate() {
                if i == j || !refused.matches(second) {
                    continue;
                }
                if self.npma_pairs.insert(pair_key(first, second)) {
                    self.messages.push(render_pair(rule, first, second));
                }
            }
        }
    }

    /// Separated assign-together pairs, seen from either side of the split.
    fn ama(&mut self, rule: &PlacementRule) {
        let (occupants, roster, index) = (self.occupants, self.roster, self.index);
        let class_name = self.class.name.as_str();

        for student in occupants {
            let Some(partner) = student
                .assign_together_with
                .as_ref()
                .and_then(|name| index.resolve(roster, name))
            else {
                continue;
            };
            if !partner.is_in(class_name) && self.ama_pairs.insert(pair_key(student, partner)) {
                self.messages.push(render_pair(rule, student, partner));
            }
        }

        for outsider in roster {
            if outsider.is_in(class_name) || !outsider.is_placed() {
                continue;
            }
            let Some(wanted) = outsider.assign_together_with.as_ref() else {
                continue;
            };
            let Some(partner) = occupants.iter().find(|s| wanted.matches(s)) else {
                continue;
            };
            if self.ama_pairs.insert(pair_key(outsider, partner)) {
                self.messages.push(render_pair(rule, partner, outsider));
            }
        }
    }
}

fn render_pair(rule: &PlacementRule, first: &Student, second: &Student) -> String {
    rule.render(&[
        ("student1_name", first.display_name().as_str()),
        ("student2_name", second.display_name().as_str()),
    ])
}
