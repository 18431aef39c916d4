use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::domain::{AcademicLevel, Barrette, VigilanceCode};
use super::options::OptionSelector;

pub const NPMA_RULE_ID: &str = "default-npma-rule";
pub const AMA_RULE_ID: &str = "default-ama-rule";
pub const LCA_RULE_ID: &str = "default-lca-b1-rule";

/// A placement rule: shared id and message template plus the kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRule {
    pub id: String,
    pub message: String,
    #[serde(flatten)]
    pub kind: RuleKind,
}

/// Closed set of rule kinds, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// `class_name: None` applies to every class of the level.
    NoStudentNamedInClass {
        student_name: String,
        #[serde(default)]
        class_name: Option<String>,
    },
    AvoidNpmaPairing,
    AssignTogetherAma,
    OptionBarretteRestriction {
        option: OptionSelector,
        barrette: Barrette,
    },
    OptionClassRestriction {
        option: OptionSelector,
        class_name: String,
    },
    BalanceLevelInClass {
        level: AcademicLevel,
        max: usize,
    },
    BalanceVigilanceInClass {
        vigilance: VigilanceCode,
        max: usize,
    },
    BalancePapInClass {
        max: usize,
    },
}

impl RuleKind {
    pub const fn is_built_in(&self) -> bool {
        matches!(self, Self::AvoidNpmaPairing | Self::AssignTogetherAma)
    }

    /// French message template the rule form proposes for this kind.
    pub fn default_message(&self, target_level: &str) -> String {
        match self {
            Self::NoStudentNamedInClass {
                student_name,
                class_name: None,
            } => {
                format!("{student_name} ne doit pas être dans une classe de {target_level}.")
            }
            Self::NoStudentNamedInClass {
                student_name,
                class_name: Some(class_name),
            } => format!("{student_name} ne doit pas être dans la classe {class_name}."),
            Self::AvoidNpmaPairing => {
                "{student1_name} ne doit pas être avec {student2_name} (consigne NPMA).".to_string()
            }
            Self::AssignTogetherAma => {
                "{student1_name} ne doit pas être séparé(e) de {student2_name} (consigne AMA)."
                    .to_string()
            }
            Self::OptionBarretteRestriction { option, barrette } => format!(
                "L'option {} est réservée aux classes de la barrette {barrette}.",
                option.display_name
            ),
            Self::OptionClassRestriction { option, class_name } => format!(
                "L'option {} n'est pas autorisée dans la classe {class_name}.",
                option.display_name
            ),
            Self::BalanceLevelInClass { level, max } => format!(
                "Chaque classe ne doit pas contenir plus de {max} élèves de niveau {}.",
                level.display()
            ),
            Self::BalanceVigilanceInClass { vigilance, max } => format!(
                "Chaque classe ne doit pas contenir plus de {max} élèves avec le code vigilance {}.",
                vigilance.display()
            ),
            Self::BalancePapInClass { max } => {
                format!("Chaque classe ne doit pas contenir plus de {max} élèves avec un PAP renseigné.")
            }
        }
    }

    fn validate(&self) -> Result<(), RuleSetError> {
        let problem = match self {
            Self::AvoidNpmaPairing | Self::AssignTogetherAma => {
                Some("pairing rules are built in and always active")
            }
            Self::NoStudentNamedInClass { student_name, .. } if student_name.trim().is_empty() => {
                Some("a student name is required")
            }
            Self::OptionClassRestriction { class_name, .. } if class_name.trim().is_empty() => {
                Some("an option restriction must name a class")
            }
            Self::BalanceLevelInClass { max, .. }
            | Self::BalanceVigilanceInClass { max, .. }
            | Self::BalancePapInClass { max }
                if *max < 1 =>
            {
                Some("the maximum per class must be at least 1")
            }
            _ => None,
        };

        match problem {
            Some(reason) => Err(RuleSetError::Invalid(reason.to_string())),
            None => Ok(()),
        }
    }
}

impl PlacementRule {
    pub fn new(id: impl Into<String>, kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn is_built_in(&self) -> bool {
        self.kind.is_built_in()
    }

    /// Fill `{placeholder}` slots of the message template.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        values
            .iter()
            .fold(self.message.clone(), |message, (name, value)| {
                message.replace(&format!("{{{name}}}"), value)
            })
    }

    /// One-line summary for rule listings.
    pub fn describe(&self, target_level: &str) -> String {
        match &self.kind {
            RuleKind::AvoidNpmaPairing => format!(
                "NPMA : {}",
                self.render(&[("student1_name", "Élève1"), ("student2_name", "Élève2")])
            ),
            RuleKind::AssignTogetherAma => format!(
                "AMA : {}",
                self.render(&[("student1_name", "Élève1"), ("student2_name", "Élève2")])
            ),
            RuleKind::OptionBarretteRestriction { option, barrette } => format!(
                "Option '{}' restreinte à Barrette {barrette}.",
                option.display_name
            ),
            RuleKind::NoStudentNamedInClass {
                student_name,
                class_name,
            } => {
                let target = match class_name {
                    Some(class_name) => format!("classe '{class_name}'"),
                    None => format!("toutes classes de {target_level}"),
                };
                format!("Élève '{student_name}' interdit dans {target}.")
            }
            RuleKind::OptionClassRestriction { option, class_name } => format!(
                "Option '{}' interdite dans la classe '{class_name}'.",
                option.display_name
            ),
            RuleKind::BalanceLevelInClass { level, max } => format!(
                "Max {max} élèves de niveau '{}' par classe.",
                level.display()
            ),
            RuleKind::BalanceVigilanceInClass { vigilance, max } => format!(
                "Max {max} élèves avec code vigilance '{}' par classe.",
                vigilance.display()
            ),
            RuleKind::BalancePapInClass { max } => {
                format!("Max {max} élèves avec un PAP par classe.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSetError {
    #[error("rule {0} is built in and cannot be removed")]
    BuiltIn(String),
    #[error("no rule with id {0}")]
    NotFound(String),
    #[error("invalid rule: {0}")]
    Invalid(String),
}

/// Active rules for one target level. The pairing rules are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PlacementRule>", into = "Vec<PlacementRule>")]
pub struct RuleSet {
    rules: Vec<PlacementRule>,
}

impl RuleSet {
    pub fn defaults() -> Self {
        let mut rules = built_in_rules();
        rules.push(PlacementRule::new(
            LCA_RULE_ID,
            RuleKind::OptionBarretteRestriction {
                option: OptionSelector {
                    keywords: vec!["latin".to_string(), "lca latin".to_string()],
                    display_name: "LCA".to_string(),
                },
                barrette: Barrette::One,
            },
            "L'option LCA est réservée aux classes de la barrette 1.",
        ));
        Self { rules }
    }

    /// Rebuild a stored rule list, putting back any missing built-in.
    pub fn restore(stored: Vec<PlacementRule>) -> Self {
        let mut rules: Vec<PlacementRule> = built_in_rules()
            .into_iter()
            .filter(|built_in| !stored.iter().any(|rule| rule.kind == built_in.kind))
            .collect();
        rules.extend(stored);
        Self { rules }
    }

    pub fn rules(&self) -> &[PlacementRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&PlacementRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn add(
        &mut self,
        kind: RuleKind,
        message: impl Into<String>,
    ) -> Result<String, RuleSetError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(RuleSetError::Invalid("a message is required".to_string()));
        }
        kind.validate()?;

        let kind = match kind {
            RuleKind::NoStudentNamedInClass {
                student_name,
                class_name,
            } => RuleKind::NoStudentNamedInClass {
                student_name,
                class_name: class_name.filter(|name| !name.trim().is_empty()),
            },
            other => other,
        };

        let id = next_rule_id();
        self.rules.push(PlacementRule::new(id.clone(), kind, message));
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> Result<PlacementRule, RuleSetError> {
        let position = self
            .rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or_else(|| RuleSetError::NotFound(id.to_string()))?;
        if self.rules[position].is_built_in() {
            return Err(RuleSetError::BuiltIn(id.to_string()));
        }
        Ok(self.rules.remove(position))
    }

    pub fn into_rules(self) -> Vec<PlacementRule> {
        self.rules
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl From<Vec<PlacementRule>> for RuleSet {
    fn from(value: Vec<PlacementRule>) -> Self {
        Self::restore(value)
    }
}

impl From<RuleSet> for Vec<PlacementRule> {
    fn from(value: RuleSet) -> Self {
        value.rules
    }
}

fn built_in_rules() -> Vec<PlacementRule> {
    [
        (NPMA_RULE_ID, RuleKind::AvoidNpmaPairing),
        (AMA_RULE_ID, RuleKind::AssignTogetherAma),
    ]
    .into_iter()
    .map(|(id, kind)| {
        let message = kind.default_message("");
        PlacementRule::new(id, kind, message)
    })
    .collect()
}

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn next_rule_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..5)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("rule-{}-{suffix}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pap_rule(max: usize) -> RuleKind {
        RuleKind::BalancePapInClass { max }
    }

    #[test]
    fn defaults_hold_built_ins_and_lca() {
        let set = RuleSet::defaults();
        let ids: Vec<_> = set.rules().iter().map(|rule| rule.id.as_str()).collect();
        assert_eq!(ids, [NPMA_RULE_ID, AMA_RULE_ID, LCA_RULE_ID]);
    }

    #[test]
    fn built_ins_cannot_be_removed() {
        let mut set = RuleSet::defaults();
        assert_eq!(
            set.remove(NPMA_RULE_ID),
            Err(RuleSetError::BuiltIn(NPMA_RULE_ID.to_string()))
        );
        assert!(set.remove(LCA_RULE_ID).is_ok());
        assert_eq!(set.rules().len(), 2);
        assert!(matches!(set.remove("missing"), Err(RuleSetError::NotFound(_))));
    }

    #[test]
    fn restore_reinserts_missing_built_ins() {
        let stored = vec![PlacementRule::new(
            "rule-1-abcde",
            pap_rule(2),
            "Pas plus de 2 PAP.",
        )];
        let set = RuleSet::restore(stored);
        assert_eq!(set.rules().len(), 3);
        assert!(set.get(NPMA_RULE_ID).is_some());
        assert!(set.get(AMA_RULE_ID).is_some());
        assert_eq!(set.rules()[2].id, "rule-1-abcde");
    }

    #[test]
    fn add_validates_parameters() {
        let mut set = RuleSet::defaults();
        assert!(matches!(
            set.add(pap_rule(0), "trop"),
            Err(RuleSetError::Invalid(_))
        ));
        assert!(matches!(
            set.add(
                RuleKind::NoStudentNamedInClass {
                    student_name: " ".to_string(),
                    class_name: None
                },
                "x"
            ),
            Err(RuleSetError::Invalid(_))
        ));
        assert!(matches!(
            set.add(RuleKind::AvoidNpmaPairing, "x"),
            Err(RuleSetError::Invalid(_))
        ));

        let id = set.add(pap_rule(2), "Pas plus de {max} PAP.").expect("valid rule");
        assert!(id.starts_with("rule-"));
        assert_eq!(id.rsplit('-').next().map(str::len), Some(5));
        assert_eq!(set.get(&id).map(|rule| rule.is_built_in()), Some(false));
    }

    #[test]
    fn add_treats_blank_class_as_all_classes() {
        let mut set = RuleSet::defaults();
        let id = set
            .add(
                RuleKind::NoStudentNamedInClass {
                    student_name: "Sophie".to_string(),
                    class_name: Some(String::new()),
                },
                "Sophie pas ici",
            )
            .expect("valid rule");
        let rule = set.get(&id).expect("rule stored");
        assert_eq!(
            rule.kind,
            RuleKind::NoStudentNamedInClass {
                student_name: "Sophie".to_string(),
                class_name: None
            }
        );
    }

    #[test]
    fn default_messages_are_rendered_in_french() {
        let kind = RuleKind::BalanceVigilanceInClass {
            vigilance: VigilanceCode::Red,
            max: 2,
        };
        assert_eq!(
            kind.default_message("SECONDE"),
            "Chaque classe ne doit pas contenir plus de 2 élèves avec le code vigilance Rouge."
        );
        let kind = RuleKind::NoStudentNamedInClass {
            student_name: "Léo".to_string(),
            class_name: None,
        };
        assert_eq!(
            kind.default_message("SECONDE"),
            "Léo ne doit pas être dans une classe de SECONDE."
        );
    }

    #[test]
    fn describe_summarises_rules() {
        let set = RuleSet::defaults();
        let lca = set.get(LCA_RULE_ID).expect("lca rule");
        assert_eq!(lca.describe("SECONDE"), "Option 'LCA' restreinte à Barrette 1.");
        let npma = set.get(NPMA_RULE_ID).expect("npma rule");
        assert_eq!(
            npma.describe("SECONDE"),
            "NPMA : Élève1 ne doit pas être avec Élève2 (consigne NPMA)."
        );
    }

    #[test]
    fn wire_format_uses_type_tag() {
        let rule = PlacementRule::new(
            "rule-7",
            RuleKind::BalanceLevelInClass {
                level: AcademicLevel::B,
                max: 2,
            },
            "max {max} {level}",
        );
        let value = serde_json::to_value(&rule).expect("serialize");
        assert_eq!(value["type"], "BALANCE_LEVEL_IN_CLASS");
        assert_eq!(value["level"], "B");
        assert_eq!(value["max"], 2);

        let parsed: PlacementRule = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, rule);
    }

    #[test]
    fn rule_set_deserialization_restores_built_ins() {
        let set: RuleSet = serde_json::from_str("[]").expect("deserialize");
        assert_eq!(set.rules().len(), 2);
    }
}
