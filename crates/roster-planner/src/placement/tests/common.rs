use std::path::PathBuf;
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::config::PlacementConfig;
use crate::placement::{
    generate_class_shells, AcademicLevel, FutureClassShell, PersonName, PlacementRule,
    PlacementService, PlacementWorkspace, RuleSet, Sex, Student,
};
use crate::roster::MemoryStore;

pub(super) const TARGET_LEVEL: &str = "6EME";

pub(super) fn student(
    last_name: &str,
    first_name: &str,
    sex: Sex,
    level: AcademicLevel,
) -> Student {
    let mut student = Student::new(last_name, first_name, "CM2 A");
    student.sex = sex;
    student.level = level;
    student
}

/// Generic cohort member with nothing that could trip a rule.
pub(super) fn filler(index: usize) -> Student {
    student(
        &format!("ELEVE{index:02}"),
        "Camille",
        Sex::Unspecified,
        AcademicLevel::B,
    )
}

pub(super) fn seated(mut student: Student, class: &FutureClassShell) -> Student {
    student.future_class = class.name.clone();
    student
}

pub(super) fn refusing(mut student: Student, last_name: &str, first_name: &str) -> Student {
    student.do_not_pair_with = PersonName::new(last_name, first_name);
    student
}

pub(super) fn paired_with(mut student: Student, last_name: &str, first_name: &str) -> Student {
    student.assign_together_with = PersonName::new(last_name, first_name);
    student
}

/// "6EME 1" .. in barrette 1, then barrette 2.
pub(super) fn classes(barrette1: usize, barrette2: usize) -> Vec<FutureClassShell> {
    generate_class_shells(TARGET_LEVEL, barrette1, barrette2).expect("valid class counts")
}

pub(super) fn occupants<'r>(roster: &'r [Student], class: &FutureClassShell) -> Vec<&'r Student> {
    roster.iter().filter(|s| s.is_in(&class.name)).collect()
}

pub(super) fn rules_with(extra: Vec<PlacementRule>) -> Vec<PlacementRule> {
    let mut rules = RuleSet::defaults().into_rules();
    rules.extend(extra);
    rules
}

pub(super) fn workspace(
    roster: Vec<Student>,
    classes: Vec<FutureClassShell>,
) -> PlacementWorkspace {
    PlacementWorkspace {
        target_level: TARGET_LEVEL.to_string(),
        roster,
        classes,
        rules: RuleSet::defaults(),
    }
}

pub(super) fn placement_config(seed: u64) -> PlacementConfig {
    PlacementConfig {
        max_class_size: PlacementConfig::DEFAULT_MAX_CLASS_SIZE,
        gender_margin: PlacementConfig::DEFAULT_GENDER_MARGIN,
        seed: Some(seed),
        data_dir: PathBuf::from("unused"),
    }
}

pub(super) fn build_service() -> (PlacementService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = PlacementService::new(store.clone(), placement_config(7));
    (service, store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Four CM2 pupils heading to 6EME and one pupil already in 6EME.
pub(super) const ROSTER_CSV: &str = "\
NOM;PRENOM;DATE;SEXE;CLASSE;NIVEAU;OPTION1;NPMA_NOM;NPMA_PRENOM;AMA_NOM;AMA_PRENOM
DURAND;Sophie;01/02/14;FÉMININ;CM2 A;B;;;;;
MARTIN;Paul;03/04/14;MASCULIN;CM2 A;A;;DURAND;Sophie;;
DUPONT;Léa;05/06/14;FÉMININ;CM2 B;C;Latin;;;PETIT;Jules
PETIT;Jules;07/08/14;MASCULIN;CM2 B;D;;;;;
BERNARD;Hugo;09/10/13;MASCULIN;6EME 1;A;;;;;
";
