use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PlacementConfig;
use crate::roster::{
    self, detect_levels, source_level, LevelStats, LevelWorkspace, RosterEditError,
    RosterImportError, RosterImporter, RosterSnapshot, StoreError, WorkspaceStore,
};

use super::domain::{
    generate_class_shells, ClassSetupError, FutureClassShell, Sex, Student, StudentKey,
};
use super::filter::{max_gender_gap, HardConstraintFilter, Rejection};
use super::lookup::NameIndex;
use super::orchestrator::{AutoPlacer, PlacementOutcome};
use super::report::{generate_report, ClassReportInfo};
use super::rules::{PlacementRule, RuleKind, RuleSet, RuleSetError};
use super::scorer::{score, GenderRatios};
use super::violations::{check_violations, ClassViolation};

/// Everything the engine needs for one target level, sent inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementWorkspace {
    pub target_level: String,
    pub roster: Vec<Student>,
    pub classes: Vec<FutureClassShell>,
    #[serde(default)]
    pub rules: RuleSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissibilityRequest {
    #[serde(flatten)]
    pub workspace: PlacementWorkspace,
    pub student: StudentKey,
    pub class_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Admissibility {
    pub admissible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Class counts per barrette for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub barrette1: usize,
    pub barrette2: usize,
}

/// A rule to add; without a message the kind's default template is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDraft {
    #[serde(flatten)]
    pub kind: RuleKind,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementServiceError {
    #[error("no student with key {0}")]
    UnknownStudent(StudentKey),
    #[error("no future class with id {0}")]
    UnknownClass(String),
    #[error("no roster has been imported yet")]
    NoRoster,
    #[error(transparent)]
    Import(#[from] RosterImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    ClassSetup(#[from] ClassSetupError),
    #[error(transparent)]
    Rules(#[from] RuleSetError),
    #[error(transparent)]
    Edit(#[from] RosterEditError),
}

/// Service composing the placement engine with the workspace store.
pub struct PlacementService<S> {
    store: Arc<S>,
    config: PlacementConfig,
}

impl<S> PlacementService<S>
where
    S: WorkspaceStore + 'static,
{
    pub fn new(store: Arc<S>, config: PlacementConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Fresh placer per sweep so a configured seed gives the same result every time.
    fn placer(&self) -> AutoPlacer {
        let placer = match self.config.seed {
            Some(seed) => AutoPlacer::seeded(seed),
            None => AutoPlacer::from_os_rng(),
        };
        placer
            .with_capacity(self.config.max_class_size)
            .with_gender_margin(self.config.gender_margin)
    }

    pub fn auto_place(&self, workspace: &PlacementWorkspace) -> PlacementOutcome {
        let source = source_level(&workspace.target_level);
        info!(
            target_level = %workspace.target_level,
            source_level = %source,
            students = workspace.roster.len(),
            "automatic placement requested"
        );
        self.placer().place(
            &workspace.roster,
            &source,
            &workspace.classes,
            workspace.rules.rules(),
        )
    }

    pub fn check_violations(
        &self,
        workspace: &PlacementWorkspace,
    ) -> BTreeMap<String, ClassViolation> {
        check_violations(&workspace.roster, &workspace.classes, workspace.rules.rules())
    }

    pub fn report(&self, workspace: &PlacementWorkspace) -> Vec<ClassReportInfo> {
        let violations = self.check_violations(workspace);
        generate_report(&workspace.roster, &workspace.classes, &violations)
    }

    /// Would the class accept this student right now, and how would it score?
    ///
    /// Gender gap and ratios come from the whole feeder cohort, placed or not.
    pub fn admissibility(
        &self,
        request: &AdmissibilityRequest,
    ) -> Result<Admissibility, PlacementServiceError> {
        let workspace = &request.workspace;
        let student = workspace
            .roster
            .iter()
            .find(|student| student.key() == request.student)
            .ok_or_else(|| PlacementServiceError::UnknownStudent(request.student.clone()))?;
        let class = workspace
            .classes
            .iter()
            .find(|class| class.id == request.class_id)
            .ok_or_else(|| PlacementServiceError::UnknownClass(request.class_id.clone()))?;

        let source = source_level(&workspace.target_level);
        let cohort: Vec<&Student> = workspace
            .roster
            .iter()
            .filter(|s| s.origin_class.to_uppercase().starts_with(&source))
            .collect();
        let boys = cohort.iter().filter(|s| s.sex == Sex::Male).count();
        let girls = cohort.iter().filter(|s| s.sex == Sex::Female).count();
        let gap = max_gender_gap(
            boys,
            girls,
            workspace.classes.len(),
            self.config.gender_margin,
        );

        let key = student.key();
        let occupants: Vec<&Student> = workspace
            .roster
            .iter()
            .filter(|s| s.is_in(&class.name) && s.key() != key)
            .collect();

        let filter = HardConstraintFilter::new(self.config.max_class_size);
        match filter.check(student, class, &occupants, workspace.rules.rules(), gap) {
            Ok(()) => {
                let index = NameIndex::build(&workspace.roster);
                let ratios = GenderRatios::from_students(cohort.iter().copied());
                Ok(Admissibility {
                    admissible: true,
                    rejection: None,
                    score: Some(score(
                        student,
                        class,
                        &occupants,
                        &workspace.roster,
                        &index,
                        ratios,
                    )),
                })
            }
            Err(rejection) => Ok(Admissibility {
                admissible: false,
                rejection: Some(rejection),
                score: None,
            }),
        }
    }

    /// Parse a roster file and make it the stored roster.
    pub fn import_roster<R: Read>(
        &self,
        reader: R,
    ) -> Result<RosterSnapshot, PlacementServiceError> {
        let snapshot = RosterImporter::from_reader(reader)?;
        self.store.save_roster(&snapshot)?;
        info!(
            students = snapshot.students.len(),
            columns = snapshot.headers.len(),
            "roster imported"
        );
        Ok(snapshot)
    }

    pub fn roster(&self) -> Result<RosterSnapshot, PlacementServiceError> {
        self.store
            .load_roster()?
            .ok_or(PlacementServiceError::NoRoster)
    }

    pub fn levels(&self) -> Result<Vec<LevelStats>, PlacementServiceError> {
        Ok(detect_levels(&self.roster()?.students))
    }

    pub fn level_workspace(&self, level: &str) -> Result<LevelWorkspace, PlacementServiceError> {
        Ok(self.store.load_level(level)?)
    }

    /// Regenerate the class shells of a level. Rules are kept.
    pub fn configure_classes(
        &self,
        level: &str,
        counts: ClassCounts,
    ) -> Result<LevelWorkspace, PlacementServiceError> {
        let classes = generate_class_shells(level, counts.barrette1, counts.barrette2)?;
        let mut workspace = self.store.load_level(level)?;
        workspace.classes = classes;
        self.store.save_level(level, &workspace)?;
        info!(
            target_level = %level,
            barrette1 = counts.barrette1,
            barrette2 = counts.barrette2,
            "future classes configured"
        );
        Ok(workspace)
    }

    pub fn add_rule(
        &self,
        level: &str,
        draft: RuleDraft,
    ) -> Result<PlacementRule, PlacementServiceError> {
        let mut workspace = self.store.load_level(level)?;
        let message = draft
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| draft.kind.default_message(level));
        let id = workspace.rules.add(draft.kind, message)?;
        self.store.save_level(level, &workspace)?;

        let rule = workspace
            .rules
            .get(&id)
            .cloned()
            .ok_or(RuleSetError::NotFound(id))?;
        info!(target_level = %level, rule_id = %rule.id, "placement rule added");
        Ok(rule)
    }

    pub fn remove_rule(
        &self,
        level: &str,
        rule_id: &str,
    ) -> Result<PlacementRule, PlacementServiceError> {
        let mut workspace = self.store.load_level(level)?;
        let removed = workspace.rules.remove(rule_id)?;
        self.store.save_level(level, &workspace)?;
        info!(target_level = %level, rule_id, "placement rule removed");
        Ok(removed)
    }

    /// Run the sweep over the stored roster and level, persisting the placements.
    pub fn place_level(&self, level: &str) -> Result<PlacementOutcome, PlacementServiceError> {
        let workspace = self.stored_workspace(level)?;
        let mut snapshot = self.roster()?;
        let outcome = self.auto_place(&workspace);
        snapshot.students = outcome.roster.clone();
        self.store.save_roster(&snapshot)?;
        Ok(outcome)
    }

    pub fn level_violations(
        &self,
        level: &str,
    ) -> Result<BTreeMap<String, ClassViolation>, PlacementServiceError> {
        Ok(self.check_violations(&self.stored_workspace(level)?))
    }

    pub fn level_report(&self, level: &str) -> Result<Vec<ClassReportInfo>, PlacementServiceError> {
        Ok(self.report(&self.stored_workspace(level)?))
    }

    /// Manual move inside a level; `class_id: None` takes the student out of any class.
    pub fn move_student(
        &self,
        level: &str,
        key: &StudentKey,
        class_id: Option<&str>,
    ) -> Result<RosterSnapshot, PlacementServiceError> {
        let workspace = self.store.load_level(level)?;
        let mut snapshot = self.roster()?;
        roster::move_student(&mut snapshot.students, key, class_id, &workspace.classes)?;
        self.store.save_roster(&snapshot)?;
        Ok(snapshot)
    }

    /// Clear every placement into the level's classes.
    pub fn reset_level(&self, level: &str) -> Result<usize, PlacementServiceError> {
        let mut snapshot = self.roster()?;
        let cleared = roster::reset_placements(&mut snapshot.students, level);
        self.store.save_roster(&snapshot)?;
        info!(target_level = %level, cleared, "placements reset");
        Ok(cleared)
    }

    fn stored_workspace(&self, level: &str) -> Result<PlacementWorkspace, PlacementServiceError> {
        let LevelWorkspace { classes, rules } = self.store.load_level(level)?;
        Ok(PlacementWorkspace {
            target_level: level.trim().to_uppercase(),
            roster: self.roster()?.students,
            classes,
            rules,
        })
    }
}
