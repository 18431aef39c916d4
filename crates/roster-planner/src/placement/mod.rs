//! Class placement engine: rule model, hard-constraint filter, scorer, automatic
//! placement sweep, violation checks and comparative class reports.
//!
//! Every function takes the roster as a plain value. Pair references (NPMA/AMA) are
//! names resolved per pass through [`lookup::NameIndex`]; when two students share a
//! name the first one in roster order wins.

pub mod domain;
pub(crate) mod filter;
pub mod lookup;
pub mod normalize;
pub mod options;
pub mod orchestrator;
pub mod report;
pub mod router;
pub mod rules;
pub(crate) mod scorer;
pub mod service;
pub mod violations;

#[cfg(test)]
mod tests;

pub use domain::{
    generate_class_shells, AcademicLevel, Barrette, ClassSetupError, FutureClassShell, PersonName,
    Sex, Student, StudentKey, VigilanceCode, MAX_CLASSES_PER_BARRETTE,
};
pub use filter::{max_gender_gap, HardConstraintFilter, Rejection, DEFAULT_GENDER_GAP};
pub use normalize::{normalize, student_key};
pub use options::{catalog, catalog_option, option_badges, CatalogOption, OptionSelector};
pub use orchestrator::{arrange_by_class, display_order, AutoPlacer, PlacementOutcome, SkipReason};
pub use report::{generate_report, ClassReportInfo, LevelBreakdown, VigilanceBreakdown};
pub use router::placement_router;
pub use rules::{
    PlacementRule, RuleKind, RuleSet, RuleSetError, AMA_RULE_ID, LCA_RULE_ID, NPMA_RULE_ID,
};
pub use scorer::{score, GenderRatios};
pub use service::{
    Admissibility, AdmissibilityRequest, ClassCounts, PlacementService, PlacementServiceError,
    PlacementWorkspace, RuleDraft,
};
pub use violations::{check_violations, ClassViolation};
