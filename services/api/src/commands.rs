use crate::infra::planner_service;
use clap::Args;
use roster_planner::config::AppConfig;
use roster_planner::error::AppError;
use roster_planner::placement::{
    ClassCounts, ClassReportInfo, PlacementOutcome, PlacementService, SkipReason,
};
use roster_planner::roster::{
    blank_template, detect_levels, source_level, JsonFileStore, RosterImporter,
};
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RosterArgs {
    /// Roster CSV exported from the school information system
    #[arg(long)]
    pub(crate) roster: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct LevelArgs {
    #[command(flatten)]
    pub(crate) roster: RosterArgs,
    /// Level of the future classes, e.g. 6EME or SECONDE
    #[arg(long)]
    pub(crate) level: String,
    /// Regenerate the level's classes with this many in barrette 1
    #[arg(long)]
    pub(crate) barrette1: Option<usize>,
    /// Regenerate the level's classes with this many in barrette 2
    #[arg(long)]
    pub(crate) barrette2: Option<usize>,
    /// Override the directory holding the stored level workspaces
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct PlaceArgs {
    #[command(flatten)]
    pub(crate) level: LevelArgs,
    /// Shuffle seed for a reproducible placement
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Write the placed roster to this CSV file
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct TemplateArgs {
    /// Destination of the empty roster
    #[arg(long, default_value = "roster_template.csv")]
    pub(crate) output: PathBuf,
}

pub(crate) fn run_levels(args: RosterArgs) -> Result<(), AppError> {
    let snapshot = RosterImporter::from_path(&args.roster)?;
    let levels = detect_levels(&snapshot.students);

    println!(
        "Roster {} ({} students)",
        args.roster.display(),
        snapshot.students.len()
    );
    if levels.is_empty() {
        println!("- no origin classes recorded");
    }
    for stats in levels {
        println!(
            "- {}: {} students | {} boys | {} girls | {} unspecified",
            stats.level, stats.total, stats.boys, stats.girls, stats.unspecified_sex
        );
    }
    Ok(())
}

pub(crate) fn run_place(args: PlaceArgs) -> Result<(), AppError> {
    let PlaceArgs {
        level,
        seed,
        output,
    } = args;
    let (service, level) = open_level(level, seed)?;

    let outcome = service.place_level(&level)?;
    render_outcome(&level, &outcome);
    if outcome.skipped.is_none() {
        render_report(&service.level_report(&level)?);
    }

    if let Some(path) = output {
        let snapshot = service.roster()?;
        snapshot.write_csv(File::create(&path)?)?;
        println!("\nPlaced roster written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_check(args: LevelArgs) -> Result<(), AppError> {
    let (service, level) = open_level(args, None)?;
    let classes = service.level_workspace(&level)?.classes;
    let violations = service.level_violations(&level)?;

    println!("Rule check for {level}");
    if classes.is_empty() {
        println!("- no classes configured; pass --barrette1/--barrette2");
    }
    for class in &classes {
        match violations.get(&class.id) {
            Some(found) if found.has_violation => {
                println!("- {}: {} violation(s)", class.name, found.messages.len());
                for message in &found.messages {
                    println!("    - {message}");
                }
            }
            _ => println!("- {}: ok", class.name),
        }
    }
    Ok(())
}

pub(crate) fn run_report(args: LevelArgs) -> Result<(), AppError> {
    let (service, level) = open_level(args, None)?;
    println!("Class report for {level}");
    render_report(&service.level_report(&level)?);
    Ok(())
}

pub(crate) fn run_template(args: TemplateArgs) -> Result<(), AppError> {
    blank_template(File::create(&args.output)?)?;
    println!("Empty roster written to {}", args.output.display());
    Ok(())
}

/// Import the roster file into the workspace store and apply any class counts given.
fn open_level(
    args: LevelArgs,
    seed: Option<u64>,
) -> Result<(PlacementService<JsonFileStore>, String), AppError> {
    let mut config = AppConfig::load()?.placement;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if seed.is_some() {
        config.seed = seed;
    }

    let service = planner_service(&config);
    service.import_roster(File::open(&args.roster.roster)?)?;

    let level = args.level.trim().to_uppercase();
    if args.barrette1.is_some() || args.barrette2.is_some() {
        let counts = ClassCounts {
            barrette1: args.barrette1.unwrap_or(0),
            barrette2: args.barrette2.unwrap_or(0),
        };
        service.configure_classes(&level, counts)?;
    }
    Ok((service, level))
}

fn render_outcome(level: &str, outcome: &PlacementOutcome) {
    println!("Automatic placement into {level} (from {})", source_level(level));
    match outcome.skipped {
        Some(SkipReason::NoPlaceableStudents) => {
            println!("- nothing to place: no unplaced, levelled students in the feeder classes");
            return;
        }
        Some(SkipReason::NoClasses) => {
            println!(
                "- {} candidates but no classes configured; pass --barrette1/--barrette2",
                outcome.candidates
            );
            return;
        }
        None => {}
    }

    println!(
        "- {} candidates | {} placed | {} unplaced",
        outcome.candidates,
        outcome.placed,
        outcome.unplaced.len()
    );
    for key in &outcome.unplaced {
        println!("    - no admissible class for {key}");
    }
}

fn render_report(report: &[ClassReportInfo]) {
    if report.is_empty() {
        println!("- no classes configured");
        return;
    }
    for (rank, class) in report.iter().enumerate() {
        println!(
            "{}. {} (barrette {}) score {} | {} students: {} G / {} F / {} ?",
            rank + 1,
            class.class_name,
            class.barrette.number(),
            class.score,
            class.student_count,
            class.boys,
            class.girls,
            class.unspecified_sex
        );
        println!(
            "   levels A {} B {} C {} D {} | vigilance red {} orange {} | PAP {}",
            class.levels.a,
            class.levels.b,
            class.levels.c,
            class.levels.d,
            class.vigilance.red,
            class.vigilance.orange,
            class.accommodation_plans
        );
        for message in &class.violations {
            println!("   ! {message}");
        }
    }
}
