use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{FutureClassShell, Sex, Student, StudentKey};
use super::filter::{max_gender_gap, HardConstraintFilter};
use super::lookup::NameIndex;
use super::normalize::normalize;
use super::rules::PlacementRule;
use super::scorer::{score, GenderRatios};

/// Why a sweep ended before looking at any student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPlaceableStudents,
    NoClasses,
}

/// Result of one automatic placement sweep.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub roster: Vec<Student>,
    /// Students eligible for the sweep.
    pub candidates: usize,
    /// Students seated by the sweep, partner propagation included.
    pub placed: usize,
    pub unplaced: Vec<StudentKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl PlacementOutcome {
    fn skipped(roster: Vec<Student>, unplaced: Vec<StudentKey>, reason: SkipReason) -> Self {
        Self {
            roster,
            candidates: unplaced.len(),
            placed: 0,
            unplaced,
            skipped: Some(reason),
        }
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }
}

/// Greedy placement sweep: filter, score, seat, then pull the assign-together partner along.
#[derive(Debug, Clone)]
pub struct AutoPlacer<R = StdRng> {
    rng: R,
    filter: HardConstraintFilter,
    gender_margin: usize,
}

pub const DEFAULT_GENDER_MARGIN: usize = 1;

impl AutoPlacer<StdRng> {
    /// Reproducible shuffles.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<R: Rng> AutoPlacer<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            filter: HardConstraintFilter::default(),
            gender_margin: DEFAULT_GENDER_MARGIN,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.filter = HardConstraintFilter::new(capacity);
        self
    }

    pub fn with_gender_margin(mut self, margin: usize) -> Self {
        self.gender_margin = margin;
        self
    }

    pub fn filter(&self) -> &HardConstraintFilter {
        &self.filter
    }

    /// Seat every unplaced, levelled student whose origin class belongs to `source_level`.
    ///
    /// The input roster is left untouched; the updated copy comes back in the outcome.
    pub fn place(
        &mut self,
        roster: &[Student],
        source_level: &str,
        classes: &[FutureClassShell],
        rules: &[PlacementRule],
    ) -> PlacementOutcome {
        let mut roster = roster.to_vec();
        let source = source_level.trim().to_uppercase();

        let mut pool: Vec<usize> = roster
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.origin_class.to_uppercase().starts_with(&source)
                    && !s.is_placed()
                    && s.level.is_specified()
            })
            .map(|(position, _)| position)
            .collect();

        if pool.is_empty() {
            info!(source = %source, "no placeable students for source level");
            return PlacementOutcome::skipped(roster, Vec::new(), SkipReason::NoPlaceableStudents);
        }
        if classes.is_empty() {
            info!(source = %source, "no future classes to place into");
            let unplaced = pool.iter().map(|&p| roster[p].key()).collect();
            return PlacementOutcome::skipped(roster, unplaced, SkipReason::NoClasses);
        }

        let boys = pool.iter().filter(|&&p| roster[p].sex == Sex::Male).count();
        let girls = pool.iter().filter(|&&p| roster[p].sex == Sex::Female).count();
        let ratios = GenderRatios::from_students(pool.iter().map(|&p| &roster[p]));
        let gap = max_gender_gap(boys, girls, classes.len(), self.gender_margin);
        let index = NameIndex::build(&roster);

        pool.sort_by_key(|&p| {
            let student = &roster[p];
            let anchored = student
                .assign_together_with
                .as_ref()
                .and_then(|name| index.resolve(&roster, name))
                .is_some_and(Student::is_placed);
            (!anchored, student.level.placement_priority())
        });

        info!(
            source = %source,
            candidates = pool.len(),
            classes = classes.len(),
            max_gender_gap = gap,
            "starting automatic placement"
        );

        let candidates = pool.len();
        let mut placed = 0;
        let mut unplaced = Vec::new();
        let mut order: Vec<usize> = (0..classes.len()).collect();

        for position in pool {
            if roster[position].is_placed() {
                continue;
            }

            order.shuffle(&mut self.rng);
            let best = self.best_class(
                &roster,
                position,
                &order,
                classes,
                rules,
                &index,
                ratios,
                gap,
            );
            let Some(best) = best else {
                debug!(student = %roster[position].key(), "no admissible class");
                unplaced.push(roster[position].key());
                continue;
            };

            let class = &classes[best];
            roster[position].future_class = class.name.clone();
            placed += 1;

            let partner = self.seat_partner(&mut roster, position, class, rules, &index, gap);
            if let Some(partner) = partner {
                debug!(
                    student = %roster[position].key(),
                    partner = %roster[partner].key(),
                    class = %class.name,
                    "assign-together partner seated alongside"
                );
                placed += 1;
            }
        }

        // A student skipped earlier may since have been seated as someone's partner.
        unplaced.retain(|key| roster.iter().any(|s| s.key() == *key && !s.is_placed()));

        let roster = arrange_by_class(roster, classes);
        info!(placed, unplaced = unplaced.len(), "automatic placement finished");

        PlacementOutcome {
            roster,
            candidates,
            placed,
            unplaced,
            skipped: None,
        }
    }

    /// Highest-scoring admissible class; ties keep the earlier class in shuffle order.
    #[allow(clippy::too_many_arguments)]
    fn best_class(
        &self,
        roster: &[Student],
        position: usize,
        order: &[usize],
        classes: &[FutureClassShell],
        rules: &[PlacementRule],
        index: &NameIndex,
        ratios: GenderRatios,
        gap: usize,
    ) -> Option<usize> {
        let student = &roster[position];
        let mut best: Option<(usize, f64)> = None;

        for &candidate in order {
            let class = &classes[candidate];
            let occupants = occupants_of(roster, &class.name);
            if self
                .filter
                .is_inadmissible(student, class, &occupants, rules, gap)
            {
                continue;
            }
            let value = score(student, class, &occupants, roster, index, ratios);
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((candidate, value));
            }
        }

        best.map(|(candidate, _)| candidate)
    }

    /// Seat the first unplaced student answering to the assign-together name, if admissible.
    fn seat_partner(
        &self,
        roster: &mut [Student],
        position: usize,
        class: &FutureClassShell,
        rules: &[PlacementRule],
        index: &NameIndex,
        gap: usize,
    ) -> Option<usize> {
        let name = roster[position].assign_together_with.as_ref()?;
        let partner = index
            .positions(name)
            .iter()
            .copied()
            .find(|&p| !roster[p].is_placed())?;

        let occupants = occupants_of(roster, &class.name);
        if self
            .filter
            .is_inadmissible(&roster[partner], class, &occupants, rules, gap)
        {
            return None;
        }

        roster[partner].future_class = class.name.clone();
        Some(partner)
    }
}

fn occupants_of<'r>(roster: &'r [Student], class_name: &str) -> Vec<&'r Student> {
    roster.iter().filter(|s| s.is_in(class_name)).collect()
}

/// Students outside the classes keep their order; each class follows, sorted for display.
pub fn arrange_by_class(roster: Vec<Student>, classes: &[FutureClassShell]) -> Vec<Student> {
    let (mut seated, mut arranged): (Vec<Student>, Vec<Student>) = roster
        .into_iter()
        .partition(|s| classes.iter().any(|class| s.is_in(&class.name)));

    for class in classes {
        let (mut members, rest): (Vec<Student>, Vec<Student>) =
            seated.into_iter().partition(|s| s.is_in(&class.name));
        members.sort_by(display_order);
        arranged.extend(members);
        seated = rest;
    }

    arranged
}

/// Level A to D, then family name, then given name.
pub fn display_order(left: &Student, right: &Student) -> Ordering {
    left.level
        .cmp(&right.level)
        .then_with(|| normalize(&left.last_name).cmp(&normalize(&right.last_name)))
        .then_with(|| normalize(&left.first_name).cmp(&normalize(&right.first_name)))
}
