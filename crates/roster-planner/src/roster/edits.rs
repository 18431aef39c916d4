use crate::placement::{FutureClassShell, Student, StudentKey};

use super::levels::source_level;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterEditError {
    #[error("no student with key {0}")]
    UnknownStudent(StudentKey),
    #[error("no future class with id {0}")]
    UnknownClass(String),
}

/// Manual move: seat the student in the class with id `destination`, or unseat
/// them when `destination` is `None`.
pub fn move_student(
    roster: &mut [Student],
    key: &StudentKey,
    destination: Option<&str>,
    classes: &[FutureClassShell],
) -> Result<(), RosterEditError> {
    let class_name = match destination {
        Some(id) => classes
            .iter()
            .find(|class| class.id == id)
            .map(|class| class.name.clone())
            .ok_or_else(|| RosterEditError::UnknownClass(id.to_string()))?,
        None => String::new(),
    };

    let student = roster
        .iter_mut()
        .find(|student| student.key() == *key)
        .ok_or_else(|| RosterEditError::UnknownStudent(key.clone()))?;
    student.future_class = class_name;
    Ok(())
}

/// Unseat every student of the feeder level currently placed in a class of
/// `target_level`. Returns how many students were unseated.
pub fn reset_placements(roster: &mut [Student], target_level: &str) -> usize {
    let target = target_level.trim().to_uppercase();
    let source = source_level(&target);
    let mut cleared = 0;

    for student in roster.iter_mut() {
        if student.origin_class.to_uppercase().starts_with(&source)
            && student.is_placed()
            && student.future_class.starts_with(&target)
        {
            student.future_class.clear();
            cleared += 1;
        }
    }

    cleared
}
