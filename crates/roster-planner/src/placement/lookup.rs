use std::collections::HashMap;

use super::domain::{PersonName, Student};
use super::normalize::normalize;

/// Name lookup over one roster snapshot.
///
/// Pair references (NPMA / AMA) carry names rather than keys, so they are resolved
/// here on every pass. When two students share a name the earliest roster entry wins.
pub struct NameIndex {
    by_name: HashMap<(String, String), Vec<usize>>,
}

impl NameIndex {
    pub fn build(roster: &[Student]) -> Self {
        let mut by_name: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (position, student) in roster.iter().enumerate() {
            by_name
                .entry(name_key(&student.last_name, &student.first_name))
                .or_default()
                .push(position);
        }
        Self { by_name }
    }

    /// Roster position of the first student carrying `name`.
    pub fn position(&self, name: &PersonName) -> Option<usize> {
        self.positions(name).first().copied()
    }

    /// Every roster position carrying `name`, in roster order.
    pub fn positions(&self, name: &PersonName) -> &[usize] {
        self.by_name
            .get(&name_key(&name.last_name, &name.first_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resolve<'r>(&self, roster: &'r [Student], name: &PersonName) -> Option<&'r Student> {
        self.position(name).and_then(|position| roster.get(position))
    }
}

fn name_key(last_name: &str, first_name: &str) -> (String, String) {
    (normalize(last_name), normalize(first_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ignoring_case_and_accents() {
        let roster = vec![
            Student::new("DURAND", "Sophie", "5EME A"),
            Student::new("Lefèvre", "Éric", "5EME B"),
        ];
        let index = NameIndex::build(&roster);
        let name = PersonName::new("LEFEVRE", "eric").expect("complete name");
        let found = index.resolve(&roster, &name).expect("partner found");
        assert_eq!(found.origin_class, "5EME B");
    }

    #[test]
    fn first_duplicate_wins() {
        let roster = vec![
            Student::new("DURAND", "Sophie", "5EME A"),
            Student::new("DURAND", "Sophie", "5EME C"),
        ];
        let index = NameIndex::build(&roster);
        let name = PersonName::new("Durand", "Sophie").expect("complete name");
        assert_eq!(index.position(&name), Some(0));
        assert_eq!(index.positions(&name), &[0, 1]);
    }

    #[test]
    fn unknown_name_resolves_to_nothing() {
        let roster = vec![Student::new("DURAND", "Sophie", "5EME A")];
        let index = NameIndex::build(&roster);
        let name = PersonName::new("MARTIN", "Paul").expect("complete name");
        assert!(index.resolve(&roster, &name).is_none());
        assert!(index.positions(&name).is_empty());
    }
}
