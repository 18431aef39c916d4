use unicode_normalization::UnicodeNormalization;

use super::domain::{Student, StudentKey};

const KEY_SEPARATOR: char = '|';
const MISSING_DATE: &str = "no-date";

/// Lowercase and strip combining diacritics so "Élodie" and "elodie" compare equal.
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
}

/// Identity key built from the four fields that never change during planning.
pub fn student_key(student: &Student) -> StudentKey {
    let date = if student.birth_date.is_empty() {
        MISSING_DATE
    } else {
        student.birth_date.as_str()
    };
    StudentKey(format!(
        "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{date}{KEY_SEPARATOR}{}",
        student.last_name, student.first_name, student.origin_class
    ))
}

/// Order-independent key for a pair of students.
pub(crate) fn pair_key(left: &Student, right: &Student) -> (StudentKey, StudentKey) {
    let (a, b) = (left.key(), right.key());
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::domain::{AcademicLevel, VigilanceCode};

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(normalize("Élodie"), "elodie");
        assert_eq!(normalize("FÉMININ"), "feminin");
        assert_eq!(normalize("Ça Çà"), "ca ca");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn key_ignores_mutable_fields() {
        let mut student = Student::new("MARTIN", "Léa", "3EME A");
        student.birth_date = "12/03/10".to_string();
        let before = student.key();

        student.future_class = "SECONDE 2".to_string();
        student.options.push("Latin".to_string());
        student.level = AcademicLevel::C;
        student.vigilance = VigilanceCode::Red;

        assert_eq!(student.key(), before);
        assert_eq!(before.0, "MARTIN|Léa|12/03/10|3EME A");
    }

    #[test]
    fn key_uses_placeholder_for_missing_date() {
        let student = Student::new("MARTIN", "Léa", "3EME A");
        assert_eq!(student.key().0, "MARTIN|Léa|no-date|3EME A");
    }

    #[test]
    fn pair_key_is_symmetric() {
        let a = Student::new("A", "Un", "3EME A");
        let b = Student::new("B", "Deux", "3EME A");
        assert_eq!(pair_key(&a, &b), pair_key(&b, &a));
    }
}
