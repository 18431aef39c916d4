use std::collections::HashMap;
use std::io::Read;

use crate::placement::{AcademicLevel, PersonName, Sex, Student, VigilanceCode};

use super::{columns, RosterImportError, RosterSnapshot};

/// Semicolon when the header line has more semicolons than commas.
pub(crate) fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

pub(crate) fn parse_roster<R: Read>(mut reader: R) -> Result<RosterSnapshot, RosterImportError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(RosterImportError::Empty);
    }

    let header_line = text.lines().next().unwrap_or_default();
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = csv_reader.records();
    let raw_headers = match records.next() {
        Some(record) => record?,
        None => return Err(RosterImportError::Empty),
    };

    // Blank header cells drop their whole column.
    let columns: Vec<(usize, String)> = raw_headers
        .iter()
        .enumerate()
        .map(|(position, header)| (position, header.trim_matches('"').trim().to_uppercase()))
        .filter(|(_, header)| !header.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(RosterImportError::MissingHeaders);
    }

    let mut students = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|value| value.is_empty()) {
            continue;
        }
        let row: HashMap<&str, &str> = columns
            .iter()
            .map(|(position, header)| (header.as_str(), record.get(*position).unwrap_or("")))
            .collect();
        students.push(student_from_row(&row));
    }

    if students.is_empty() {
        return Err(RosterImportError::NoRows);
    }

    Ok(RosterSnapshot {
        headers: columns.into_iter().map(|(_, header)| header).collect(),
        students,
    })
}

fn student_from_row(row: &HashMap<&str, &str>) -> Student {
    let value = |column: &str| row.get(column).copied().unwrap_or("").to_string();

    let mut student = Student::new(
        value(columns::LAST_NAME),
        value(columns::FIRST_NAME),
        value(columns::ORIGIN_CLASS),
    );
    student.birth_date = value(columns::BIRTH_DATE);
    student.sex = Sex::from_label(&value(columns::SEX));
    student.options = columns::OPTIONS.iter().map(|column| value(column)).collect();
    student.level = AcademicLevel::from_label(&value(columns::LEVEL));
    student.do_not_pair_with = PersonName::new(
        &value(columns::NPMA_LAST_NAME),
        &value(columns::NPMA_FIRST_NAME),
    );
    student.assign_together_with = PersonName::new(
        &value(columns::AMA_LAST_NAME),
        &value(columns::AMA_FIRST_NAME),
    );
    student.vigilance = VigilanceCode::from_label(&value(columns::VIGILANCE));
    student.accommodation_plan = value(columns::ACCOMMODATION_PLAN);
    student.notes = value(columns::NOTES);
    student.future_class = value(columns::FUTURE_CLASS);
    student.extra = row
        .iter()
        .filter(|(header, _)| !columns::is_standard(header))
        .map(|(header, value)| (header.to_string(), value.to_string()))
        .collect();
    student
}
