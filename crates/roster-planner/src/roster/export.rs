use std::io::Write;

use crate::placement::Student;

use super::{columns, RosterImportError};

/// Columns appended when at least one student fills them in.
const DYNAMIC: [&str; 11] = [
    columns::LEVEL,
    columns::OPTIONS[0],
    columns::OPTIONS[1],
    columns::OPTIONS[2],
    columns::NPMA_LAST_NAME,
    columns::NPMA_FIRST_NAME,
    columns::AMA_LAST_NAME,
    columns::AMA_FIRST_NAME,
    columns::VIGILANCE,
    columns::ACCOMMODATION_PLAN,
    columns::NOTES,
];

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer)
}

/// Write the roster with `FUTURE_CLASSE` first, then the imported headers,
/// then any populated column the import did not carry.
pub fn write_roster<W: Write>(
    writer: W,
    headers: &[String],
    students: &[Student],
) -> Result<(), RosterImportError> {
    let mut order: Vec<&str> = vec![columns::FUTURE_CLASS];
    order.extend(
        headers
            .iter()
            .map(String::as_str)
            .filter(|header| !header.eq_ignore_ascii_case(columns::FUTURE_CLASS)),
    );
    for header in DYNAMIC {
        if order.contains(&header) {
            continue;
        }
        if students
            .iter()
            .any(|student| !column_value(student, header).trim().is_empty())
        {
            order.push(header);
        }
    }

    let mut csv = csv_writer(writer);
    csv.write_record(&order)?;
    for student in students {
        csv.write_record(order.iter().map(|header| column_value(student, header)))?;
    }
    csv.flush()?;
    Ok(())
}

/// Header row only, ready to be filled in by hand.
pub fn blank_template<W: Write>(writer: W) -> Result<(), RosterImportError> {
    let mut csv = csv_writer(writer);
    csv.write_record(columns::STANDARD)?;
    csv.flush()?;
    Ok(())
}

fn column_value(student: &Student, header: &str) -> String {
    let pair_half = |name: Option<&crate::placement::PersonName>, last: bool| {
        name.map(|name| {
            if last {
                name.last_name.clone()
            } else {
                name.first_name.clone()
            }
        })
        .unwrap_or_default()
    };

    match header {
        columns::LAST_NAME => student.last_name.clone(),
        columns::FIRST_NAME => student.first_name.clone(),
        columns::BIRTH_DATE => student.birth_date.clone(),
        columns::SEX => student.sex.label().to_string(),
        columns::ORIGIN_CLASS => student.origin_class.clone(),
        columns::LEVEL => student.level.label().to_string(),
        columns::NPMA_LAST_NAME => pair_half(student.do_not_pair_with.as_ref(), true),
        columns::NPMA_FIRST_NAME => pair_half(student.do_not_pair_with.as_ref(), false),
        columns::AMA_LAST_NAME => pair_half(student.assign_together_with.as_ref(), true),
        columns::AMA_FIRST_NAME => pair_half(student.assign_together_with.as_ref(), false),
        columns::VIGILANCE => student.vigilance.label().to_string(),
        columns::ACCOMMODATION_PLAN => student.accommodation_plan.clone(),
        columns::NOTES => student.notes.clone(),
        columns::FUTURE_CLASS => student.future_class.clone(),
        other => match columns::OPTIONS.iter().position(|option| *option == other) {
            Some(slot) => student.options.get(slot).cloned().unwrap_or_default(),
            None => student.extra.get(other).cloned().unwrap_or_default(),
        },
    }
}
