mod export;
pub mod edits;
pub mod levels;
mod parser;
pub mod store;

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::placement::Student;

pub use edits::{move_student, reset_placements, RosterEditError};
pub use export::{blank_template, write_roster};
pub use levels::{detect_levels, source_level, LevelStats};
pub use store::{JsonFileStore, LevelWorkspace, MemoryStore, StoreError, WorkspaceStore};

/// Column vocabulary of the roster file.
pub mod columns {
    pub const LAST_NAME: &str = "NOM";
    pub const FIRST_NAME: &str = "PRENOM";
    pub const BIRTH_DATE: &str = "DATE";
    pub const SEX: &str = "SEXE";
    pub const ORIGIN_CLASS: &str = "CLASSE";
    pub const OPTIONS: [&str; 3] = ["OPTION1", "OPTION2", "OPTION3"];
    pub const LEVEL: &str = "NIVEAU";
    pub const NPMA_LAST_NAME: &str = "NPMA_NOM";
    pub const NPMA_FIRST_NAME: &str = "NPMA_PRENOM";
    pub const AMA_LAST_NAME: &str = "AMA_NOM";
    pub const AMA_FIRST_NAME: &str = "AMA_PRENOM";
    pub const VIGILANCE: &str = "CODE_VIGILANCE";
    pub const ACCOMMODATION_PLAN: &str = "PAP";
    pub const NOTES: &str = "COMMENTAIRES";
    pub const FUTURE_CLASS: &str = "FUTURE_CLASSE";

    pub const STANDARD: [&str; 17] = [
        LAST_NAME,
        FIRST_NAME,
        BIRTH_DATE,
        SEX,
        ORIGIN_CLASS,
        OPTIONS[0],
        OPTIONS[1],
        OPTIONS[2],
        LEVEL,
        NPMA_LAST_NAME,
        NPMA_FIRST_NAME,
        AMA_LAST_NAME,
        AMA_FIRST_NAME,
        VIGILANCE,
        ACCOMMODATION_PLAN,
        NOTES,
        FUTURE_CLASS,
    ];

    pub fn is_standard(header: &str) -> bool {
        STANDARD.contains(&header)
    }
}

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Empty,
    MissingHeaders,
    NoRows,
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Empty => write!(f, "roster file is empty"),
            RosterImportError::MissingHeaders => {
                write!(f, "roster file has no usable header row")
            }
            RosterImportError::NoRows => write!(f, "roster file has no data rows"),
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Empty
            | RosterImportError::MissingHeaders
            | RosterImportError::NoRows => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Imported roster: the file's header row plus one record per student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub headers: Vec<String>,
    pub students: Vec<Student>,
}

impl RosterSnapshot {
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), RosterImportError> {
        write_roster(writer, &self.headers, &self.students)
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RosterSnapshot, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RosterSnapshot, RosterImportError> {
        parser::parse_roster(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_empty_and_headerless_files() {
        let empty = RosterImporter::from_reader(Cursor::new("\u{feff}  \n"));
        assert!(matches!(empty, Err(RosterImportError::Empty)));

        let headerless = RosterImporter::from_reader(Cursor::new(";;\nDUPONT;Léa;3A\n"));
        assert!(matches!(headerless, Err(RosterImportError::MissingHeaders)));

        let no_rows = RosterImporter::from_reader(Cursor::new("NOM;PRENOM\n;\n"));
        assert!(matches!(no_rows, Err(RosterImportError::NoRows)));
    }

    #[test]
    fn quoted_fields_keep_their_delimiters() {
        let csv = "NOM,PRENOM,CLASSE,COMMENTAIRES\n\"DURAND\",\"Sophie\",\"3EME A\",\"calme, attentive\"\n";
        let snapshot = RosterImporter::from_reader(Cursor::new(csv)).expect("roster parses");
        assert_eq!(snapshot.students.len(), 1);
        assert_eq!(snapshot.students[0].notes, "calme, attentive");
        assert_eq!(snapshot.students[0].origin_class, "3EME A");
    }

    #[test]
    fn short_rows_are_padded_and_blank_rows_skipped() {
        let csv = "NOM;PRENOM;CLASSE;NIVEAU\nDUPONT;Léa\n;;;\nMARTIN;Paul;3EME B;A\n";
        let snapshot = RosterImporter::from_reader(Cursor::new(csv)).expect("roster parses");
        assert_eq!(snapshot.students.len(), 2);
        assert_eq!(snapshot.students[0].origin_class, "");
        assert_eq!(snapshot.students[1].origin_class, "3EME B");
    }
}
