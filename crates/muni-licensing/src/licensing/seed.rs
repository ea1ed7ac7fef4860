//! CSV import of titleholder records used to seed the in-memory stores.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{BloodGroup, DocumentType, ParseEnumError, RhFactor};
use super::validation::TitleholderDraft;

#[derive(Debug, thiserror::Error)]
pub enum SeedImportError {
    #[error("failed to read titleholder seed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid titleholder CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {source}")]
    Field {
        row: usize,
        #[source]
        source: ParseEnumError,
    },
    #[error("row {row}: birth date '{value}' is not YYYY-MM-DD")]
    BirthDate { row: usize, value: String },
}

pub struct TitleholderSeed;

impl TitleholderSeed {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<TitleholderDraft>, SeedImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<TitleholderDraft>, SeedImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut drafts = Vec::new();

        for (index, record) in csv_reader.deserialize::<SeedRow>().enumerate() {
            let row = index + 2;
            drafts.push(record?.into_draft(row)?);
        }

        Ok(drafts)
    }
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    document_type: String,
    document_number: String,
    given_names: String,
    surname: String,
    birth_date: String,
    address: String,
    blood_group: String,
    rh_factor: String,
    #[serde(default, deserialize_with = "flag")]
    organ_donor: bool,
}

impl SeedRow {
    fn into_draft(self, row: usize) -> Result<TitleholderDraft, SeedImportError> {
        let field = |source| SeedImportError::Field { row, source };
        let birth_date = NaiveDate::parse_from_str(&self.birth_date, "%Y-%m-%d").map_err(|_| {
            SeedImportError::BirthDate {
                row,
                value: self.birth_date.clone(),
            }
        })?;

        Ok(TitleholderDraft {
            document_type: self.document_type.parse::<DocumentType>().map_err(field)?,
            blood_group: self.blood_group.parse::<BloodGroup>().map_err(field)?,
            rh_factor: self.rh_factor.parse::<RhFactor>().map_err(field)?,
            document_number: self.document_number,
            given_names: self.given_names,
            surname: self.surname,
            birth_date,
            address: self.address,
            organ_donor: self.organ_donor,
        })
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        raw.as_deref().map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "yes" | "si" | "1")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "document_type,document_number,given_names,surname,birth_date,address,blood_group,rh_factor,organ_donor\n";

    #[test]
    fn parses_rows_into_drafts() {
        let csv = format!(
            "{HEADER}dni, 30123456 ,Ana,Gómez,1990-03-04,San Martín 1234,A,+,yes\npassport,AAB123456,John,Smith,1960-11-30,Mitre 9,0,negative,\n"
        );
        let drafts = TitleholderSeed::from_reader(Cursor::new(csv)).expect("seed parses");

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].document_type, DocumentType::NationalId);
        assert_eq!(drafts[0].document_number, "30123456");
        assert!(drafts[0].organ_donor);
        assert_eq!(drafts[1].blood_group, BloodGroup::O);
        assert_eq!(drafts[1].rh_factor, RhFactor::Negative);
        assert!(!drafts[1].organ_donor);
    }

    #[test]
    fn reports_row_of_bad_enum() {
        let csv = format!("{HEADER}dni,30123456,Ana,Gómez,1990-03-04,Calle 1,Z,+,no\n");
        match TitleholderSeed::from_reader(Cursor::new(csv)) {
            Err(SeedImportError::Field { row: 2, source }) => {
                assert_eq!(source.kind, "blood group");
            }
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn reports_bad_birth_date() {
        let csv = format!("{HEADER}dni,30123456,Ana,Gómez,04/03/1990,Calle 1,A,+,no\n");
        assert!(matches!(
            TitleholderSeed::from_reader(Cursor::new(csv)),
            Err(SeedImportError::BirthDate { row: 2, .. })
        ));
    }
}
