use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a titleholder at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TitleholderId(pub u64);

impl fmt::Display for TitleholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique license number, e.g. `LIC-000042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LicenseNumber(pub String);

impl LicenseNumber {
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("LIC-{sequence:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a textual enum value cannot be recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Deserialization goes through `FromStr`, so JSON bodies and query strings accept
/// the same spellings as the CLI and the seed importer.
macro_rules! parse_from_string {
    ($($enum:ty),+ $(,)?) => {
        $(
            impl TryFrom<String> for $enum {
                type Error = ParseEnumError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )+
    };
}

parse_from_string!(DocumentType, BloodGroup, RhFactor, LicenseClass);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DocumentType {
    NationalId,
    Passport,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::NationalId => "national_id",
            DocumentType::Passport => "passport",
        }
    }
}

impl FromStr for DocumentType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "national_id" | "dni" => Ok(Self::NationalId),
            "passport" | "pasaporte" => Ok(Self::Passport),
            _ => Err(ParseEnumError::new("document type", value)),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum BloodGroup {
    #[serde(rename = "0")]
    O,
    A,
    B,
    AB,
}

impl BloodGroup {
    pub const fn label(self) -> &'static str {
        match self {
            BloodGroup::O => "0",
            BloodGroup::A => "A",
            BloodGroup::B => "B",
            BloodGroup::AB => "AB",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "0" | "O" => Ok(Self::O),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "AB" => Ok(Self::AB),
            _ => Err(ParseEnumError::new("blood group", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum RhFactor {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
}

impl RhFactor {
    pub const fn label(self) -> &'static str {
        match self {
            RhFactor::Positive => "+",
            RhFactor::Negative => "-",
        }
    }
}

impl FromStr for RhFactor {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "+" | "positive" | "positivo" => Ok(Self::Positive),
            "-" | "negative" | "negativo" => Ok(Self::Negative),
            _ => Err(ParseEnumError::new("rh factor", value)),
        }
    }
}

/// License category. Each class carries its own minimum age and base rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum LicenseClass {
    A,
    B,
}

impl LicenseClass {
    pub const fn label(self) -> &'static str {
        match self {
            LicenseClass::A => "A",
            LicenseClass::B => "B",
        }
    }
}

impl FromStr for LicenseClass {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            _ => Err(ParseEnumError::new("license class", value)),
        }
    }
}

impl fmt::Display for LicenseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity key of a titleholder: document type plus number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub document_type: DocumentType,
    pub document_number: String,
}

impl DocumentKey {
    pub fn new(document_type: DocumentType, document_number: impl Into<String>) -> Self {
        Self {
            document_type,
            document_number: document_number.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.document_type, self.document_number)
    }
}

/// Person registered to hold a driving license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Titleholder {
    pub id: TitleholderId,
    pub document: DocumentKey,
    pub given_names: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub address: String,
    pub blood_group: BloodGroup,
    pub rh_factor: RhFactor,
    pub organ_donor: bool,
}

impl Titleholder {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_names, self.surname)
    }

    /// Whole years elapsed between the birth date and `date`.
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        age_between(self.birth_date, date)
    }
}

pub fn age_between(birth_date: NaiveDate, date: NaiveDate) -> u32 {
    if date <= birth_date {
        return 0;
    }

    let mut years = date.year() - birth_date.year();
    if (date.month(), date.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Issue date plus a number of whole years, clamping Feb 29 to Feb 28.
pub fn add_years(date: NaiveDate, years: u8) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(u32::from(years) * 12))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalReason {
    Expired,
    DataChange,
}

impl RenewalReason {
    pub const fn label(self) -> &'static str {
        match self {
            RenewalReason::Expired => "expired",
            RenewalReason::DataChange => "data_change",
        }
    }
}

/// How an issued license came to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LicenseKind {
    Original,
    Renewal {
        renews: LicenseNumber,
        reason: RenewalReason,
    },
    Copy {
        copy_of: LicenseNumber,
        copy_number: u32,
        reason: String,
    },
}

impl LicenseKind {
    pub fn label(&self) -> String {
        match self {
            LicenseKind::Original => "original".to_string(),
            LicenseKind::Renewal { renews, reason } => {
                format!("renewal of {renews} ({})", reason.label())
            }
            LicenseKind::Copy {
                copy_of,
                copy_number,
                ..
            } => format!("copy #{copy_number} of {copy_of}"),
        }
    }
}

/// Immutable record of a license handed to a titleholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedLicense {
    pub number: LicenseNumber,
    pub holder: Titleholder,
    pub class: LicenseClass,
    pub issue_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub validity_years: u8,
    pub cost: u32,
    pub age_at_issue: u32,
    pub issuer: String,
    pub kind: LicenseKind,
}

impl IssuedLicense {
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiration_date < date
    }

    pub fn renews(&self) -> Option<&LicenseNumber> {
        match &self.kind {
            LicenseKind::Renewal { renews, .. } => Some(renews),
            _ => None,
        }
    }

    pub fn copy_of(&self) -> Option<&LicenseNumber> {
        match &self.kind {
            LicenseKind::Copy { copy_of, .. } => Some(copy_of),
            _ => None,
        }
    }
}

/// Status derived for a license on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Expired,
    Superseded,
}

impl LicenseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Expired => "expired",
            LicenseStatus::Superseded => "superseded",
        }
    }
}
