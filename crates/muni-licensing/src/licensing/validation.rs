use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{BloodGroup, DocumentKey, DocumentType, RhFactor};

pub(crate) const MAX_NAME_LEN: usize = 50;
pub(crate) const MAX_ADDRESS_LEN: usize = 150;
pub(crate) const MAX_REASON_LEN: usize = 200;

/// Registration or update payload for a titleholder, prior to validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleholderDraft {
    pub document_type: DocumentType,
    pub document_number: String,
    pub given_names: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub address: String,
    pub blood_group: BloodGroup,
    pub rh_factor: RhFactor,
    #[serde(default)]
    pub organ_donor: bool,
}

impl TitleholderDraft {
    pub fn document_key(&self) -> DocumentKey {
        DocumentKey::new(self.document_type, self.document_number.clone())
    }
}

/// Input rejected before it reaches the repositories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("birth date {birth_date} must be before {today}")]
    BirthDateNotPast {
        birth_date: NaiveDate,
        today: NaiveDate,
    },
    #[error("document number '{number}' is not a valid {document_type}: {expected}")]
    MalformedDocument {
        document_type: DocumentType,
        number: String,
        expected: &'static str,
    },
}

/// Trim and check a draft, returning the normalised copy.
pub fn validate_draft(
    draft: TitleholderDraft,
    today: NaiveDate,
) -> Result<TitleholderDraft, ValidationError> {
    let given_names = bounded_text("given_names", &draft.given_names, MAX_NAME_LEN)?;
    let surname = bounded_text("surname", &draft.surname, MAX_NAME_LEN)?;
    let address = bounded_text("address", &draft.address, MAX_ADDRESS_LEN)?;
    let document_number = normalize_document(draft.document_type, &draft.document_number)?;

    if draft.birth_date >= today {
        return Err(ValidationError::BirthDateNotPast {
            birth_date: draft.birth_date,
            today,
        });
    }

    Ok(TitleholderDraft {
        document_number,
        given_names,
        surname,
        address,
        ..draft
    })
}

pub(crate) fn bounded_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

pub fn normalize_document(
    document_type: DocumentType,
    raw: &str,
) -> Result<String, ValidationError> {
    let number = raw.trim();
    if number.is_empty() {
        return Err(ValidationError::Blank {
            field: "document_number",
        });
    }

    let malformed = |expected: &'static str| ValidationError::MalformedDocument {
        document_type,
        number: number.to_string(),
        expected,
    };

    match document_type {
        DocumentType::NationalId => {
            let digits_only = number.chars().all(|c| c.is_ascii_digit());
            if !digits_only || !(7..=8).contains(&number.len()) {
                return Err(malformed("7 to 8 digits"));
            }
            Ok(number.to_string())
        }
        DocumentType::Passport => {
            let alphanumeric = number.chars().all(|c| c.is_ascii_alphanumeric());
            let has_letter = number.chars().any(|c| c.is_ascii_alphabetic());
            if !alphanumeric || !has_letter || !(6..=9).contains(&number.len()) {
                return Err(malformed("6 to 9 letters and digits, including a letter"));
            }
            Ok(number.to_ascii_uppercase())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date")
    }

    fn draft() -> TitleholderDraft {
        TitleholderDraft {
            document_type: DocumentType::NationalId,
            document_number: " 30123456 ".to_string(),
            given_names: "  Ana María ".to_string(),
            surname: "Gómez".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 3, 4).expect("valid date"),
            address: "San Martín 1234".to_string(),
            blood_group: BloodGroup::A,
            rh_factor: RhFactor::Positive,
            organ_donor: true,
        }
    }

    #[test]
    fn trims_fields_on_success() {
        let validated = validate_draft(draft(), today()).expect("draft is valid");
        assert_eq!(validated.document_number, "30123456");
        assert_eq!(validated.given_names, "Ana María");
    }

    #[test]
    fn rejects_blank_surname() {
        let mut input = draft();
        input.surname = "   ".to_string();
        assert_eq!(
            validate_draft(input, today()),
            Err(ValidationError::Blank { field: "surname" })
        );
    }

    #[test]
    fn rejects_overlong_address() {
        let mut input = draft();
        input.address = "x".repeat(151);
        assert_eq!(
            validate_draft(input, today()),
            Err(ValidationError::TooLong {
                field: "address",
                max: 150
            })
        );
    }

    #[test]
    fn rejects_birth_date_today_or_later() {
        let mut input = draft();
        input.birth_date = today();
        assert!(matches!(
            validate_draft(input, today()),
            Err(ValidationError::BirthDateNotPast { .. })
        ));
    }

    #[test]
    fn national_id_requires_seven_or_eight_digits() {
        assert!(normalize_document(DocumentType::NationalId, "1234567").is_ok());
        assert!(normalize_document(DocumentType::NationalId, "123456").is_err());
        assert!(normalize_document(DocumentType::NationalId, "12.345.678").is_err());
    }

    #[test]
    fn passport_is_uppercased_and_needs_a_letter() {
        assert_eq!(
            normalize_document(DocumentType::Passport, "aab123456"),
            Ok("AAB123456".to_string())
        );
        assert!(normalize_document(DocumentType::Passport, "123456").is_err());
        assert!(normalize_document(DocumentType::Passport, "AB-1234").is_err());
    }
}
