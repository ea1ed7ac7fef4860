use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{IssuedLicense, LicenseClass, LicenseNumber};

/// Printable summary of an issued license and the fee charged for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseReceipt {
    pub number: LicenseNumber,
    pub holder_name: String,
    pub document: String,
    pub address: String,
    pub blood: String,
    pub organ_donor: bool,
    pub class: LicenseClass,
    pub kind: String,
    pub issue_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub validity_years: u8,
    pub cost: u32,
    pub issuer: String,
}

impl LicenseReceipt {
    pub fn from_license(license: &IssuedLicense) -> Self {
        let holder = &license.holder;
        Self {
            number: license.number.clone(),
            holder_name: holder.full_name(),
            document: holder.document.to_string(),
            address: holder.address.clone(),
            blood: format!("{}{}", holder.blood_group.label(), holder.rh_factor.label()),
            organ_donor: holder.organ_donor,
            class: license.class,
            kind: license.kind.label(),
            issue_date: license.issue_date,
            expiration_date: license.expiration_date,
            validity_years: license.validity_years,
            cost: license.cost,
            issuer: license.issuer.clone(),
        }
    }

    pub fn render_text(&self) -> String {
        let rows = [
            ("License", self.number.to_string()),
            ("Holder", self.holder_name.clone()),
            ("Document", self.document.clone()),
            ("Address", self.address.clone()),
            ("Blood", self.blood.clone()),
            (
                "Organ donor",
                if self.organ_donor { "yes" } else { "no" }.to_string(),
            ),
            ("Class", self.class.to_string()),
            ("Type", self.kind.clone()),
            ("Issued", self.issue_date.format("%Y-%m-%d").to_string()),
            ("Expires", self.expiration_date.format("%Y-%m-%d").to_string()),
            ("Validity", format!("{} years", self.validity_years)),
            ("Amount due", format!("${}", self.cost)),
            ("Issued by", self.issuer.clone()),
        ];

        let mut out = String::from("DRIVER LICENSE RECEIPT\n");
        out.push_str(&"-".repeat(40));
        out.push('\n');
        for (label, value) in rows {
            out.push_str(&format!("{label:<12} {value}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licensing::domain::{
        BloodGroup, DocumentKey, DocumentType, LicenseKind, RhFactor, Titleholder, TitleholderId,
    };

    fn license() -> IssuedLicense {
        IssuedLicense {
            number: LicenseNumber::from_sequence(7),
            holder: Titleholder {
                id: TitleholderId(3),
                document: DocumentKey::new(DocumentType::NationalId, "28999111"),
                given_names: "Julián".to_string(),
                surname: "Ríos".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1978, 1, 9).expect("valid date"),
                address: "Belgrano 55".to_string(),
                blood_group: BloodGroup::O,
                rh_factor: RhFactor::Negative,
                organ_donor: false,
            },
            class: LicenseClass::B,
            issue_date: NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
            expiration_date: NaiveDate::from_ymd_opt(2029, 4, 1).expect("valid date"),
            validity_years: 4,
            cost: 8000,
            age_at_issue: 47,
            issuer: "operator".to_string(),
            kind: LicenseKind::Original,
        }
    }

    #[test]
    fn receipt_flattens_holder_details() {
        let receipt = LicenseReceipt::from_license(&license());
        assert_eq!(receipt.holder_name, "Julián Ríos");
        assert_eq!(receipt.document, "national_id 28999111");
        assert_eq!(receipt.blood, "0-");
        assert_eq!(receipt.kind, "original");
    }

    #[test]
    fn text_rendering_lists_amount_and_expiry() {
        let text = LicenseReceipt::from_license(&license()).render_text();
        assert!(text.starts_with("DRIVER LICENSE RECEIPT"));
        assert!(text.contains("LIC-000007"));
        assert!(text.contains("Expires      2029-04-01"));
        assert!(text.contains("Amount due   $8000"));
    }
}
