use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use muni_licensing::licensing::{
    InMemoryLicenseRepository, InMemoryTitleholderRepository, LicenseRepository,
    LicensingPolicy, LicensingService, Titleholder, TitleholderDraft, TitleholderRepository,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type MemoryLicensingService =
    LicensingService<InMemoryTitleholderRepository, InMemoryLicenseRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn in_memory_service(policy: LicensingPolicy) -> MemoryLicensingService {
    LicensingService::new(
        Arc::new(InMemoryTitleholderRepository::default()),
        Arc::new(InMemoryLicenseRepository::default()),
        policy,
    )
}

/// Registers every draft it can. Rejected rows are logged and skipped.
pub(crate) fn seed_titleholders<T, L>(
    service: &LicensingService<T, L>,
    drafts: Vec<TitleholderDraft>,
    today: NaiveDate,
) -> Vec<Titleholder>
where
    T: TitleholderRepository + 'static,
    L: LicenseRepository + 'static,
{
    let total = drafts.len();
    let mut registered = Vec::with_capacity(total);

    for draft in drafts {
        let document = draft.document_key();
        match service.register_titleholder(draft, today) {
            Ok(titleholder) => registered.push(titleholder),
            Err(err) => warn!(%document, error = %err, "skipping seed titleholder"),
        }
    }

    info!(registered = registered.len(), total, "titleholder seed applied");
    registered
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use muni_licensing::licensing::{BloodGroup, DocumentType, RhFactor};

    fn draft(document_number: &str) -> TitleholderDraft {
        TitleholderDraft {
            document_type: DocumentType::NationalId,
            document_number: document_number.to_string(),
            given_names: "Ana".to_string(),
            surname: "Gómez".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 3, 4).expect("valid date"),
            address: "San Martín 1234".to_string(),
            blood_group: BloodGroup::A,
            rh_factor: RhFactor::Positive,
            organ_donor: false,
        }
    }

    #[test]
    fn seeding_skips_rejected_rows() {
        let service = in_memory_service(LicensingPolicy::default());
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date");

        let registered = seed_titleholders(
            &service,
            vec![draft("30123456"), draft("30123456"), draft("12")],
            today,
        );

        assert_eq!(registered.len(), 1);
        assert_eq!(service.count_titleholders().expect("count"), 1);
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 2025-05-20 "),
            Ok(NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date"))
        );
        assert!(parse_date("20/05/2025").is_err());
    }
}
