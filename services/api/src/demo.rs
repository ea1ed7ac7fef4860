use crate::infra::{in_memory_service, seed_titleholders, MemoryLicensingService};
use chrono::{Local, NaiveDate};
use clap::Args;
use muni_licensing::error::AppError;
use muni_licensing::licensing::{
    ActiveHolderFilter, BloodGroup, CopyRequest, DocumentType, EligibilityCalculator,
    IssueRequest, IssuedLicense, LicenseClass, LicenseReceipt, LicensingError, LicensingPolicy,
    RenewalReason, RenewalRequest, RhFactor, Titleholder, TitleholderDraft, TitleholderSeed,
};
use std::path::PathBuf;

const DEMO_ISSUER: &str = "Demo Clerk";

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Applicant age in whole years
    #[arg(long)]
    pub(crate) age: u32,
    /// License class (A or B)
    #[arg(long)]
    pub(crate) class: LicenseClass,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the office date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Titleholder CSV to register instead of the built-in sample.
    #[arg(long)]
    pub(crate) seed_csv: Option<PathBuf>,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let eligibility =
        EligibilityCalculator::evaluate(args.age, args.class).map_err(LicensingError::from)?;

    println!("Class {} at age {}", args.class, args.age);
    println!(
        "- valid for {} years | ${} ({} x {})",
        eligibility.validity_years,
        eligibility.cost,
        EligibilityCalculator::base_rate(args.class),
        eligibility.validity_years
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, seed_csv } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let service = in_memory_service(LicensingPolicy::default());

    let drafts = match seed_csv {
        Some(path) => TitleholderSeed::from_path(path)?,
        None => sample_drafts(),
    };

    println!("Licensing office demo ({today})");
    let registered = seed_titleholders(&service, drafts, today);
    println!("- {} titleholders registered", registered.len());

    let mut issued = Vec::new();
    for titleholder in &registered {
        if let Some(license) = issue_best_class(&service, titleholder, today)? {
            print_receipt(&license);
            issued.push(license);
        }
    }

    if let Some(first) = issued.first() {
        let copy = service.issue_copy(
            CopyRequest {
                license_number: first.number.clone(),
                reason: "Lost wallet".to_string(),
                issuer: DEMO_ISSUER.to_string(),
            },
            today,
        )?;
        print_receipt(&copy);

        let renewed = service.renew_license(
            RenewalRequest {
                license_number: first.number.clone(),
                reason: RenewalReason::DataChange,
                given_names: None,
                surname: None,
                address: Some(format!("{} (moved)", first.holder.address)),
                issuer: None,
            },
            today,
        )?;
        print_receipt(&renewed);
    }

    let active = service.search_active_holders(&ActiveHolderFilter::default(), today)?;
    println!("\nOffice totals");
    println!("- {} licenses issued", service.count_issued()?);
    println!("- {} expired licenses", service.count_expired(today)?);
    println!("- {} titleholders with an active license", active.len());
    for row in active {
        println!(
            "  - {} | class {} | {} until {}",
            row.titleholder.full_name(),
            row.class,
            row.license_number,
            row.expiration_date
        );
    }

    Ok(())
}

/// Class B when the titleholder is old enough, otherwise class A.
fn issue_best_class(
    service: &MemoryLicensingService,
    titleholder: &Titleholder,
    today: NaiveDate,
) -> Result<Option<IssuedLicense>, LicensingError> {
    for class in [LicenseClass::B, LicenseClass::A] {
        let request = IssueRequest {
            titleholder_id: titleholder.id,
            class,
            issuer: DEMO_ISSUER.to_string(),
        };
        match service.issue_license(request, today) {
            Ok(license) => return Ok(Some(license)),
            Err(LicensingError::Ineligible(rejection)) => {
                println!("\n{}: {rejection}", titleholder.full_name());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

fn print_receipt(license: &IssuedLicense) {
    println!("\n{}", LicenseReceipt::from_license(license).render_text());
}

fn sample_drafts() -> Vec<TitleholderDraft> {
    let sample = |document_type, number: &str, given: &str, surname: &str, birth: (i32, u32, u32)| {
        NaiveDate::from_ymd_opt(birth.0, birth.1, birth.2).map(|birth_date| TitleholderDraft {
            document_type,
            document_number: number.to_string(),
            given_names: given.to_string(),
            surname: surname.to_string(),
            birth_date,
            address: "Av. Corrientes 1500".to_string(),
            blood_group: BloodGroup::O,
            rh_factor: RhFactor::Positive,
            organ_donor: true,
        })
    };

    [
        sample(DocumentType::NationalId, "30123456", "Ana María", "Gómez", (1990, 3, 4)),
        sample(DocumentType::Passport, "AB123456", "Rosa", "Díaz", (1955, 1, 15)),
        sample(DocumentType::NationalId, "40111222", "Lucas", "Pereyra", (2006, 9, 10)),
        sample(DocumentType::NationalId, "45999000", "Sofía", "Ruiz", (2010, 11, 2)),
    ]
    .into_iter()
    .flatten()
    .collect()
}
