use serde::{Deserialize, Serialize};

use super::domain::LicenseClass;

const SENIOR_AGE: u32 = 65;
const MIDDLE_AGE: u32 = 45;

/// Validity period and price granted to an eligible applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub validity_years: u8,
    pub cost: u32,
}

/// The applicant is younger than the class minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("applicant aged {age} is below the minimum age of {minimum} for class {class}")]
pub struct IneligibleAge {
    pub class: LicenseClass,
    pub age: u32,
    pub minimum: u32,
}

/// Stateless rules deciding whether a class can be issued and at what price.
pub struct EligibilityCalculator;

impl EligibilityCalculator {
    pub const fn minimum_age(class: LicenseClass) -> u32 {
        match class {
            LicenseClass::A => 18,
            LicenseClass::B => 21,
        }
    }

    pub const fn base_rate(class: LicenseClass) -> u32 {
        match class {
            LicenseClass::A => 1500,
            LicenseClass::B => 2000,
        }
    }

    /// Age bands are checked top-down; everyone under 45 gets the default.
    pub const fn validity_years(age: u32) -> u8 {
        if age >= SENIOR_AGE {
            3
        } else if age >= MIDDLE_AGE {
            4
        } else {
            5
        }
    }

    pub fn evaluate(age: u32, class: LicenseClass) -> Result<Eligibility, IneligibleAge> {
        let minimum = Self::minimum_age(class);
        if age < minimum {
            return Err(IneligibleAge {
                class,
                age,
                minimum,
            });
        }

        let validity_years = Self::validity_years(age);
        let cost = Self::base_rate(class) * u32::from(validity_years);

        Ok(Eligibility {
            validity_years,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(age: u32, class: LicenseClass) -> Eligibility {
        EligibilityCalculator::evaluate(age, class).expect("applicant should be eligible")
    }

    #[test]
    fn class_a_requires_eighteen() {
        let rejection = EligibilityCalculator::evaluate(17, LicenseClass::A)
            .expect_err("17 is too young for class A");
        assert_eq!(rejection.minimum, 18);
        assert_eq!(rejection.age, 17);

        assert_eq!(accepted(18, LicenseClass::A).validity_years, 5);
    }

    #[test]
    fn class_b_requires_twenty_one() {
        let rejection = EligibilityCalculator::evaluate(20, LicenseClass::B)
            .expect_err("20 is too young for class B");
        assert_eq!(rejection.minimum, 21);

        assert_eq!(accepted(21, LicenseClass::B).cost, 10_000);
    }

    #[test]
    fn cost_scales_with_validity_band() {
        assert_eq!(
            accepted(30, LicenseClass::B),
            Eligibility {
                validity_years: 5,
                cost: 10_000
            }
        );
        assert_eq!(
            accepted(50, LicenseClass::A),
            Eligibility {
                validity_years: 4,
                cost: 6_000
            }
        );
        assert_eq!(
            accepted(70, LicenseClass::B),
            Eligibility {
                validity_years: 3,
                cost: 6_000
            }
        );
    }

    #[test]
    fn band_boundaries_belong_to_the_older_band() {
        assert_eq!(EligibilityCalculator::validity_years(44), 5);
        assert_eq!(EligibilityCalculator::validity_years(45), 4);
        assert_eq!(EligibilityCalculator::validity_years(64), 4);
        assert_eq!(EligibilityCalculator::validity_years(65), 3);
    }

    #[test]
    fn rejection_message_names_the_minimum() {
        let rejection = EligibilityCalculator::evaluate(16, LicenseClass::A).unwrap_err();
        assert_eq!(
            rejection.to_string(),
            "applicant aged 16 is below the minimum age of 18 for class A"
        );
    }
}
