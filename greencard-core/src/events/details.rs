//! Display details of events with coded fields resolved through the config lookup tables.

use crate::config::{resolve, AppConfig};

use super::models::{TestEvent3, TestResult2, VaccinationEvent};

/// Resolved details of a negative test.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestEventDetails {
    /// Test type name, or the raw code when unknown
    pub test_type: String,
    /// Test name
    pub test_name: String,
    /// Test facility
    pub facility: String,
    /// Manufacturer name, or the raw code when unknown
    pub manufacturer: String,
    /// Provider-unique identifier
    pub unique: String,
}

/// Resolved details of a vaccination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VaccinationEventDetails {
    /// Vaccine name: the HPK name when known, otherwise the brand name
    pub vaccine: String,
    /// Vaccine type name
    pub vaccine_type: String,
    /// Manufacturer name
    pub manufacturer: String,
    /// `(dose number, total doses)` when both are known
    pub doses: Option<(String, String)>,
    /// Day of vaccination, ISO-8601
    pub date: String,
    /// Country of vaccination
    pub country: String,
    /// Provider-unique identifier
    pub unique: String,
}

impl TestEventDetails {
    /// Details of a v3 test event.
    #[must_use]
    pub fn for_test_v3(event: &TestEvent3, config: &AppConfig) -> Self {
        let test = event.negative_test.as_ref();
        Self {
            test_type: resolve(
                &config.eu_test_types,
                test.and_then(|test| test.test_type.as_deref()),
            ),
            test_name: test.and_then(|test| test.name.clone()).unwrap_or_default(),
            facility: test
                .and_then(|test| test.facility.clone())
                .unwrap_or_default(),
            manufacturer: resolve(
                &config.eu_test_manufacturers,
                test.and_then(|test| test.manufacturer.as_deref()),
            ),
            unique: event.unique.clone().unwrap_or_default(),
        }
    }

    /// Details of a v2 test result. Only the domestic test type table applies.
    #[must_use]
    pub fn for_test_v2(result: &TestResult2, config: &AppConfig) -> Self {
        Self {
            test_type: resolve(&config.nl_test_types, Some(&result.test_type)),
            unique: result.unique.clone(),
            ..Self::default()
        }
    }
}

impl VaccinationEventDetails {
    /// Details of a vaccination event.
    #[must_use]
    pub fn for_vaccination(event: &VaccinationEvent, config: &AppConfig) -> Self {
        let vaccination = event.vaccination.as_ref();
        let hpk_code = resolve(
            &config.hpk_codes,
            vaccination.and_then(|v| v.hpk_code.as_deref()),
        );
        let brand = resolve(
            &config.eu_brands,
            vaccination.and_then(|v| v.brand.as_deref()),
        );
        let vaccine = if hpk_code.is_empty() { brand } else { hpk_code };

        Self {
            vaccine,
            vaccine_type: resolve(
                &config.eu_vaccinations,
                vaccination.and_then(|v| v.vaccine_type.as_deref()),
            ),
            manufacturer: resolve(
                &config.eu_manufacturers,
                vaccination.and_then(|v| v.manufacturer.as_deref()),
            ),
            doses: vaccination
                .and_then(|v| Some((v.dose_number.clone()?, v.total_doses.clone()?))),
            date: vaccination
                .and_then(|v| v.date)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            country: vaccination
                .and_then(|v| v.country.clone())
                .unwrap_or_default(),
            unique: event.unique.clone().unwrap_or_default(),
        }
    }
}
