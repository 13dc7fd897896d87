//! Random instance generation.
//!
//! Produces valid instances for tests and benchmarks from a seeded RNG:
//! same seed, same instance. Draws are uniform; distribution shaping is the
//! caller's concern. Generated recurrence parameters always satisfy the
//! validator (frequencies at least `2 * tolerance + 1`, occurrences fitted
//! to the horizon), and operators cover the whole day.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{DayRoster, Instance, Operator, Patient, Protocol, ProtocolService, Service};

/// Knobs for [`generate_instance`]. Ranges are inclusive.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of days, indexed `0..days`.
    pub days: i64,
    /// Number of care units.
    pub care_units: usize,
    /// Operators per care unit per day.
    pub operators_per_care_unit: usize,
    /// Slots per day; every operator covers all of them.
    pub slots_per_day: i64,
    /// Number of services, spread over the care units round-robin.
    pub services: usize,
    /// Service duration range.
    pub service_duration: (i64, i64),
    /// Number of patients.
    pub patients: usize,
    /// Protocol entries per patient.
    pub entries_per_patient: usize,
    /// Tolerance range for protocol entries.
    pub tolerance: (i64, i64),
    /// Patient priority range; `None` = uniform priorities left unset.
    pub priority: Option<(i64, i64)>,
    /// RNG seed.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            days: 7,
            care_units: 2,
            operators_per_care_unit: 2,
            slots_per_day: 12,
            services: 4,
            service_duration: (1, 4),
            patients: 6,
            entries_per_patient: 2,
            tolerance: (0, 1),
            priority: Some((1, 3)),
            seed: 42,
        }
    }
}

/// Generates a random instance from the config.
pub fn generate_instance(config: &GeneratorConfig) -> Instance {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut instance = Instance::new();
    let max_day = config.days - 1;

    for index in 0..config.services {
        let care_unit = index % config.care_units.max(1);
        instance.services.insert(
            format!("srv{index:02}"),
            Service::new(
                format!("cu{care_unit:02}"),
                rng.random_range(config.service_duration.0..=config.service_duration.1),
            ),
        );
    }

    for day in 0..config.days {
        let mut roster = DayRoster::new();
        for cu in 0..config.care_units {
            let operators = roster.entry(format!("cu{cu:02}")).or_default();
            for op in 0..config.operators_per_care_unit {
                operators.insert(format!("op{op:02}"), Operator::new(0, config.slots_per_day));
            }
        }
        instance.days.insert(day, roster);
    }

    for index in 0..config.patients {
        let mut patient = Patient::new();
        if let Some((lo, hi)) = config.priority {
            patient = patient.with_priority(rng.random_range(lo..=hi));
        }

        let mut protocol = Protocol::new(0);
        for _ in 0..config.entries_per_patient {
            protocol = protocol.with_service(random_entry(&mut rng, config, max_day));
        }
        instance
            .patients
            .insert(format!("pat{index:02}"), patient.with_protocol("prot00", protocol));
    }

    instance
}

/// Draws one protocol entry whose occurrences all fit the horizon.
fn random_entry(rng: &mut StdRng, config: &GeneratorConfig, max_day: i64) -> ProtocolService {
    let service = rng.random_range(0..config.services);
    let tolerance = rng
        .random_range(config.tolerance.0..=config.tolerance.1)
        .min(max_day / 2);
    // At least 2·tolerance + 1 keeps windows of one request disjoint.
    let frequency = rng.random_range(2 * tolerance + 1..=(2 * tolerance + 1).max(max_day.max(1)));
    let start = rng.random_range(tolerance..=(max_day - tolerance).max(tolerance));
    let max_times = 1 + (max_day + tolerance - start).max(0) / frequency;
    let times = rng.random_range(1..=max_times);

    ProtocolService::new(format!("srv{service:02}"), start, tolerance, frequency, times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_instance;

    #[test]
    fn test_generated_instance_is_valid() {
        for seed in [1, 7, 42, 1000] {
            let config = GeneratorConfig {
                seed,
                ..GeneratorConfig::default()
            };
            let instance = generate_instance(&config);
            assert_eq!(
                validate_instance(&instance).map_err(|e| e.to_string()),
                Ok(()),
                "seed {seed}"
            );
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = GeneratorConfig::default();
        let a = generate_instance(&config);
        let b = generate_instance(&config);
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_dimensions_match_config() {
        let config = GeneratorConfig {
            days: 5,
            care_units: 3,
            operators_per_care_unit: 2,
            services: 6,
            patients: 4,
            ..GeneratorConfig::default()
        };
        let instance = generate_instance(&config);
        assert_eq!(instance.days.len(), 5);
        assert_eq!(instance.services.len(), 6);
        assert_eq!(instance.patients.len(), 4);
        assert_eq!(instance.care_unit_names().len(), 3);
        let roster = instance.roster(0).unwrap();
        assert_eq!(roster["cu00"].len(), 2);
    }
}
