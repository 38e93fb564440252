//! Input validation for experiment creation and updates.
//!
//! All checks run before any row is written; failures surface as
//! `EngineError::Validation`.

use crate::error::EngineError;
use crate::model::{NewExperiment, UpdateExperiment};

const MIN_VARIANTS: usize = 2;
const MAX_VARIANTS: usize = 10;
const MAX_NAME_LEN: usize = 200;
const MAX_VARIANT_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Validates a create-experiment input.
///
/// # Errors
/// Returns `EngineError::Validation` when the name is empty or too long,
/// the variant count is out of range, the traffic split length does not
/// match the variant count, or the split does not sum to exactly 100.
pub fn validate_new_experiment(input: &NewExperiment) -> Result<(), EngineError> {
    if input.name.is_empty() || input.name.len() > MAX_NAME_LEN {
        return Err(EngineError::validation(format!(
            "experiment name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    if input.description.len() > MAX_DESCRIPTION_LEN {
        return Err(EngineError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if input.variants.len() < MIN_VARIANTS || input.variants.len() > MAX_VARIANTS {
        return Err(EngineError::validation(format!(
            "experiments need {MIN_VARIANTS}-{MAX_VARIANTS} variants, got {}",
            input.variants.len()
        )));
    }
    for variant in &input.variants {
        if variant.name.is_empty() || variant.name.len() > MAX_VARIANT_NAME_LEN {
            return Err(EngineError::validation(format!(
                "variant name must be 1-{MAX_VARIANT_NAME_LEN} characters"
            )));
        }
    }
    if input.traffic_split.len() != input.variants.len() {
        return Err(EngineError::validation(
            "traffic split must have the same length as variants",
        ));
    }
    // Percentages are u8, so the 0..=100 per-entry bound only needs the
    // upper check.
    if input.traffic_split.iter().any(|&pct| pct > 100) {
        return Err(EngineError::validation(
            "traffic percentages must be between 0 and 100",
        ));
    }
    let total: u32 = input.traffic_split.iter().map(|&pct| u32::from(pct)).sum();
    if total != 100 {
        return Err(EngineError::validation(format!(
            "traffic split must sum to 100, got {total}"
        )));
    }

    Ok(())
}

/// Validates a partial experiment update.
///
/// # Errors
/// Returns `EngineError::Validation` when a provided field is out of range.
pub fn validate_update_experiment(input: &UpdateExperiment) -> Result<(), EngineError> {
    if let Some(name) = &input.name {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(EngineError::validation(format!(
                "experiment name must be 1-{MAX_NAME_LEN} characters"
            )));
        }
    }
    if let Some(description) = &input.description {
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(EngineError::validation(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewVariant;

    fn valid_input() -> NewExperiment {
        NewExperiment {
            name: "Homepage Hero Test".to_string(),
            description: "Hero messaging comparison".to_string(),
            variants: vec![
                NewVariant {
                    name: "control".to_string(),
                    description: String::new(),
                },
                NewVariant {
                    name: "variant_a".to_string(),
                    description: String::new(),
                },
            ],
            traffic_split: vec![50, 50],
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate_new_experiment(&valid_input()).is_ok());
    }

    #[test]
    fn test_split_must_sum_to_100() {
        let mut input = valid_input();
        input.traffic_split = vec![50, 40];
        let err = validate_new_experiment(&input).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("sum to 100"));
    }

    #[test]
    fn test_split_length_must_match_variants() {
        let mut input = valid_input();
        input.traffic_split = vec![100];
        assert!(matches!(
            validate_new_experiment(&input),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_requires_at_least_two_variants() {
        let mut input = valid_input();
        input.variants.truncate(1);
        input.traffic_split = vec![100];
        assert!(matches!(
            validate_new_experiment(&input),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_empty_names() {
        let mut input = valid_input();
        input.name.clear();
        assert!(validate_new_experiment(&input).is_err());

        let mut input = valid_input();
        input.variants[0].name.clear();
        assert!(validate_new_experiment(&input).is_err());
    }

    #[test]
    fn test_update_rejects_oversized_name() {
        let input = UpdateExperiment {
            name: Some("x".repeat(201)),
            ..UpdateExperiment::default()
        };
        assert!(validate_update_experiment(&input).is_err());
    }

    #[test]
    fn test_update_allows_empty_patch() {
        assert!(validate_update_experiment(&UpdateExperiment::default()).is_ok());
    }
}
