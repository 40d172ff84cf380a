//! Config validation
//!
//! Rules:
//! - at least one publisher, names non-empty (derived `Validate`)
//! - publisher names unique
//! - rate_hz > 0 and finite
//! - transport targets complete
//! - class selection needs a labels file

use std::collections::HashSet;

use contracts::{ContractError, PipelineBlueprint, TransportConfig};
use ::validator::Validate;

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_derived(blueprint)?;
    validate_publisher_names(blueprint)?;
    validate_rates(blueprint)?;
    validate_transports(blueprint)?;
    validate_classes(blueprint)?;
    Ok(())
}

/// Field-level rules declared on the contract types
fn validate_derived(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("publishers", e.to_string()))
}

/// Publisher names must be unique
fn validate_publisher_names(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for publisher in &blueprint.publishers {
        if !seen.insert(publisher.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("publishers[name={}]", publisher.name),
                "duplicate publisher name",
            ));
        }
    }
    Ok(())
}

/// NaN and infinity slip through range checks
fn validate_rates(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    for publisher in &blueprint.publishers {
        if !publisher.rate_hz.is_finite() || publisher.rate_hz <= 0.0 {
            return Err(ContractError::config_validation(
                format!("publishers[{}].rate_hz", publisher.name),
                format!("rate_hz must be > 0, got {}", publisher.rate_hz),
            ));
        }
    }
    Ok(())
}

fn validate_transports(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    for publisher in &blueprint.publishers {
        let field = format!("publishers[{}].transport", publisher.name);
        match &publisher.transport {
            TransportConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ContractError::config_validation(
                        field,
                        "file path cannot be empty",
                    ));
                }
            }
            TransportConfig::Udp { host, port, .. } => {
                if host.trim().is_empty() {
                    return Err(ContractError::config_validation(
                        field,
                        "udp host cannot be empty",
                    ));
                }
                if *port == 0 {
                    return Err(ContractError::config_validation(
                        field,
                        "udp port must be non-zero",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn validate_classes(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let classes = &blueprint.classes;
    let has_selection = classes
        .selected
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());

    if has_selection && classes.labels_path.is_none() {
        return Err(ContractError::config_validation(
            "classes.selected",
            "class selection requires classes.labels_path",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_blueprint() -> PipelineBlueprint {
        PipelineBlueprint::default_wiring()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_no_publishers() {
        let mut bp = minimal_blueprint();
        bp.publishers.clear();
        let result = validate(&bp);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ContractError::ConfigValidation { .. }
        ));
    }

    #[test]
    fn test_duplicate_publisher_name() {
        let mut bp = minimal_blueprint();
        bp.publishers.push(bp.publishers[0].clone());
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate publisher name"), "got: {err}");
    }

    #[test]
    fn test_invalid_rate() {
        let mut bp = minimal_blueprint();
        bp.publishers[1].rate_hz = -1.0;
        let result = validate(&bp);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_nan_rate() {
        let mut bp = minimal_blueprint();
        bp.publishers[0].rate_hz = f64::NAN;
        assert!(matches!(
            validate(&bp),
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_empty_publisher_name() {
        let mut bp = minimal_blueprint();
        bp.publishers[0].name = String::new();
        assert!(matches!(
            validate(&bp),
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_zero_udp_port() {
        let mut bp = minimal_blueprint();
        bp.publishers[2].transport = TransportConfig::udp("127.0.0.1", 0);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("port must be non-zero"), "got: {err}");
    }

    #[test]
    fn test_empty_file_path() {
        let mut bp = minimal_blueprint();
        bp.publishers[0].transport = TransportConfig::file("");
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("file path cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_selection_without_labels() {
        let mut bp = minimal_blueprint();
        bp.classes.selected = Some("person,car".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("labels_path"), "got: {err}");
    }
}
