//! Request file loading with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::request::DecisionRequest;

const REQUEST_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/decision_request.schema.json"
));

/// Load a request JSON file, validating it against the request schema.
pub fn load_request(path: &Path) -> Result<DecisionRequest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read request {}", path.display()))?;
    parse_request(&contents).with_context(|| format!("load request {}", path.display()))
}

/// Parse and validate a request from JSON text.
pub fn parse_request(contents: &str) -> Result<DecisionRequest> {
    let value: Value = serde_json::from_str(contents).context("parse request json")?;
    validate_request_schema(&value)?;
    serde_json::from_value(value).context("deserialize request")
}

fn validate_request_schema(request: &Value) -> Result<()> {
    let schema_value: Value =
        serde_json::from_str(REQUEST_SCHEMA).context("parse request schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(request) {
        let messages = compiled
            .iter_errors(request)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "request schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies a complete request file loads with defaults for omitted fields.
    #[test]
    fn load_request_from_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("request.json");
        fs::write(
            &path,
            r#"{
  "goal": "Analyze quarterly revenue",
  "context": {"requires_external_data": true},
  "constraints": {"budget": 1500},
  "personality": {"analytical": 0.9}
}
"#,
        )
        .expect("write");

        let request = load_request(&path).expect("load");
        assert_eq!(request.goal, "Analyze quarterly revenue");
        assert_eq!(request.urgency, 0.5);
        assert_eq!(request.budget(), Some(1500.0));
        assert!(request.context_flag("requires_external_data"));
        let personality = request.personality.expect("personality");
        assert_eq!(personality.analytical, 0.9);
        assert_eq!(personality.patience, 0.5);
    }

    #[test]
    fn schema_rejects_out_of_range_urgency() {
        let err = parse_request(r#"{"goal": "plan", "urgency": 1.5}"#).unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn schema_rejects_missing_goal() {
        assert!(parse_request(r#"{"urgency": 0.2}"#).is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_request(&temp.path().join("nope.json")).unwrap_err();
        assert!(format!("{err:#}").contains("nope.json"));
    }
}
