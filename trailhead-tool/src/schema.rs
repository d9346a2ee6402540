//! JSON Schema validation, used to check a tool call's input and (if
//! declared) output (spec §4.3 steps 1 and 3).
//!
//! Grounded on `siumai_extras::schema::validate_json`'s use of the
//! `jsonschema` crate's `validator_for` + `iter_errors` pair.

use trailhead_core::TrailheadError;

/// Compile `schema` and validate `instance` against it, returning a
/// [`TrailheadError::SchemaViolation`] naming `context` (the tool id or
/// step id) on failure. A non-object schema (e.g. `{}`, meaning "anything
/// goes") always passes.
pub fn validate(context: &str, schema: &serde_json::Value, instance: &serde_json::Value) -> Result<(), TrailheadError> {
    if !schema.is_object() {
        return Ok(());
    }

    let compiled = jsonschema::validator_for(schema).map_err(|e| TrailheadError::SchemaViolation {
        context: context.to_string(),
        message: format!("invalid schema: {e}"),
    })?;

    if compiled.is_valid(instance) {
        return Ok(());
    }

    let mut messages = Vec::new();
    for err in compiled.iter_errors(instance) {
        messages.push(format!("{err} at {}", err.instance_path));
        if messages.len() >= 5 {
            break;
        }
    }
    Err(TrailheadError::SchemaViolation {
        context: context.to_string(),
        message: messages.join("; "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_input() {
        let schema = serde_json::json!({"type": "object", "required": ["a"]});
        let instance = serde_json::json!({"a": 1});
        assert!(validate("t", &schema, &instance).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = serde_json::json!({"type": "object", "required": ["a"]});
        let instance = serde_json::json!({});
        let err = validate("t", &schema, &instance).unwrap_err();
        assert!(matches!(err, TrailheadError::SchemaViolation { context, .. } if context == "t"));
    }

    #[test]
    fn non_object_schema_always_passes() {
        let schema = serde_json::json!(true);
        assert!(validate("t", &schema, &serde_json::json!("anything")).is_ok());
    }
}
