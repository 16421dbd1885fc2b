use serde_json::Value;

use super::{SchemaViolation, ViolationKind};

/// JSON-Schema validation engine.
pub trait Validator: Send + Sync {
    /// Validates `json` against `schema`.
    ///
    /// `on_error` is consulted for every violation found; returning `false`
    /// downgrades it to non-fatal. The first fatal violation is returned.
    fn validate(
        &self,
        json: &Value,
        schema: &Value,
        on_error: &dyn Fn(&SchemaViolation) -> bool,
    ) -> Result<(), SchemaViolation>;
}

/// Validator that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(
        &self,
        _json: &Value,
        _schema: &Value,
        _on_error: &dyn Fn(&SchemaViolation) -> bool,
    ) -> Result<(), SchemaViolation> {
        Ok(())
    }
}

/// Drops the top-level `required` list, for partial models.
pub fn relax_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    if let Value::Object(map) = &mut schema {
        map.remove("required");
    }
    schema
}

/// Whether a violation is ignored under lenient validation.
///
/// Lenient validation tolerates string length limits and numbers stored as
/// strings in form date fields.
pub fn is_suppressed(violation: &SchemaViolation, lenient: bool) -> bool {
    if !lenient {
        return false;
    }
    match violation.kind {
        ViolationKind::MinLength | ViolationKind::MaxLength => true,
        ViolationKind::ExpectedNumber => violation.field.contains(".form.fields."),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relax_schema_drops_required() {
        let schema = json!({"type": "object", "required": ["name"], "properties": {}});

        assert_eq!(
            relax_schema(&schema),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_lenient_suppresses_lengths() {
        let short = SchemaViolation::new("name", ViolationKind::MinLength, "too short");

        assert!(is_suppressed(&short, true));
        assert!(!is_suppressed(&short, false));
    }

    #[test]
    fn test_lenient_suppresses_form_date_numbers_only() {
        let date = SchemaViolation::new(
            "data.form.fields.start.min",
            ViolationKind::ExpectedNumber,
            "Expected a number",
        );
        let other = SchemaViolation::new("age", ViolationKind::ExpectedNumber, "Expected a number");

        assert!(is_suppressed(&date, true));
        assert!(!is_suppressed(&other, true));
        assert!(!is_suppressed(&date, false));
    }

    #[test]
    fn test_noop_validator_accepts() {
        let result = NoopValidator.validate(&json!({}), &json!({"required": ["a"]}), &|_| true);

        assert!(result.is_ok());
    }
}
