//! JSON Schema compilation and validation for manifest documents.
//!
//! Schemas ship inside the binary. Each one is parsed once, its
//! `schema_version` const is checked against the versions this build
//! understands, and a compiled validator is handed back to the caller.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::BTreeSet;

/// Result of loading and compiling a JSON Schema.
pub(crate) struct SchemaLoadResult {
    pub schema_version: String,
    pub compiled: JSONSchema,
}

/// Controls how embedded schemas are checked before compilation.
pub(crate) struct SchemaLoadOptions<'a> {
    /// Where to find the schema_version const inside the schema payload.
    pub schema_version_pointer: &'a str,
    /// Allowed schema_version values; enforced when present.
    pub allowed_versions: Option<&'a BTreeSet<String>>,
}

impl<'a> Default for SchemaLoadOptions<'a> {
    fn default() -> Self {
        Self {
            schema_version_pointer: "/properties/schema_version/const",
            allowed_versions: None,
        }
    }
}

/// Compile `schema`, labelled `label` in errors.
pub(crate) fn load_json_schema(
    schema: &'static Value,
    label: &str,
    options: SchemaLoadOptions<'_>,
) -> Result<SchemaLoadResult> {
    let schema_version = extract_schema_version(schema, options.schema_version_pointer)
        .ok_or_else(|| anyhow!("schema {label} missing schema_version const"))?;

    if let Some(allowed) = options.allowed_versions {
        if !allowed.contains(&schema_version) {
            bail!(
                "schema_version '{}' not in allowed set {:?}",
                schema_version,
                allowed
            );
        }
    }

    let compiled =
        JSONSchema::compile(schema).with_context(|| format!("compiling schema {label}"))?;

    Ok(SchemaLoadResult {
        schema_version,
        compiled,
    })
}

/// Validate `instance`, folding every schema violation into one error.
pub(crate) fn validate_instance(
    schema: &SchemaLoadResult,
    instance: &Value,
    label: &str,
) -> Result<()> {
    if let Err(errors) = schema.compiled.validate(instance) {
        let details = errors
            .map(|err| format!("{} (at {})", err, err.instance_path))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("{label} failed schema validation:\n{details}");
    }
    Ok(())
}

fn extract_schema_version(schema: &Value, pointer: &str) -> Option<String> {
    let version = schema.pointer(pointer).and_then(Value::as_str)?;
    if version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Some(version.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::OnceLock;

    fn fixture_schema() -> &'static Value {
        static SCHEMA: OnceLock<Value> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            json!({
                "type": "object",
                "required": ["schema_version"],
                "properties": {
                    "schema_version": {"type": "string", "const": "fixture_v1"}
                }
            })
        })
    }

    #[test]
    fn compiles_and_reports_version() {
        let loaded = load_json_schema(fixture_schema(), "fixture", SchemaLoadOptions::default())
            .expect("schema compiles");
        assert_eq!(loaded.schema_version, "fixture_v1");
        assert!(validate_instance(&loaded, &json!({"schema_version": "fixture_v1"}), "doc").is_ok());
        let err = validate_instance(&loaded, &json!({"schema_version": "other"}), "doc")
            .unwrap_err()
            .to_string();
        assert!(err.contains("doc failed schema validation"), "{err}");
    }

    #[test]
    fn rejects_versions_outside_the_allowed_set() {
        let allowed = BTreeSet::from(["fixture_v2".to_string()]);
        let result = load_json_schema(
            fixture_schema(),
            "fixture",
            SchemaLoadOptions {
                allowed_versions: Some(&allowed),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }
}
