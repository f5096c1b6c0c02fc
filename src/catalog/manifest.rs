//! Capability manifests: JSON documents that declare extra types and
//! field-only capability sets without writing Rust.
//!
//! Manifests are validated against `schema/extend_manifest.schema.json`
//! before they are deserialized, and the schema version is checked so a
//! newer manifest format is never applied by an older build.

use crate::catalog::identity::TypeName;
use crate::catalog::model::CapabilitySet;
use crate::schema_loader::{SchemaLoadOptions, load_json_schema, validate_instance};
use crate::value::Value;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

pub const MANIFEST_SCHEMA_VERSION: &str = "extend_manifest_v1";

const MANIFEST_SCHEMA_SOURCE: &str = include_str!("../../schema/extend_manifest.schema.json");

/// Parsed capability manifest.
#[derive(Clone, Debug, Deserialize)]
pub struct CapabilityManifest {
    pub schema_version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
    #[serde(default)]
    pub capabilities: BTreeMap<TypeName, BTreeMap<String, Json>>,
}

/// A type and its direct parent (`Object` when omitted).
#[derive(Clone, Debug, Deserialize)]
pub struct TypeDeclaration {
    pub name: TypeName,
    #[serde(default)]
    pub parent: Option<TypeName>,
}

impl CapabilityManifest {
    /// One field-only capability set per type named in `capabilities`.
    pub fn capability_sets(&self) -> Vec<(TypeName, CapabilitySet)> {
        self.capabilities
            .iter()
            .map(|(type_name, fields)| {
                let set = fields
                    .iter()
                    .fold(CapabilitySet::new(), |set, (name, value)| {
                        set.field(name.clone(), Value::from_json(value))
                    });
                (type_name.clone(), set)
            })
            .collect()
    }
}

/// Read, validate and parse a manifest from disk.
pub fn load_manifest_from_path(path: &Path) -> Result<CapabilityManifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    parse_manifest(&raw, &path.display().to_string())
}

/// Validate and parse manifest text; `label` names the source in errors.
pub fn parse_manifest(raw: &str, label: &str) -> Result<CapabilityManifest> {
    let value: Json =
        serde_json::from_str(raw).with_context(|| format!("parsing manifest {label}"))?;

    let version = value
        .get("schema_version")
        .and_then(Json::as_str)
        .unwrap_or_default();
    validate_schema_version(version)?;

    let allowed = allowed_schema_versions();
    let schema = load_json_schema(
        manifest_schema()?,
        "extend_manifest.schema.json",
        SchemaLoadOptions {
            allowed_versions: Some(&allowed),
            ..Default::default()
        },
    )?;
    validate_instance(&schema, &value, &format!("manifest {label}"))?;
    debug!(label, schema_version = %schema.schema_version, "manifest passed schema validation");

    let manifest: CapabilityManifest = serde_json::from_value(value)
        .with_context(|| format!("decoding manifest {label}"))?;
    validate_declarations(&manifest.types)?;
    Ok(manifest)
}

fn manifest_schema() -> Result<&'static Json> {
    static SCHEMA: OnceLock<Option<Json>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| serde_json::from_str(MANIFEST_SCHEMA_SOURCE).ok())
        .as_ref()
        .context("embedded manifest schema is not valid JSON")
}

fn allowed_schema_versions() -> BTreeSet<String> {
    BTreeSet::from_iter([MANIFEST_SCHEMA_VERSION.to_string()])
}

fn validate_schema_version(schema_version: &str) -> Result<()> {
    if schema_version.is_empty() {
        bail!("schema_version must not be empty");
    }

    let allowed = allowed_schema_versions();
    if !allowed.contains(schema_version) {
        bail!(
            "schema_version '{}' not in allowed set {:?}",
            schema_version,
            allowed
        );
    }

    Ok(())
}

fn validate_declarations(types: &[TypeDeclaration]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for decl in types {
        if !seen.insert(decl.name.as_str()) {
            bail!("duplicate type declaration {}", decl.name);
        }
        if decl.parent.as_ref() == Some(&decl.name) {
            bail!("type {} cannot be its own parent", decl.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::Capability;

    #[test]
    fn parses_types_and_field_sets() {
        let manifest = parse_manifest(
            r#"{
                "schema_version": "extend_manifest_v1",
                "types": [{"name": "Dog", "parent": "Animal"}, {"name": "Animal"}],
                "capabilities": {"Dog": {"sound": "woof", "legs": 4}}
            }"#,
            "inline",
        )
        .expect("manifest parses");
        assert_eq!(manifest.types.len(), 2);
        assert_eq!(manifest.types[0].parent, Some(TypeName::from("Animal")));

        let sets = manifest.capability_sets();
        assert_eq!(sets.len(), 1);
        let (name, set) = &sets[0];
        assert_eq!(name, "Dog");
        assert!(matches!(set.get("legs"), Some(Capability::Field(v)) if *v == Value::from(4)));
    }

    #[test]
    fn rejects_unknown_schema_versions() {
        let err = parse_manifest(r#"{"schema_version": "extend_manifest_v9"}"#, "inline")
            .unwrap_err()
            .to_string();
        assert!(err.contains("not in allowed set"), "{err}");
    }

    #[test]
    fn rejects_malformed_type_names() {
        let result = parse_manifest(
            r#"{"schema_version": "extend_manifest_v1", "types": [{"name": "not a type"}]}"#,
            "inline",
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_and_self_parented_declarations() {
        let duplicate = parse_manifest(
            r#"{"schema_version": "extend_manifest_v1", "types": [{"name": "A"}, {"name": "A"}]}"#,
            "inline",
        );
        assert!(duplicate.is_err());

        let self_parent = parse_manifest(
            r#"{"schema_version": "extend_manifest_v1", "types": [{"name": "A", "parent": "A"}]}"#,
            "inline",
        );
        assert!(self_parent.is_err());
    }

    #[test]
    fn embedded_schema_is_valid_json() {
        assert!(manifest_schema().is_ok());
    }
}
