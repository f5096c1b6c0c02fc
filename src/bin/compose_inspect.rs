//! Inspect how a value composes against the standard and manifest-supplied
//! capability sets.
//!
//! Decodes `VALUE_JSON` into a runtime value, composes it (or applies a
//! single set with `--as`), and prints a JSON report of the value's type,
//! lineage, the layers that were stacked and the members requested with
//! `--member`. Without `--member`, every capability in effect is reported.

use anyhow::{Context, Result};
use clap::Parser;
use extendkit::{
    CapabilityRegistry, Composite, Member, TypeChain, TypeName, Value, compose, compose_as,
    identify, logging, manifest_paths_from_env, stdext,
};
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "compose-inspect", about = "Report how a JSON value composes")]
struct Cli {
    /// Capability manifest to load; repeatable. Files listed in
    /// EXTENDKIT_MANIFESTS are loaded first.
    #[arg(long = "manifest", value_name = "PATH")]
    manifests: Vec<PathBuf>,

    /// Apply only the set registered for TYPE instead of the full lineage.
    #[arg(long = "as", value_name = "TYPE")]
    as_type: Option<String>,

    /// Member to resolve; repeatable.
    #[arg(long = "member", value_name = "NAME")]
    members: Vec<String>,

    /// Start from an empty registry instead of the standard sets.
    #[arg(long)]
    no_stdext: bool,

    /// Debug logging for this crate (overridden by EXTENDKIT_LOG).
    #[arg(short, long)]
    verbose: bool,

    /// Value to compose, as JSON.
    #[arg(value_name = "VALUE_JSON")]
    value: String,
}

#[derive(Serialize)]
struct Report {
    #[serde(rename = "type")]
    type_name: TypeName,
    chain: TypeChain,
    layers: Vec<TypeName>,
    members: BTreeMap<String, MemberReport>,
}

#[derive(Serialize)]
struct MemberReport {
    origin: Option<TypeName>,
    callable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Json>,
}

impl From<Member<'_>> for MemberReport {
    fn from(member: Member<'_>) -> Self {
        Self {
            origin: member.origin().cloned(),
            callable: member.is_callable(),
            value: member.as_value().map(Value::to_json),
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let registry = build_registry(&cli)?;
    let json: Json = serde_json::from_str(&cli.value).context("failed to parse VALUE_JSON")?;
    let value = Value::from_json(&json);

    let composite = match &cli.as_type {
        Some(type_name) => compose_as(&registry, &value, type_name),
        None => compose(&registry, &value),
    };
    info!(layers = composite.depth(), "composed value");

    let report = build_report(&registry, &composite, &cli.members);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn build_registry(cli: &Cli) -> Result<CapabilityRegistry> {
    let mut registry = if cli.no_stdext {
        CapabilityRegistry::new()
    } else {
        stdext::standard_registry()
    };

    let mut paths = manifest_paths_from_env();
    paths.extend(cli.manifests.iter().cloned());
    for path in &paths {
        debug!(path = %path.display(), "loading manifest");
        registry
            .load_manifest(path)
            .with_context(|| format!("loading manifest {}", path.display()))?;
    }
    Ok(registry)
}

fn build_report(
    registry: &CapabilityRegistry,
    composite: &Composite<'_>,
    requested: &[String],
) -> Report {
    let value = composite.value();
    let names: Vec<String> = if requested.is_empty() {
        composite
            .shadowed()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    } else {
        requested.to_vec()
    };

    let members = names
        .into_iter()
        .map(|name| {
            let member = composite.get(&name);
            (name, MemberReport::from(member))
        })
        .collect();

    Report {
        type_name: identify(value),
        chain: registry.chain_of(value),
        layers: composite.layers(),
        members,
    }
}
