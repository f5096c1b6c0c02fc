//! Composition entry points.
//!
//! `compose` resolves the lineage of a value, looks up the capability set of
//! each type in it, and folds them into nested views: the most general
//! ancestor innermost, the value's own type outermost. Since a layer answers
//! from its own set before delegating inward, the most-derived type wins any
//! name conflict. `compose_as` skips lineage resolution and applies a single
//! named set.

use crate::catalog::identity::{NULL_OBJECT, OBJECT, identify};
use crate::catalog::repository::CapabilityRegistry;
use crate::value::Value;
use crate::view::{Composite, CompositeView, Inner, Subject};
use tracing::{debug, trace};

/// Extend `value` with every capability set registered along its lineage.
///
/// Null-likes come back unchanged, as does any value whose lineage has no
/// registered sets.
pub fn compose<'r>(registry: &'r CapabilityRegistry, value: &Value) -> Composite<'r> {
    if value.is_nil() {
        return Composite::Bare(value.clone());
    }

    let type_name = identify(value);
    if type_name == NULL_OBJECT {
        // No lineage to walk; such objects get the generic object set.
        return compose_as(registry, value, OBJECT);
    }

    let chain = registry.chain_of(value);
    trace!(type_name = %type_name, chain = ?chain.names(), "composing");

    let mut running: Option<CompositeView<'r>> = None;
    for link in &chain {
        let Some((name, set)) = registry.entry(link.as_str()) else {
            continue;
        };
        let target = match running.take() {
            Some(view) => Inner::View(Box::new(view)),
            None => Inner::Subject(Subject::of(value.clone())),
        };
        debug!(layer = %name, members = set.len(), "building capability layer");
        running = Some(CompositeView::build(
            registry,
            target,
            name.clone(),
            set,
            value.clone(),
        ));
    }

    match running {
        Some(view) => Composite::Layered(view),
        None => Composite::Bare(value.clone()),
    }
}

/// Extend `value` with exactly the set registered for `type_name`, ignoring
/// its lineage. An unregistered name leaves the value bare.
pub fn compose_as<'r>(
    registry: &'r CapabilityRegistry,
    value: &Value,
    type_name: &str,
) -> Composite<'r> {
    if value.is_nil() {
        return Composite::Bare(value.clone());
    }

    match registry.entry(type_name) {
        Some((name, set)) => {
            debug!(layer = %name, members = set.len(), "building explicit capability layer");
            Composite::Layered(CompositeView::build(
                registry,
                Inner::Subject(Subject::of(value.clone())),
                name.clone(),
                set,
                value.clone(),
            ))
        }
        None => {
            trace!(type_name, "no capability set registered for explicit type");
            Composite::Bare(value.clone())
        }
    }
}
