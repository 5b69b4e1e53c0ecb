//! Identity-Indirect Resolver - fields naming the actor behind an event
//!
//! Two sub-modes:
//! - **Match**: look identities up by one attribute, then project each
//!   match onto event columns (`actor_id`, `actor_login`). Inclusion is
//!   OR'd across the projected columns, exclusion is AND'd.
//! - **ExtractRole**: test the event's own role list; no lookup.

use crate::accumulator::TermGroup;
use crate::predicate::Predicate;
use crate::registry::{IdentityResolution, Projection};
use std::collections::HashSet;
use tracing::trace;
use trail_foundation::{Error, Identity, IdentityAttribute, IdentityDirectory, Literal, Result};

pub fn resolve(
    resolution: &IdentityResolution,
    group: &TermGroup,
    directories: &[&dyn IdentityDirectory],
) -> Result<Predicate> {
    match resolution {
        IdentityResolution::Match {
            attribute,
            in_table,
        } => resolve_match(*attribute, in_table, group, directories),
        IdentityResolution::ExtractRole { column } => Ok(resolve_roles(column, group)),
    }
}

fn resolve_match(
    attribute: IdentityAttribute,
    in_table: &[Projection],
    group: &TermGroup,
    directories: &[&dyn IdentityDirectory],
) -> Result<Predicate> {
    let mut parts = Vec::with_capacity(2);

    if !group.included.is_empty() {
        let matched = lookup_all(directories, attribute, &group.included)?;
        // Matching any one alias of the identity is enough
        parts.push(Predicate::or(in_table.iter().map(|projection| {
            Predicate::is_in(&projection.column, project(&matched, projection))
        })));
    }

    if !group.excluded.is_empty() {
        let matched = lookup_all(directories, attribute, &group.excluded)?;
        // An excluded identity must miss every alias
        parts.push(Predicate::and(in_table.iter().map(|projection| {
            Predicate::null_safe_not_in(&projection.column, project(&matched, projection))
        })));
    }

    Ok(Predicate::and(parts))
}

fn resolve_roles(column: &str, group: &TermGroup) -> Predicate {
    let included = Predicate::or(
        group
            .included
            .iter()
            .map(|role| Predicate::has_role(column, role)),
    );
    let excluded = Predicate::and(
        group
            .excluded
            .iter()
            .map(|role| Predicate::not(Predicate::has_role(column, role))),
    );

    if group.included.is_empty() {
        excluded
    } else {
        Predicate::and([included, excluded])
    }
}

/// Query every directory and merge, dropping duplicate `(id, login)` pairs
fn lookup_all(
    directories: &[&dyn IdentityDirectory],
    attribute: IdentityAttribute,
    values: &[String],
) -> Result<Vec<Identity>> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for directory in directories {
        let found = directory
            .find_identities(attribute, values)
            .map_err(|e| match e {
                Error::LookupFailed { .. } => e,
                other => Error::lookup_failed(directory.name(), other),
            })?;

        trace!(
            directory = %directory.name(),
            attribute = %attribute,
            values = values.len(),
            matched = found.len(),
            "Identity lookup"
        );

        for identity in found {
            if seen.insert((identity.id, identity.login.clone())) {
                merged.push(identity);
            }
        }
    }

    Ok(merged)
}

/// Distinct values of one projected column, in identity order
fn project(identities: &[Identity], projection: &Projection) -> Vec<Literal> {
    let mut values: Vec<Literal> = Vec::with_capacity(identities.len());
    for identity in identities {
        let value = identity.attribute(projection.attribute);
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}
