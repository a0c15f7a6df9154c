//! Reserved range and name rules
//!
//! Releasing a reservation breaks generated code that relied on it; reusing
//! one breaks readers of old data.

use crate::canonical::NumberRange;
use crate::compat::handlers::{RuleInput, is_range_covered};
use crate::compat::index::Decl;
use crate::compat::types::{Finding, RuleResult};

fn released(
    input: &RuleInput<'_, '_>,
    scope: &str,
    old: (&[NumberRange], &[String]),
    new: (&[NumberRange], &[String]),
) -> Vec<Finding> {
    let ranges = old
        .0
        .iter()
        .filter(|range| !is_range_covered(range, new.0))
        .map(|range| {
            input.finding(format!(
                "Previously present reserved range \"{range}\" on {scope} was deleted."
            ))
        });
    let names = old
        .1
        .iter()
        .filter(|name| !new.1.contains(name))
        .map(|name| {
            input.finding(format!(
                "Previously present reserved name \"{name}\" on {scope} was deleted."
            ))
        });
    ranges.chain(names).collect()
}

pub fn check_reserved_message_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_message)? else {
        return Ok(Vec::new());
    };
    Ok(released(
        input,
        &format!("message \"{}\"", new.full_name),
        (&old.reserved_ranges, &old.reserved_names),
        (&new.reserved_ranges, &new.reserved_names),
    ))
}

pub fn check_reserved_enum_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_enum)? else {
        return Ok(Vec::new());
    };
    Ok(released(
        input,
        &format!("enum \"{}\"", new.full_name),
        (&old.reserved_ranges, &old.reserved_names),
        (&new.reserved_ranges, &new.reserved_names),
    ))
}

/// An added field takes a number or name the previous message reserved.
pub fn check_field_no_reuse_reserved(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(field) = input.added(Decl::as_field)? else {
        return Ok(Vec::new());
    };
    let Some(parent) = input.new_entry().and_then(|e| e.parent_message()) else {
        return Err(input.unexpected_shape());
    };
    let Some(previous) = input.old.message(&parent.full_name) else {
        return Ok(Vec::new());
    };
    let mut findings = Vec::new();
    if previous.is_number_reserved(field.number) {
        findings.push(input.finding(format!(
            "Field \"{}\" with name \"{}\" on message \"{}\" reuses number \"{}\" which was previously reserved.",
            field.number, field.name, parent.full_name, field.number
        )));
    }
    if previous.is_name_reserved(&field.name) {
        findings.push(input.finding(format!(
            "Field \"{}\" with name \"{}\" on message \"{}\" reuses name \"{}\" which was previously reserved.",
            field.number, field.name, parent.full_name, field.name
        )));
    }
    Ok(findings)
}

/// An added enum value takes a number or name the previous enum reserved.
pub fn check_enum_value_no_reuse_reserved(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(value) = input.added(Decl::as_enum_value)? else {
        return Ok(Vec::new());
    };
    let Some(parent) = input.new_entry().and_then(|e| e.parent_enum()) else {
        return Err(input.unexpected_shape());
    };
    let Some(previous) = input.old.enumeration(&parent.full_name) else {
        return Ok(Vec::new());
    };
    let mut findings = Vec::new();
    if previous.is_number_reserved(value.number) {
        findings.push(input.finding(format!(
            "Enum value \"{}\" with name \"{}\" on enum \"{}\" reuses number \"{}\" which was previously reserved.",
            value.number, value.name, parent.full_name, value.number
        )));
    }
    for name in parent.names_for(value.number) {
        if previous.is_name_reserved(name) {
            findings.push(input.finding(format!(
                "Enum value \"{}\" with name \"{}\" on enum \"{}\" reuses name \"{}\" which was previously reserved.",
                value.number, name, parent.full_name, name
            )));
        }
    }
    Ok(findings)
}
