//! Enum and enum value rules
//!
//! Enum values are matched by number. When an enum allows aliases the
//! node carries the first value declared for the number; the other names
//! are read from the enum itself.

use crate::canonical::{Enum, EnumValue};
use crate::compat::handlers::{RuleInput, scope_description};
use crate::compat::index::Decl;
use crate::compat::types::{RuleFault, RuleResult};

pub fn check_enum_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(removed) = input.removed(Decl::as_enum)? else {
        return Ok(Vec::new());
    };
    let Some(old) = input.old_entry() else {
        return Ok(Vec::new());
    };
    input.report(format!(
        "Previously present enum \"{}\" was deleted from {}.",
        removed.full_name,
        scope_description(old)
    ))
}

pub fn check_enum_same_type(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_enum)? else {
        return Ok(Vec::new());
    };
    if old.closed == new.closed {
        return Ok(Vec::new());
    }
    let openness = |e: &Enum| if e.closed { "closed" } else { "open" };
    input.report(format!(
        "Enum \"{}\" changed from {} to {}.",
        new.full_name,
        openness(old),
        openness(new)
    ))
}

/// A removed value with its enum, skipping values whose enum went away.
/// Also reports whether the new enum reserves the number and the name.
fn removed_value<'a>(
    input: &RuleInput<'_, 'a>,
) -> Result<Option<(&'a EnumValue, &'a Enum, bool, bool)>, RuleFault> {
    let Some(value) = input.removed(Decl::as_enum_value)? else {
        return Ok(None);
    };
    let Some(parent) = input.old_entry().and_then(|e| e.parent_enum()) else {
        return Err(input.unexpected_shape());
    };
    let Some(current) = input.new.enumeration(&parent.full_name) else {
        return Ok(None);
    };
    Ok(Some((
        value,
        parent,
        current.is_number_reserved(value.number),
        parent
            .names_for(value.number)
            .all(|name| current.is_name_reserved(name)),
    )))
}

pub fn check_enum_value_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((value, parent, _, _)) = removed_value(input)? else {
        return Ok(Vec::new());
    };
    input.report(format!(
        "Previously present enum value \"{}\" on enum \"{}\" was deleted.",
        value.number, parent.full_name
    ))
}

pub fn check_enum_value_no_delete_unless_number_reserved(input: &RuleInput<'_, '_>) -> RuleResult {
    match removed_value(input)? {
        Some((value, parent, false, _)) => input.report(format!(
            "Previously present enum value \"{}\" on enum \"{}\" was deleted without reserving the number \"{}\".",
            value.number, parent.full_name, value.number
        )),
        _ => Ok(Vec::new()),
    }
}

pub fn check_enum_value_no_delete_unless_name_reserved(input: &RuleInput<'_, '_>) -> RuleResult {
    match removed_value(input)? {
        Some((value, parent, _, false)) => input.report(format!(
            "Previously present enum value \"{}\" on enum \"{}\" was deleted without reserving the name \"{}\".",
            value.number, parent.full_name, value.name
        )),
        _ => Ok(Vec::new()),
    }
}

pub fn check_enum_value_same_name(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_enum_value)? else {
        return Ok(Vec::new());
    };
    let (Some(old_enum), Some(new_enum)) = (
        input.old_entry().and_then(|e| e.parent_enum()),
        input.new_entry().and_then(|e| e.parent_enum()),
    ) else {
        return Err(input.unexpected_shape());
    };
    let old_names: Vec<&str> = old_enum.names_for(old.number).collect();
    let new_names: Vec<&str> = new_enum.names_for(new.number).collect();
    if old_names.iter().all(|n| new_names.contains(n)) {
        return Ok(Vec::new());
    }
    let kept_alias = old_names.iter().any(|n| new_names.contains(n));
    if kept_alias && new_enum.allow_alias && input.policy.enum_alias_leniency() {
        return Ok(Vec::new());
    }
    input.report(format!(
        "Enum value \"{}\" on enum \"{}\" changed name from \"{}\" to \"{}\".",
        new.number,
        new_enum.full_name,
        old_names.join(", "),
        new_names.join(", ")
    ))
}
