//! Extension rules

use crate::compat::handlers::{RuleInput, field_owner, is_range_covered};
use crate::compat::index::Decl;
use crate::compat::types::RuleResult;

pub fn check_extension_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(extension) = input.removed(Decl::as_field)? else {
        return Ok(Vec::new());
    };
    let Some(old) = input.old_entry() else {
        return Ok(Vec::new());
    };
    input.report(format!(
        "Previously present extension \"{}\" with name \"{}\" on message \"{}\" was deleted.",
        extension.number,
        extension.name,
        field_owner(old, extension)
    ))
}

/// Extension ranges a message declared must stay available to extenders.
pub fn check_extension_message_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_message)? else {
        return Ok(Vec::new());
    };
    Ok(old
        .extension_ranges
        .iter()
        .filter(|range| !is_range_covered(range, &new.extension_ranges))
        .map(|range| {
            input.finding(format!(
                "Previously present extension range \"{range}\" on message \"{}\" was deleted.",
                new.full_name
            ))
        })
        .collect())
}
