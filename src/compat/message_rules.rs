//! Message rules

use crate::compat::handlers::{RuleInput, scope_description};
use crate::compat::index::Decl;
use crate::compat::types::RuleResult;

pub fn check_message_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(message) = input.removed(Decl::as_message)? else {
        return Ok(Vec::new());
    };
    // Map entries disappear with their map field, which is reported there.
    if message.map_entry {
        return Ok(Vec::new());
    }
    let Some(old) = input.old_entry() else {
        return Ok(Vec::new());
    };
    input.report(format!(
        "Previously present message \"{}\" was deleted from {}.",
        message.full_name,
        scope_description(old)
    ))
}

pub fn check_message_same_message_set_wire_format(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_message)? else {
        return Ok(Vec::new());
    };
    if old.message_set_wire_format == new.message_set_wire_format {
        return Ok(Vec::new());
    }
    input.report(format!(
        "Message \"{}\" option \"message_set_wire_format\" changed from \"{}\" to \"{}\".",
        new.full_name, old.message_set_wire_format, new.message_set_wire_format
    ))
}

pub fn check_message_no_remove_standard_descriptor_accessor(
    input: &RuleInput<'_, '_>,
) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_message)? else {
        return Ok(Vec::new());
    };
    if old.no_standard_descriptor_accessor || !new.no_standard_descriptor_accessor {
        return Ok(Vec::new());
    }
    input.report(format!(
        "Message \"{}\" option \"no_standard_descriptor_accessor\" changed from \"false\" to \"true\".",
        new.full_name
    ))
}

pub fn check_oneof_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(oneof) = input.removed(Decl::as_oneof)? else {
        return Ok(Vec::new());
    };
    let Some(message) = input.old_entry().and_then(|e| e.parent_message()) else {
        return Err(input.unexpected_shape());
    };
    input.report(format!(
        "Previously present oneof \"{}\" on message \"{}\" was deleted.",
        oneof.name, message.full_name
    ))
}
