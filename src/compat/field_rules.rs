//! Field rules
//!
//! Fields are matched by number, so every rule here compares two
//! declarations that share a tag. Type and cardinality rules also run on
//! extensions.

use crate::canonical::{Field, Syntax};
use crate::compat::handlers::{
    RuleInput, are_cardinalities_wire_compatible, are_cardinalities_wire_json_compatible,
    are_types_wire_compatible, are_types_wire_json_compatible, cardinality, field_owner,
    is_same_type,
};
use crate::compat::index::Decl;
use crate::compat::types::{RuleFault, RuleResult};

/// Both sides of a matched field with what messages need to describe it.
struct FieldPair<'a> {
    old: &'a Field,
    new: &'a Field,
    old_syntax: Syntax,
    new_syntax: Syntax,
    /// `Field "1" with name "x" on message "pkg.M"`
    subject: String,
    in_map_entry: bool,
}

fn matched_fields<'a>(input: &RuleInput<'_, 'a>) -> Result<Option<FieldPair<'a>>, RuleFault> {
    let Some((old, new)) = input.matched(Decl::as_field)? else {
        return Ok(None);
    };
    let (Some(old_entry), Some(new_entry)) = (input.old_entry(), input.new_entry()) else {
        return Err(input.unexpected_shape());
    };
    let what = if new.extendee.is_some() { "Extension" } else { "Field" };
    Ok(Some(FieldPair {
        old,
        new,
        old_syntax: old_entry.file.syntax,
        new_syntax: new_entry.file.syntax,
        subject: format!(
            "{what} \"{}\" with name \"{}\" on message \"{}\"",
            new.number,
            new.name,
            field_owner(new_entry, new)
        ),
        in_map_entry: old_entry.parent_message().is_some_and(|m| m.map_entry),
    }))
}

// ========================================
// Deletion
// ========================================

/// A removed field together with its message, skipping fields whose whole
/// message went away.
fn removed_field<'a>(
    input: &RuleInput<'_, 'a>,
) -> Result<Option<(&'a Field, String, bool, bool)>, RuleFault> {
    let Some(field) = input.removed(Decl::as_field)? else {
        return Ok(None);
    };
    let Some(parent) = input.old_entry().and_then(|e| e.parent_message()) else {
        return Err(input.unexpected_shape());
    };
    let Some(current) = input.new.message(&parent.full_name) else {
        return Ok(None);
    };
    Ok(Some((
        field,
        parent.full_name.clone(),
        current.is_number_reserved(field.number),
        current.is_name_reserved(&field.name),
    )))
}

pub fn check_field_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((field, message, _, _)) = removed_field(input)? else {
        return Ok(Vec::new());
    };
    input.report(format!(
        "Previously present field \"{}\" with name \"{}\" on message \"{}\" was deleted.",
        field.number, field.name, message
    ))
}

pub fn check_field_no_delete_unless_number_reserved(input: &RuleInput<'_, '_>) -> RuleResult {
    match removed_field(input)? {
        Some((field, message, false, _)) => input.report(format!(
            "Previously present field \"{}\" with name \"{}\" on message \"{}\" was deleted without reserving the number \"{}\".",
            field.number, field.name, message, field.number
        )),
        _ => Ok(Vec::new()),
    }
}

pub fn check_field_no_delete_unless_name_reserved(input: &RuleInput<'_, '_>) -> RuleResult {
    match removed_field(input)? {
        Some((field, message, _, false)) => input.report(format!(
            "Previously present field \"{}\" with name \"{}\" on message \"{}\" was deleted without reserving the name \"{}\".",
            field.number, field.name, message, field.name
        )),
        _ => Ok(Vec::new()),
    }
}

// ========================================
// Naming
// ========================================

pub fn check_field_same_name(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(pair) = matched_fields(input)? else {
        return Ok(Vec::new());
    };
    // Map entry fields are always named key and value.
    if pair.in_map_entry || pair.old.name == pair.new.name {
        return Ok(Vec::new());
    }
    input.report(format!(
        "{} changed name from \"{}\" to \"{}\".",
        pair.subject, pair.old.name, pair.new.name
    ))
}

pub fn check_field_same_json_name(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(pair) = matched_fields(input)? else {
        return Ok(Vec::new());
    };
    if pair.in_map_entry {
        return Ok(Vec::new());
    }
    let (old, new) = (pair.old.effective_json_name(), pair.new.effective_json_name());
    if old == new {
        return Ok(Vec::new());
    }
    input.report(format!(
        "{} changed option \"json_name\" from \"{old}\" to \"{new}\".",
        pair.subject
    ))
}

// ========================================
// Types
// ========================================

fn type_change(input: &RuleInput<'_, '_>, compatible: fn(&Field, &Field) -> bool) -> RuleResult {
    let Some(pair) = matched_fields(input)? else {
        return Ok(Vec::new());
    };
    if compatible(pair.old, pair.new) {
        return Ok(Vec::new());
    }
    input.report(format!(
        "{} changed type from \"{}\" to \"{}\".",
        pair.subject,
        pair.old.type_display(),
        pair.new.type_display()
    ))
}

pub fn check_field_same_type(input: &RuleInput<'_, '_>) -> RuleResult {
    type_change(input, is_same_type)
}

pub fn check_field_wire_compatible_type(input: &RuleInput<'_, '_>) -> RuleResult {
    type_change(input, are_types_wire_compatible)
}

pub fn check_field_wire_json_compatible_type(input: &RuleInput<'_, '_>) -> RuleResult {
    type_change(input, are_types_wire_json_compatible)
}

// ========================================
// Cardinality
// ========================================

fn cardinality_change(
    input: &RuleInput<'_, '_>,
    compatible: impl Fn(&FieldPair<'_>) -> bool,
) -> RuleResult {
    let Some(pair) = matched_fields(input)? else {
        return Ok(Vec::new());
    };
    if compatible(&pair) {
        return Ok(Vec::new());
    }
    input.report(format!(
        "{} changed cardinality from \"{}\" to \"{}\".",
        pair.subject,
        cardinality(pair.old, pair.old_syntax),
        cardinality(pair.new, pair.new_syntax)
    ))
}

pub fn check_field_same_cardinality(input: &RuleInput<'_, '_>) -> RuleResult {
    cardinality_change(input, |p| {
        cardinality(p.old, p.old_syntax) == cardinality(p.new, p.new_syntax)
    })
}

pub fn check_field_wire_compatible_cardinality(input: &RuleInput<'_, '_>) -> RuleResult {
    cardinality_change(input, |p| are_cardinalities_wire_compatible(p.old, p.new))
}

pub fn check_field_wire_json_compatible_cardinality(input: &RuleInput<'_, '_>) -> RuleResult {
    cardinality_change(input, |p| are_cardinalities_wire_json_compatible(p.old, p.new))
}

// ========================================
// Options
// ========================================

fn option_change(
    input: &RuleInput<'_, '_>,
    option: &str,
    value: impl Fn(&Field) -> String,
) -> RuleResult {
    let Some(pair) = matched_fields(input)? else {
        return Ok(Vec::new());
    };
    let (old, new) = (value(pair.old), value(pair.new));
    if old == new {
        return Ok(Vec::new());
    }
    input.report(format!(
        "{} changed {option} from \"{old}\" to \"{new}\".",
        pair.subject
    ))
}

pub fn check_field_same_default(input: &RuleInput<'_, '_>) -> RuleResult {
    option_change(input, "default value", |f| {
        f.default_value.clone().unwrap_or_default()
    })
}

pub fn check_field_same_jstype(input: &RuleInput<'_, '_>) -> RuleResult {
    option_change(input, "option \"jstype\"", |f| {
        f.jstype.clone().unwrap_or_else(|| "JS_NORMAL".to_string())
    })
}

pub fn check_field_same_ctype(input: &RuleInput<'_, '_>) -> RuleResult {
    option_change(input, "option \"ctype\"", |f| {
        f.ctype.clone().unwrap_or_else(|| "STRING".to_string())
    })
}

pub fn check_field_same_oneof(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(pair) = matched_fields(input)? else {
        return Ok(Vec::new());
    };
    let message = match (&pair.old.oneof, &pair.new.oneof) {
        (Some(old), Some(new)) if old == new => return Ok(Vec::new()),
        (None, None) => return Ok(Vec::new()),
        (Some(old), Some(new)) => format!("moved from oneof \"{old}\" to oneof \"{new}\""),
        (None, Some(new)) => format!("moved into oneof \"{new}\""),
        (Some(old), None) => format!("moved out of oneof \"{old}\""),
    };
    input.report(format!("{} {message}.", pair.subject))
}
