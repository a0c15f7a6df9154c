//! File-level rules
//!
//! All FILE_SAME_* option rules are generated by one macro; the remaining
//! rules compare package, syntax and declaration placement.

use crate::compat::handlers::RuleInput;
use crate::compat::index::Decl;
use crate::compat::index::DeclKey;
use crate::compat::types::{NodeKind, RuleResult};

// ========================================
// Generated File Option Rules
// ========================================

macro_rules! generate_file_option_rules {
    (
        $(
            ($fn_name:ident, $option:ident, $field_type:tt, $default:expr)
        ),* $(,)?
    ) => {
        $(
            generate_file_option_rule!($fn_name, $option, $field_type, $default);
        )*
    };
}

macro_rules! generate_file_option_rule {
    ($fn_name:ident, $option:ident, string, $default:expr) => {
        pub fn $fn_name(input: &RuleInput<'_, '_>) -> RuleResult {
            let Some((old, new)) = input.matched(Decl::as_file)? else {
                return Ok(Vec::new());
            };
            let previous = old.options.$option.as_deref().unwrap_or($default);
            let current = new.options.$option.as_deref().unwrap_or($default);
            if previous == current {
                return Ok(Vec::new());
            }
            input.report(format!(
                "File option \"{}\" changed from \"{}\" to \"{}\".",
                stringify!($option),
                previous,
                current
            ))
        }
    };

    ($fn_name:ident, $option:ident, bool, $default:expr) => {
        pub fn $fn_name(input: &RuleInput<'_, '_>) -> RuleResult {
            let Some((old, new)) = input.matched(Decl::as_file)? else {
                return Ok(Vec::new());
            };
            let previous = old.options.$option.unwrap_or($default);
            let current = new.options.$option.unwrap_or($default);
            if previous == current {
                return Ok(Vec::new());
            }
            input.report(format!(
                "File option \"{}\" changed from \"{}\" to \"{}\".",
                stringify!($option),
                previous,
                current
            ))
        }
    };
}

generate_file_option_rules! {
    // Language-specific package options
    (check_file_same_go_package, go_package, string, ""),
    (check_file_same_java_package, java_package, string, ""),
    (check_file_same_csharp_namespace, csharp_namespace, string, ""),
    (check_file_same_ruby_package, ruby_package, string, ""),

    // Java-specific options
    (check_file_same_java_multiple_files, java_multiple_files, bool, false),
    (check_file_same_java_outer_classname, java_outer_classname, string, ""),
    (check_file_same_java_string_check_utf8, java_string_check_utf8, bool, false),
    (check_file_same_java_generic_services, java_generic_services, bool, false),

    // Other language prefixes
    (check_file_same_objc_class_prefix, objc_class_prefix, string, ""),
    (check_file_same_php_class_prefix, php_class_prefix, string, ""),
    (check_file_same_php_namespace, php_namespace, string, ""),
    (check_file_same_php_metadata_namespace, php_metadata_namespace, string, ""),
    (check_file_same_swift_prefix, swift_prefix, string, ""),

    // Code generation behavior
    (check_file_same_optimize_for, optimize_for, string, "SPEED"),
    (check_file_same_cc_enable_arenas, cc_enable_arenas, bool, true),
    (check_file_same_cc_generic_services, cc_generic_services, bool, false),
    (check_file_same_py_generic_services, py_generic_services, bool, false),
}

// ========================================
// Package, Syntax and Deletion
// ========================================

pub fn check_file_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    match input.removed(Decl::as_file)? {
        Some(file) => input.report(format!(
            "Previously present file \"{}\" was deleted.",
            file.path
        )),
        None => Ok(Vec::new()),
    }
}

pub fn check_file_same_package(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_file)? else {
        return Ok(Vec::new());
    };
    if old.package == new.package {
        return Ok(Vec::new());
    }
    input.report(format!(
        "File package changed from \"{}\" to \"{}\".",
        old.package, new.package
    ))
}

pub fn check_file_same_syntax(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_file)? else {
        return Ok(Vec::new());
    };
    if old.syntax == new.syntax {
        return Ok(Vec::new());
    }
    input.report(format!(
        "File syntax changed from \"{}\" to \"{}\".",
        old.syntax.as_str(),
        new.syntax.as_str()
    ))
}

/// A top-level declaration moved to another file that still exists.
pub fn check_declaration_same_file(input: &RuleInput<'_, '_>) -> RuleResult {
    let (Some(old), Some(new)) = (input.old_entry(), input.new_entry()) else {
        return Ok(Vec::new());
    };
    if old.parent.is_some() || old.file.path == new.file.path {
        return Ok(Vec::new());
    }
    if !input.new.contains(&DeclKey::File(old.file.path.clone())) {
        return Ok(Vec::new());
    }
    let what = match input.node.kind {
        NodeKind::Message => "Message",
        NodeKind::Enum => "Enum",
        NodeKind::Service => "Service",
        NodeKind::Extension => "Extension",
        _ => return Err(input.unexpected_shape()),
    };
    input.report(format!(
        "{what} \"{}\" moved from file \"{}\" to file \"{}\".",
        old.symbol(),
        old.file.path,
        new.file.path
    ))
}
