//! Rule registry
//!
//! Every breaking rule lives in one static table with the categories it
//! belongs to and the node kinds it runs on. The engine asks the table for
//! the rules of a kind; nothing registers rules at runtime.

use crate::compat::categories::BreakingCategory;
use crate::compat::handlers::RuleInput;
use crate::compat::policy::Policy;
use crate::compat::types::{NodeKind, RuleResult};
use crate::compat::{
    enum_rules, extension_rules, field_rules, file_rules, message_rules, package_rules,
    reserved_rules, service_rules,
};

pub type RuleFn = for<'r, 'a> fn(&RuleInput<'r, 'a>) -> RuleResult;

/// One breaking rule.
pub struct Rule {
    pub name: &'static str,
    pub categories: &'static [BreakingCategory],
    pub kinds: &'static [NodeKind],
    pub purpose: &'static str,
    pub check: RuleFn,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("kinds", &self.kinds)
            .finish()
    }
}

use BreakingCategory::{File as F, Package as P, Wire as W, WireJson as J};

const FP: &[BreakingCategory] = &[F, P];
const FPJ: &[BreakingCategory] = &[F, P, J];
const FPJW: &[BreakingCategory] = &[F, P, J, W];
const JW: &[BreakingCategory] = &[J, W];

const FILE: &[NodeKind] = &[NodeKind::File];
const MESSAGE: &[NodeKind] = &[NodeKind::Message];
const FIELD: &[NodeKind] = &[NodeKind::Field];
const FIELD_OR_EXTENSION: &[NodeKind] = &[NodeKind::Field, NodeKind::Extension];
const EXTENSION: &[NodeKind] = &[NodeKind::Extension];
const ONEOF: &[NodeKind] = &[NodeKind::Oneof];
const ENUM: &[NodeKind] = &[NodeKind::Enum];
const ENUM_VALUE: &[NodeKind] = &[NodeKind::EnumValue];
const SERVICE: &[NodeKind] = &[NodeKind::Service];
const METHOD: &[NodeKind] = &[NodeKind::Method];
const TOP_LEVEL: &[NodeKind] = &[
    NodeKind::Message,
    NodeKind::Enum,
    NodeKind::Service,
    NodeKind::Extension,
];

macro_rules! rule {
    ($name:literal, $categories:expr, $kinds:expr, $check:path, $purpose:literal) => {
        Rule {
            name: $name,
            categories: $categories,
            kinds: $kinds,
            purpose: $purpose,
            check: $check,
        }
    };
}

/// Static rule table, grouped by family.
pub static RULES: &[Rule] = &[
    // FILE rules
    rule!("FILE_NO_DELETE", &[F], FILE, file_rules::check_file_no_delete,
        "files are not deleted"),
    rule!("PACKAGE_NO_DELETE", &[P], FILE, package_rules::check_package_no_delete,
        "declarations of a deleted file are still present in the package"),
    rule!("FILE_SAME_PACKAGE", FPJ, FILE, file_rules::check_file_same_package,
        "files keep their package"),
    rule!("FILE_SAME_SYNTAX", FP, FILE, file_rules::check_file_same_syntax,
        "files keep their syntax"),
    rule!("FILE_SAME_GO_PACKAGE", FP, FILE, file_rules::check_file_same_go_package,
        "files keep option go_package"),
    rule!("FILE_SAME_JAVA_PACKAGE", FP, FILE, file_rules::check_file_same_java_package,
        "files keep option java_package"),
    rule!("FILE_SAME_JAVA_MULTIPLE_FILES", FP, FILE, file_rules::check_file_same_java_multiple_files,
        "files keep option java_multiple_files"),
    rule!("FILE_SAME_JAVA_OUTER_CLASSNAME", FP, FILE, file_rules::check_file_same_java_outer_classname,
        "files keep option java_outer_classname"),
    rule!("FILE_SAME_JAVA_STRING_CHECK_UTF8", FP, FILE, file_rules::check_file_same_java_string_check_utf8,
        "files keep option java_string_check_utf8"),
    rule!("FILE_SAME_JAVA_GENERIC_SERVICES", FP, FILE, file_rules::check_file_same_java_generic_services,
        "files keep option java_generic_services"),
    rule!("FILE_SAME_CSHARP_NAMESPACE", FP, FILE, file_rules::check_file_same_csharp_namespace,
        "files keep option csharp_namespace"),
    rule!("FILE_SAME_RUBY_PACKAGE", FP, FILE, file_rules::check_file_same_ruby_package,
        "files keep option ruby_package"),
    rule!("FILE_SAME_OBJC_CLASS_PREFIX", FP, FILE, file_rules::check_file_same_objc_class_prefix,
        "files keep option objc_class_prefix"),
    rule!("FILE_SAME_PHP_NAMESPACE", FP, FILE, file_rules::check_file_same_php_namespace,
        "files keep option php_namespace"),
    rule!("FILE_SAME_PHP_CLASS_PREFIX", FP, FILE, file_rules::check_file_same_php_class_prefix,
        "files keep option php_class_prefix"),
    rule!("FILE_SAME_PHP_METADATA_NAMESPACE", FP, FILE, file_rules::check_file_same_php_metadata_namespace,
        "files keep option php_metadata_namespace"),
    rule!("FILE_SAME_SWIFT_PREFIX", FP, FILE, file_rules::check_file_same_swift_prefix,
        "files keep option swift_prefix"),
    rule!("FILE_SAME_OPTIMIZE_FOR", FP, FILE, file_rules::check_file_same_optimize_for,
        "files keep option optimize_for"),
    rule!("FILE_SAME_CC_ENABLE_ARENAS", FP, FILE, file_rules::check_file_same_cc_enable_arenas,
        "files keep option cc_enable_arenas"),
    rule!("FILE_SAME_CC_GENERIC_SERVICES", FP, FILE, file_rules::check_file_same_cc_generic_services,
        "files keep option cc_generic_services"),
    rule!("FILE_SAME_PY_GENERIC_SERVICES", FP, FILE, file_rules::check_file_same_py_generic_services,
        "files keep option py_generic_services"),
    // Declaration rules
    rule!("DECLARATION_SAME_FILE", &[F], TOP_LEVEL, file_rules::check_declaration_same_file,
        "top-level declarations stay in their file"),
    rule!("MESSAGE_NO_DELETE", FP, MESSAGE, message_rules::check_message_no_delete,
        "messages are not deleted"),
    rule!("MESSAGE_SAME_MESSAGE_SET_WIRE_FORMAT", FPJW, MESSAGE,
        message_rules::check_message_same_message_set_wire_format,
        "messages keep option message_set_wire_format"),
    rule!("MESSAGE_NO_REMOVE_STANDARD_DESCRIPTOR_ACCESSOR", FP, MESSAGE,
        message_rules::check_message_no_remove_standard_descriptor_accessor,
        "messages do not turn on option no_standard_descriptor_accessor"),
    rule!("EXTENSION_MESSAGE_NO_DELETE", FPJW, MESSAGE,
        extension_rules::check_extension_message_no_delete,
        "extension ranges are not deleted"),
    rule!("ONEOF_NO_DELETE", FP, ONEOF, message_rules::check_oneof_no_delete,
        "oneofs are not deleted"),
    // FIELD rules
    rule!("FIELD_NO_DELETE", FP, FIELD, field_rules::check_field_no_delete,
        "fields are not deleted"),
    rule!("FIELD_NO_DELETE_UNLESS_NUMBER_RESERVED", JW, FIELD,
        field_rules::check_field_no_delete_unless_number_reserved,
        "fields are only deleted when their number is reserved"),
    rule!("FIELD_NO_DELETE_UNLESS_NAME_RESERVED", &[J], FIELD,
        field_rules::check_field_no_delete_unless_name_reserved,
        "fields are only deleted when their name is reserved"),
    rule!("FIELD_SAME_NAME", FPJ, FIELD, field_rules::check_field_same_name,
        "fields keep their name"),
    rule!("FIELD_SAME_JSON_NAME", FPJ, FIELD, field_rules::check_field_same_json_name,
        "fields keep their JSON name"),
    rule!("FIELD_SAME_TYPE", FP, FIELD_OR_EXTENSION, field_rules::check_field_same_type,
        "fields keep their type"),
    rule!("FIELD_WIRE_COMPATIBLE_TYPE", &[W], FIELD_OR_EXTENSION,
        field_rules::check_field_wire_compatible_type,
        "field types stay compatible on the binary wire"),
    rule!("FIELD_WIRE_JSON_COMPATIBLE_TYPE", &[J], FIELD_OR_EXTENSION,
        field_rules::check_field_wire_json_compatible_type,
        "field types stay compatible on the binary wire and in JSON"),
    rule!("FIELD_SAME_CARDINALITY", FP, FIELD_OR_EXTENSION, field_rules::check_field_same_cardinality,
        "fields keep their cardinality"),
    rule!("FIELD_WIRE_COMPATIBLE_CARDINALITY", &[W], FIELD_OR_EXTENSION,
        field_rules::check_field_wire_compatible_cardinality,
        "field cardinality stays compatible on the binary wire"),
    rule!("FIELD_WIRE_JSON_COMPATIBLE_CARDINALITY", &[J], FIELD_OR_EXTENSION,
        field_rules::check_field_wire_json_compatible_cardinality,
        "field cardinality stays compatible on the binary wire and in JSON"),
    rule!("FIELD_SAME_DEFAULT", FPJW, FIELD_OR_EXTENSION, field_rules::check_field_same_default,
        "fields keep their default value"),
    rule!("FIELD_SAME_JSTYPE", FP, FIELD_OR_EXTENSION, field_rules::check_field_same_jstype,
        "fields keep option jstype"),
    rule!("FIELD_SAME_CTYPE", FP, FIELD_OR_EXTENSION, field_rules::check_field_same_ctype,
        "fields keep option ctype"),
    rule!("FIELD_SAME_ONEOF", FPJW, FIELD, field_rules::check_field_same_oneof,
        "fields stay in or out of their oneof"),
    rule!("EXTENSION_NO_DELETE", FP, EXTENSION, extension_rules::check_extension_no_delete,
        "extensions are not deleted"),
    // ENUM rules
    rule!("ENUM_NO_DELETE", FP, ENUM, enum_rules::check_enum_no_delete,
        "enums are not deleted"),
    rule!("ENUM_SAME_TYPE", FPJW, ENUM, enum_rules::check_enum_same_type,
        "enums do not switch between open and closed"),
    rule!("ENUM_VALUE_NO_DELETE", FP, ENUM_VALUE, enum_rules::check_enum_value_no_delete,
        "enum values are not deleted"),
    rule!("ENUM_VALUE_NO_DELETE_UNLESS_NUMBER_RESERVED", JW, ENUM_VALUE,
        enum_rules::check_enum_value_no_delete_unless_number_reserved,
        "enum values are only deleted when their number is reserved"),
    rule!("ENUM_VALUE_NO_DELETE_UNLESS_NAME_RESERVED", &[J], ENUM_VALUE,
        enum_rules::check_enum_value_no_delete_unless_name_reserved,
        "enum values are only deleted when their name is reserved"),
    rule!("ENUM_VALUE_SAME_NAME", FPJ, ENUM_VALUE, enum_rules::check_enum_value_same_name,
        "enum values keep their name"),
    // RESERVED rules
    rule!("RESERVED_MESSAGE_NO_DELETE", FP, MESSAGE, reserved_rules::check_reserved_message_no_delete,
        "reserved ranges and names on messages are not deleted"),
    rule!("RESERVED_ENUM_NO_DELETE", FP, ENUM, reserved_rules::check_reserved_enum_no_delete,
        "reserved ranges and names on enums are not deleted"),
    rule!("FIELD_NO_REUSE_RESERVED", JW, FIELD, reserved_rules::check_field_no_reuse_reserved,
        "new fields do not reuse previously reserved numbers or names"),
    rule!("ENUM_VALUE_NO_REUSE_RESERVED", JW, ENUM_VALUE,
        reserved_rules::check_enum_value_no_reuse_reserved,
        "new enum values do not reuse previously reserved numbers or names"),
    // SERVICE rules
    rule!("SERVICE_NO_DELETE", FP, SERVICE, service_rules::check_service_no_delete,
        "services are not deleted"),
    rule!("RPC_NO_DELETE", FPJW, METHOD, service_rules::check_rpc_no_delete,
        "RPCs are not deleted"),
    rule!("RPC_SAME_REQUEST_TYPE", FPJW, METHOD, service_rules::check_rpc_same_request_type,
        "RPCs keep their request type"),
    rule!("RPC_SAME_RESPONSE_TYPE", FPJW, METHOD, service_rules::check_rpc_same_response_type,
        "RPCs keep their response type"),
    rule!("RPC_SAME_STREAMING", FPJW, METHOD, service_rules::check_rpc_same_streaming,
        "RPCs keep their streaming mode"),
    rule!("RPC_SAME_IDEMPOTENCY_LEVEL", FPJW, METHOD, service_rules::check_rpc_same_idempotency_level,
        "RPCs keep option idempotency_level"),
];

pub fn find_rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.name == name)
}

/// Rules enabled by `policy` that run on nodes of `kind`, in table order.
pub fn rules_for<'p>(kind: NodeKind, policy: &'p Policy) -> impl Iterator<Item = &'static Rule> + 'p {
    RULES
        .iter()
        .filter(move |rule| rule.kinds.contains(&kind) && policy.is_rule_enabled(rule))
}

/// Enabled rules per node kind, resolved once per run.
#[derive(Debug)]
pub struct RuleSet {
    by_kind: [Vec<&'static Rule>; NodeKind::COUNT],
}

impl RuleSet {
    pub fn new(policy: &Policy) -> Self {
        Self {
            by_kind: std::array::from_fn(|i| rules_for(NodeKind::ALL[i], policy).collect()),
        }
    }

    pub fn for_kind(&self, kind: NodeKind) -> &[&'static Rule] {
        &self.by_kind[kind.index()]
    }

    pub fn len(&self) -> usize {
        self.by_kind.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Verify rule consistency (for testing)
pub fn verify_rules() -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for rule in RULES {
        if !seen.insert(rule.name) {
            return Err(format!("Duplicate rule ID: {}", rule.name));
        }
        if rule.categories.is_empty() {
            return Err(format!("Rule {} has no category", rule.name));
        }
        if rule.kinds.is_empty() {
            return Err(format!("Rule {} runs on no node kind", rule.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::policy::BreakingConfig;

    #[test]
    fn test_rule_table_is_consistent() {
        verify_rules().unwrap();
        assert_eq!(RULES.len(), 59);
    }

    #[test]
    fn test_find_rule() {
        let rule = find_rule("FIELD_NO_DELETE").unwrap();
        assert_eq!(rule.categories, &[F, P]);
        assert!(find_rule("FIELD_SAME_LABEL").is_none());
    }

    #[test]
    fn test_rule_set_follows_categories() {
        let config = BreakingConfig {
            use_categories: vec!["WIRE".to_string()],
            ..Default::default()
        };
        let policy = Policy::compile(&config).unwrap();
        let rules = RuleSet::new(&policy);
        let names: Vec<_> = rules.for_kind(NodeKind::Field).iter().map(|r| r.name).collect();
        assert!(names.contains(&"FIELD_WIRE_COMPATIBLE_TYPE"));
        assert!(names.contains(&"FIELD_NO_DELETE_UNLESS_NUMBER_RESERVED"));
        assert!(!names.contains(&"FIELD_NO_DELETE"));
        assert!(!names.contains(&"FIELD_SAME_NAME"));
        assert!(rules.for_kind(NodeKind::File).is_empty());
    }

    #[test]
    fn test_except_rules_removes_rule() {
        let config = BreakingConfig {
            except_rules: vec!["FIELD_NO_DELETE".to_string()],
            ..Default::default()
        };
        let policy = Policy::compile(&config).unwrap();
        let rules = RuleSet::new(&policy);
        assert!(
            rules
                .for_kind(NodeKind::Field)
                .iter()
                .all(|r| r.name != "FIELD_NO_DELETE")
        );
        assert!(!rules.is_empty());
    }

    #[test]
    fn test_extensions_share_type_rules() {
        let policy = Policy::default();
        let names: Vec<_> = rules_for(NodeKind::Extension, &policy).map(|r| r.name).collect();
        assert!(names.contains(&"FIELD_SAME_TYPE"));
        assert!(names.contains(&"EXTENSION_NO_DELETE"));
        assert!(names.contains(&"DECLARATION_SAME_FILE"));
        assert!(!names.contains(&"FIELD_NO_DELETE"));
    }
}
