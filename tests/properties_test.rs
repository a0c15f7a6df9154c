//! Whole-run properties: determinism, identity, additivity, exclusions,
//! category gating, parallelism and error surfacing.

use proto_compat::canonical::{Field, FieldType, Image, ImageFile, Message};
use proto_compat::compat::rule_registry::find_rule;
use proto_compat::compat::{BreakingCategory, BreakingConfig, BreakingError, Outcome, Violation};
use proto_compat::{Cancellation, check_breaking, check_breaking_with};
use std::collections::BTreeMap;

const COMMON: &str = r#"
syntax = "proto3";
package acme.common;

message Money {
  string currency = 1;
  int64 units = 2;
}

enum Region {
  REGION_UNSPECIFIED = 0;
  REGION_EU = 1;
  REGION_US = 2;
}
"#;

const ORDERS: &str = r#"
syntax = "proto3";
package acme.orders;

import "common.proto";

message Order {
  string id = 1;
  acme.common.Money total = 2;
  repeated string items = 3;
  oneof source {
    string web = 4;
    string store = 5;
  }
  acme.common.Region region = 6;
  reserved 10 to 12;
}

message GetOrderRequest { string id = 1; }

service Orders {
  rpc GetOrder(GetOrderRequest) returns (Order);
  rpc Watch(GetOrderRequest) returns (stream Order);
}
"#;

const ORDERS_BROKEN: &str = r#"
syntax = "proto3";
package acme.orders;

import "common.proto";

message Order {
  string id = 1;
  acme.common.Money total = 2;
  string items = 3;
  oneof source {
    string web = 4;
  }
  int64 region = 6;
  int32 note = 11;
}

message GetOrderRequest { string order_id = 1; }

service Orders {
  rpc GetOrder(GetOrderRequest) returns (Order);
}
"#;

const CATEGORIES: [&str; 4] = ["FILE", "PACKAGE", "WIRE_JSON", "WIRE"];

fn image(orders: &str) -> Image {
    Image::from_sources(&[("common.proto", COMMON), ("orders.proto", orders)])
        .expect("Failed to parse sources")
}

fn with_categories(categories: &[&str]) -> BreakingConfig {
    BreakingConfig {
        use_categories: categories.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

fn run(old: &Image, new: &Image, config: &BreakingConfig, jobs: usize) -> Outcome {
    check_breaking_with(old, new, config, &Cancellation::new(), jobs).expect("comparison failed")
}

#[test]
fn test_runs_are_deterministic() {
    let old = image(ORDERS);
    let new = image(ORDERS_BROKEN);
    let config = with_categories(&CATEGORIES);

    let first = run(&old, &new, &config, 1);
    let second = run(&old, &new, &config, 1);
    assert!(!first.violations().is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_parallel_matches_sequential() {
    let old = image(ORDERS);
    let new = image(ORDERS_BROKEN);
    let config = with_categories(&CATEGORIES);

    let sequential = run(&old, &new, &config, 1);
    for jobs in [2, 4, 16] {
        assert_eq!(run(&old, &new, &config, jobs), sequential, "jobs = {jobs}");
    }
    assert_eq!(check_breaking(&old, &new, &config).unwrap(), sequential);
}

#[test]
fn test_image_against_itself_is_compatible() {
    let image = image(ORDERS);
    for category in CATEGORIES {
        let outcome = run(&image, &image, &with_categories(&[category]), 2);
        assert_eq!(outcome, Outcome::Compatible, "category {category}");
    }
}

#[test]
fn test_additions_are_compatible() {
    let extended = ORDERS
        .replace(
            "  reserved 10 to 12;",
            "  reserved 10 to 12;\n  string coupon = 7;\n  map<string, string> labels = 8;",
        )
        .replace(
            "  rpc Watch(GetOrderRequest) returns (stream Order);",
            "  rpc Watch(GetOrderRequest) returns (stream Order);\n  rpc Cancel(GetOrderRequest) returns (Order);",
        )
        + "\nmessage Refund { string order_id = 1; }\nenum Channel { CHANNEL_UNSPECIFIED = 0; }\n";
    let common = COMMON.replace("  REGION_US = 2;", "  REGION_US = 2;\n  REGION_APAC = 3;");

    let old = image(ORDERS);
    let new = Image::from_sources(&[("common.proto", common.as_str()), ("orders.proto", extended.as_str())])
        .unwrap();
    for category in CATEGORIES {
        let outcome = run(&old, &new, &with_categories(&[category]), 1);
        assert!(outcome.is_compatible(), "category {category}: {outcome:?}");
    }
}

#[test]
fn test_removed_field_is_detected_under_wire() {
    let old = image(ORDERS);
    let new = image(&ORDERS.replace("  repeated string items = 3;\n", ""));
    let outcome = run(&old, &new, &with_categories(&["WIRE"]), 1);
    assert!(
        outcome
            .violations()
            .iter()
            .any(|v| v.rule_name == "FIELD_NO_DELETE_UNLESS_NUMBER_RESERVED" && v.symbol == "acme.orders.Order.items")
    );
}

#[test]
fn test_renumber_onto_existing_number() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  int32 b = 2;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 2;
}
"#;
    let old = Image::from_proto(old_proto).unwrap();
    let new = Image::from_proto(new_proto).unwrap();
    let outcome = run(&old, &new, &with_categories(&["FILE"]), 1);
    let names: Vec<_> = outcome.violations().iter().map(|v| v.rule_name.as_str()).collect();
    assert!(names.contains(&"FIELD_NO_DELETE"));
    assert!(names.contains(&"FIELD_SAME_NAME"));
}

// ========================================
// Exclusions
// ========================================

#[test]
fn test_exclusions_are_honored() {
    let old = image(ORDERS);
    let new = image(ORDERS_BROKEN);
    let baseline = run(&old, &new, &with_categories(&CATEGORIES), 1);
    assert!(baseline.violations().iter().any(|v| v.file == "orders.proto"));

    let by_path = BreakingConfig {
        ignore: vec!["orders.proto".to_string()],
        ..with_categories(&CATEGORIES)
    };
    assert!(run(&old, &new, &by_path, 1).is_compatible());

    let by_symbol = BreakingConfig {
        ignore_symbols: vec!["acme.orders.Order".to_string()],
        ..with_categories(&CATEGORIES)
    };
    let outcome = run(&old, &new, &by_symbol, 1);
    assert!(!outcome.violations().is_empty());
    assert!(
        outcome
            .violations()
            .iter()
            .all(|v| !v.symbol.starts_with("acme.orders.Order."))
    );

    let mut ignore_only = BTreeMap::new();
    ignore_only.insert("RPC_NO_DELETE".to_string(), vec!["*.proto".to_string()]);
    let by_rule = BreakingConfig {
        ignore_only,
        ..with_categories(&CATEGORIES)
    };
    let outcome = run(&old, &new, &by_rule, 1);
    assert!(outcome.violations().iter().all(|v| v.rule_name != "RPC_NO_DELETE"));
    // One removed RPC, reported once under each of the four categories.
    let removed_rpcs = baseline
        .violations()
        .iter()
        .filter(|v| v.rule_name == "RPC_NO_DELETE")
        .count();
    assert_eq!(removed_rpcs, 4);
    assert_eq!(
        outcome.violations().len() + removed_rpcs,
        baseline.violations().len()
    );
}

#[test]
fn test_except_rules() {
    let old = image(ORDERS);
    let new = image(ORDERS_BROKEN);
    let config = BreakingConfig {
        except_rules: vec!["FIELD_SAME_NAME".to_string(), "RPC_NO_DELETE".to_string()],
        ..Default::default()
    };
    let outcome = run(&old, &new, &config, 1);
    assert!(
        outcome
            .violations()
            .iter()
            .all(|v| v.rule_name != "FIELD_SAME_NAME" && v.rule_name != "RPC_NO_DELETE")
    );
}

#[test]
fn test_unstable_packages_are_skipped() {
    let old_proto = "syntax = \"proto3\";\npackage acme.v1alpha1;\nmessage M { int32 a = 1; }\n";
    let new_proto = "syntax = \"proto3\";\npackage acme.v1alpha1;\nmessage M {}\n";
    let old = Image::from_proto(old_proto).unwrap();
    let new = Image::from_proto(new_proto).unwrap();

    assert!(!run(&old, &new, &BreakingConfig::default(), 1).is_compatible());
    let config = BreakingConfig {
        ignore_unstable_packages: true,
        ..Default::default()
    };
    assert!(run(&old, &new, &config, 1).is_compatible());
}

// ========================================
// Category gating
// ========================================

#[test]
fn test_category_gating() {
    let old = image(ORDERS);
    let new = image(ORDERS_BROKEN);

    let wire = run(&old, &new, &with_categories(&["WIRE"]), 1);
    let file = run(&old, &new, &with_categories(&["FILE"]), 1);
    let both = run(&old, &new, &with_categories(&["FILE", "WIRE"]), 1);
    assert_eq!(wire, run(&old, &new, &with_categories(&["WIRE"]), 1));
    assert!(!wire.violations().is_empty());
    assert!(!file.violations().is_empty());

    for violation in both.violations() {
        let rule = find_rule(&violation.rule_name).unwrap();
        assert!(
            rule.categories.contains(&violation.category),
            "{} reported under {:?}",
            violation.rule_name,
            violation.category
        );
    }

    // Turning FILE off removes exactly the FILE-tagged violations.
    let split = |category: BreakingCategory| -> Vec<Violation> {
        both.violations()
            .iter()
            .filter(|v| v.category == category)
            .cloned()
            .collect()
    };
    assert_eq!(split(BreakingCategory::Wire), wire.violations());
    assert_eq!(split(BreakingCategory::File), file.violations());
    assert_eq!(
        both.violations().len(),
        wire.violations().len() + file.violations().len()
    );
}

// ========================================
// Scope of the comparison
// ========================================

#[test]
fn test_imports_and_input_files() {
    let a = "syntax = \"proto3\";\npackage pkg;\nimport \"dep.proto\";\nmessage A {}\n";
    let a_plain = "syntax = \"proto3\";\npackage pkg;\nmessage A {}\n";
    let old = Image::from_sources(&[("a.proto", a)]).unwrap();
    let new = Image::from_sources(&[("a.proto", a_plain)]).unwrap();
    assert!(old.file("dep.proto").is_some_and(|f| f.is_import));

    assert!(run(&old, &new, &BreakingConfig::default(), 1).is_compatible());
    let include_imports = BreakingConfig {
        exclude_imports: false,
        ..Default::default()
    };
    let outcome = run(&old, &new, &include_imports, 1);
    assert_eq!(outcome.violations().len(), 1);
    assert_eq!(outcome.violations()[0].rule_name, "FILE_NO_DELETE");
    assert_eq!(outcome.violations()[0].file, "dep.proto");

    let b = "syntax = \"proto3\";\npackage pkg;\nmessage B {}\n";
    let old = Image::from_sources(&[("a.proto", a_plain), ("b.proto", b)]).unwrap();
    let new = Image::from_sources(&[("a.proto", a_plain)]).unwrap();
    let limited = BreakingConfig {
        limit_to_input_files: true,
        ..Default::default()
    };
    assert!(run(&old, &new, &limited, 1).is_compatible());
}

#[test]
fn test_cancelled_run() {
    let old = image(ORDERS);
    let new = image(ORDERS_BROKEN);
    let cancel = Cancellation::new();
    cancel.cancel();
    for jobs in [1, 4] {
        let outcome = check_breaking_with(&old, &new, &BreakingConfig::default(), &cancel, jobs).unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(outcome.violations().is_empty());
    }
}

// ========================================
// Errors
// ========================================

#[test]
fn test_policy_errors_surface_first() {
    let image = image(ORDERS);
    let check = |config: BreakingConfig| {
        check_breaking_with(&image, &image, &config, &Cancellation::new(), 1).unwrap_err()
    };

    assert!(matches!(
        check(with_categories(&["WIRE_FORMAT"])),
        BreakingError::UnknownCategory(name) if name == "WIRE_FORMAT"
    ));
    assert!(matches!(check(with_categories(&[])), BreakingError::EmptyCategories));
    assert!(matches!(
        check(BreakingConfig {
            except_rules: vec!["NOT_A_RULE".to_string()],
            ..Default::default()
        }),
        BreakingError::UnknownRule(_)
    ));
    assert!(matches!(
        check(BreakingConfig {
            ignore: vec!["gen/[".to_string()],
            ..Default::default()
        }),
        BreakingError::InvalidGlob { .. }
    ));
}

fn message_with_field(type_name: &str) -> Message {
    Message {
        name: "M".to_string(),
        full_name: "pkg.M".to_string(),
        fields: vec![Field {
            name: "other".to_string(),
            number: 1,
            field_type: FieldType::Message,
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn file(path: &str, messages: Vec<Message>) -> ImageFile {
    ImageFile {
        path: path.to_string(),
        package: "pkg".to_string(),
        messages,
        ..Default::default()
    }
}

#[test]
fn test_structural_errors() {
    let valid = Image {
        files: vec![file("a.proto", vec![message_with_field("pkg.M")])],
    };
    let duplicate = Image {
        files: vec![
            file("a.proto", vec![message_with_field("pkg.M")]),
            file("b.proto", vec![message_with_field("pkg.M")]),
        ],
    };
    let dangling = Image {
        files: vec![file("a.proto", vec![message_with_field("pkg.Missing")])],
    };
    let config = BreakingConfig::default();

    assert!(check_breaking(&valid, &valid, &config).unwrap().is_compatible());
    assert!(matches!(
        check_breaking(&duplicate, &valid, &config),
        Err(BreakingError::DuplicateIdentity { .. })
    ));
    assert!(matches!(
        check_breaking(&valid, &dangling, &config),
        Err(BreakingError::UnresolvedReference { target, .. }) if target == "pkg.Missing"
    ));
}
