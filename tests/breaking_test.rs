use proto_compat::canonical::{Enum, EnumValue, Image, ImageFile, Method, Service, Syntax};
use proto_compat::compat::{BreakingCategory, BreakingConfig, Outcome};
use proto_compat::{Cancellation, check_breaking_with};

fn config(categories: &[&str]) -> BreakingConfig {
    BreakingConfig {
        use_categories: categories.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

fn compare_images(old: &Image, new: &Image, categories: &[&str]) -> Outcome {
    check_breaking_with(old, new, &config(categories), &Cancellation::new(), 1)
        .expect("comparison should succeed")
}

fn compare(old: &str, new: &str, categories: &[&str]) -> Outcome {
    let old = Image::from_proto(old).expect("Failed to parse old proto");
    let new = Image::from_proto(new).expect("Failed to parse new proto");
    compare_images(&old, &new, categories)
}

fn position(outcome: &Outcome, index: usize) -> (&str, u32, u32) {
    let v = &outcome.violations()[index];
    (v.file.as_str(), v.line, v.column)
}

fn rule_names(outcome: &Outcome) -> Vec<&str> {
    outcome
        .violations()
        .iter()
        .map(|v| v.rule_name.as_str())
        .collect()
}

const ALL_CATEGORIES: &[&[&str]] = &[&["FILE"], &["PACKAGE"], &["WIRE_JSON"], &["WIRE"]];

// ========================================
// Reference scenarios
// ========================================

#[test]
fn test_renumbered_field_is_one_deletion() {
    let old_proto = r#"
syntax = "proto3";
package pkg;

message M {
  int32 f = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;

message M {
  int32 f = 2;
}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert!(!outcome.is_compatible());
    assert_eq!(rule_names(&outcome), vec!["FIELD_NO_DELETE"]);

    // Reported at `int32 f = 2;` in the new file.
    assert_eq!(position(&outcome, 0), ("input.proto", 6, 3));
    let violation = &outcome.violations()[0];
    assert_eq!(violation.category, BreakingCategory::File);
    assert_eq!(violation.symbol, "pkg.M.f");
    assert_eq!(
        violation.message,
        "Previously present field \"1\" with name \"f\" on message \"pkg.M\" was deleted."
    );

    // FIELD_NO_DELETE belongs to FILE and PACKAGE, so both report it.
    let outcome = compare(old_proto, new_proto, &["FILE", "PACKAGE"]);
    let categories: Vec<_> = outcome.violations().iter().map(|v| v.category).collect();
    assert_eq!(rule_names(&outcome), vec!["FIELD_NO_DELETE", "FIELD_NO_DELETE"]);
    assert_eq!(categories, vec![BreakingCategory::File, BreakingCategory::Package]);
}

#[test]
fn test_added_enum_value_is_compatible() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
enum E {
  A = 0;
  B = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
enum E {
  A = 0;
  B = 1;
  C = 2;
}
"#;

    for categories in ALL_CATEGORIES {
        let outcome = compare(old_proto, new_proto, categories);
        assert_eq!(outcome, Outcome::Compatible, "categories {categories:?}");
    }
}

#[test]
fn test_removed_rpc_reported_on_service() {
    let old_proto = r#"
syntax = "proto3";
package pkg;

message GetRequest {}
message GetResponse {}

service S {
  rpc Get(GetRequest) returns (GetResponse);
  rpc List(GetRequest) returns (GetResponse);
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;

message GetRequest {}
message GetResponse {}

service S {
  rpc List(GetRequest) returns (GetResponse);
}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["RPC_NO_DELETE"]);
    // Reported at `service S {` in the new file.
    assert_eq!(position(&outcome, 0), ("input.proto", 8, 1));
    let violation = &outcome.violations()[0];
    assert_eq!(violation.symbol, "pkg.S.Get");
    assert_eq!(
        violation.message,
        "Previously present RPC \"Get\" on service \"pkg.S\" was deleted."
    );
}

#[test]
fn test_identical_images_are_compatible() {
    let proto = r#"
syntax = "proto3";
package pkg;

message Req { string id = 1; repeated int64 values = 2; }
message Resp { oneof result { string ok = 1; int32 code = 2; } }
enum Kind { KIND_UNSPECIFIED = 0; KIND_A = 1; }
service S { rpc Call(Req) returns (stream Resp); }
"#;

    for categories in ALL_CATEGORIES {
        assert!(compare(proto, proto, categories).is_compatible());
    }
}

// ========================================
// Messages and fields
// ========================================

#[test]
fn test_message_deletion() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message A {}
message B {}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message A {}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["MESSAGE_NO_DELETE"]);
    // Removed top-level messages are reported on the file.
    assert_eq!(position(&outcome, 0), ("input.proto", 1, 1));
    assert_eq!(
        outcome.violations()[0].message,
        "Previously present message \"pkg.B\" was deleted from file \"input.proto\"."
    );
    assert!(compare(old_proto, new_proto, &["WIRE"]).is_compatible());
}

#[test]
fn test_removed_field_reported_on_message() {
    let old_proto = r#"
syntax = "proto3";
package pkg;

message M {
  string a = 1;
  int32 b = 2;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;

message M {
  string a = 1;
}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_NO_DELETE"]);
    // No field named `b` is left, so the message declaration is cited.
    assert_eq!(position(&outcome, 0), ("input.proto", 5, 1));
    assert_eq!(outcome.violations()[0].symbol, "pkg.M.b");
}

#[test]
fn test_nested_message_deletion_names_parent() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message Outer {
  message Inner {}
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message Outer {}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["MESSAGE_NO_DELETE"]);
    assert!(outcome.violations()[0].message.contains("from message \"pkg.Outer\""));
}

#[test]
fn test_field_type_changes_by_category() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M { int32 count = 1; }
"#;
    let widened = old_proto.replace("int32 count", "int64 count");
    let to_string = old_proto.replace("int32 count", "string count");

    let outcome = compare(old_proto, &widened, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_SAME_TYPE"]);
    assert_eq!(
        outcome.violations()[0].message,
        "Field \"1\" with name \"count\" on message \"pkg.M\" changed type from \"int32\" to \"int64\"."
    );

    assert!(compare(old_proto, &widened, &["WIRE"]).is_compatible());
    assert_eq!(
        rule_names(&compare(old_proto, &widened, &["WIRE_JSON"])),
        vec!["FIELD_WIRE_JSON_COMPATIBLE_TYPE"]
    );
    assert_eq!(
        rule_names(&compare(old_proto, &to_string, &["WIRE"])),
        vec!["FIELD_WIRE_COMPATIBLE_TYPE"]
    );
}

#[test]
fn test_field_message_type_change() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message A {}
message B {}
message M { A payload = 1; }
"#;
    let new_proto = old_proto.replace("A payload", "B payload");

    for categories in [["FILE"], ["WIRE"], ["WIRE_JSON"]] {
        let outcome = compare(old_proto, &new_proto, &categories);
        assert_eq!(outcome.violations().len(), 1, "categories {categories:?}");
        assert!(outcome.violations()[0].message.contains("from \"pkg.A\" to \"pkg.B\""));
    }
}

#[test]
fn test_field_rename() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M { string user_name = 1; }
"#;
    let new_proto = old_proto.replace("user_name", "login");

    let outcome = compare(old_proto, &new_proto, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_SAME_JSON_NAME", "FIELD_SAME_NAME"]);
    assert!(compare(old_proto, &new_proto, &["WIRE"]).is_compatible());
}

#[test]
fn test_field_cardinality_changes() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 count = 1;
  string label = 2;
}
"#;
    let repeated_count = old_proto.replace("int32 count", "repeated int32 count");
    let repeated_label = old_proto.replace("string label", "repeated string label");

    let outcome = compare(old_proto, &repeated_count, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_SAME_CARDINALITY"]);
    assert!(outcome.violations()[0].message.contains("from \"implicit\" to \"repeated\""));
    assert_eq!(
        rule_names(&compare(old_proto, &repeated_count, &["WIRE"])),
        vec!["FIELD_WIRE_COMPATIBLE_CARDINALITY"]
    );

    // Length-delimited values read the same singular or repeated.
    assert!(compare(old_proto, &repeated_label, &["WIRE"]).is_compatible());
    assert_eq!(
        rule_names(&compare(old_proto, &repeated_label, &["WIRE_JSON"])),
        vec!["FIELD_WIRE_JSON_COMPATIBLE_CARDINALITY"]
    );
}

#[test]
fn test_field_moved_into_oneof() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  string b = 2;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message M {
  oneof choice {
    int32 a = 1;
  }
  string b = 2;
}
"#;

    let outcome = compare(old_proto, new_proto, &["WIRE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_SAME_ONEOF"]);
    assert!(outcome.violations()[0].message.ends_with("moved into oneof \"choice\"."));
    assert_eq!(outcome.violations()[0].category, BreakingCategory::Wire);
}

#[test]
fn test_oneof_deletion() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  oneof choice {
    int32 a = 1;
    string b = 2;
  }
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  string b = 2;
}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    let names = rule_names(&outcome);
    assert!(names.contains(&"ONEOF_NO_DELETE"));
    assert_eq!(names.iter().filter(|n| **n == "FIELD_SAME_ONEOF").count(), 2);
}

#[test]
fn test_map_field_deletion_skips_entry_message() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  string id = 1;
  map<string, int32> counts = 2;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message M {
  string id = 1;
}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_NO_DELETE"]);
}

#[test]
fn test_proto2_default_change() {
    let old_proto = r#"
syntax = "proto2";
package pkg;
message M {
  optional int32 retries = 1 [default = 3];
}
"#;
    let new_proto = old_proto.replace("default = 3", "default = 5");

    let outcome = compare(old_proto, &new_proto, &["WIRE"]);
    assert_eq!(rule_names(&outcome), vec!["FIELD_SAME_DEFAULT"]);
    assert!(outcome.violations()[0].message.contains("from \"3\" to \"5\""));
}

// ========================================
// Reserved ranges and deletion policies
// ========================================

#[test]
fn test_deletion_with_reservations() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  int32 b = 2;
}
"#;
    let unreserved = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
}
"#;
    let number_reserved = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  reserved 2;
}
"#;
    let fully_reserved = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  reserved 2;
  reserved "b";
}
"#;

    assert_eq!(
        rule_names(&compare(old_proto, unreserved, &["WIRE"])),
        vec!["FIELD_NO_DELETE_UNLESS_NUMBER_RESERVED"]
    );
    assert!(compare(old_proto, number_reserved, &["WIRE"]).is_compatible());
    assert_eq!(
        rule_names(&compare(old_proto, number_reserved, &["WIRE_JSON"])),
        vec!["FIELD_NO_DELETE_UNLESS_NAME_RESERVED"]
    );
    assert!(compare(old_proto, fully_reserved, &["WIRE_JSON"]).is_compatible());
    assert_eq!(
        rule_names(&compare(old_proto, fully_reserved, &["FILE"])),
        vec!["FIELD_NO_DELETE"]
    );
}

#[test]
fn test_reserved_range_shrink_and_reuse() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  reserved 3, 5 to 10;
  reserved "legacy";
}
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message M {
  int32 a = 1;
  int32 c = 3;
  reserved 5 to 8;
}
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    let messages: Vec<_> = outcome.violations().iter().map(|v| v.message.as_str()).collect();
    assert_eq!(rule_names(&outcome).len(), 3);
    assert!(rule_names(&outcome).iter().all(|n| *n == "RESERVED_MESSAGE_NO_DELETE"));
    assert!(messages.contains(&"Previously present reserved range \"3\" on message \"pkg.M\" was deleted."));
    assert!(messages.contains(&"Previously present reserved range \"[5,10]\" on message \"pkg.M\" was deleted."));
    assert!(messages.contains(&"Previously present reserved name \"legacy\" on message \"pkg.M\" was deleted."));

    assert_eq!(
        rule_names(&compare(old_proto, new_proto, &["WIRE"])),
        vec!["FIELD_NO_REUSE_RESERVED"]
    );
}

// ========================================
// Enums
// ========================================

#[test]
fn test_enum_value_deletion_and_rename() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
enum Color {
  COLOR_UNSPECIFIED = 0;
  COLOR_RED = 1;
  COLOR_BLUE = 2;
}
"#;
    let deleted = old_proto.replace("  COLOR_BLUE = 2;\n", "");
    let renamed = old_proto.replace("COLOR_BLUE", "COLOR_NAVY");

    assert_eq!(
        rule_names(&compare(old_proto, &deleted, &["FILE"])),
        vec!["ENUM_VALUE_NO_DELETE"]
    );
    assert_eq!(
        rule_names(&compare(old_proto, &deleted, &["WIRE"])),
        vec!["ENUM_VALUE_NO_DELETE_UNLESS_NUMBER_RESERVED"]
    );
    let outcome = compare(old_proto, &renamed, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["ENUM_VALUE_SAME_NAME"]);
    assert_eq!(
        outcome.violations()[0].message,
        "Enum value \"2\" on enum \"pkg.Color\" changed name from \"COLOR_BLUE\" to \"COLOR_NAVY\"."
    );
    assert!(compare(old_proto, &renamed, &["WIRE"]).is_compatible());
}

#[test]
fn test_enum_deletion() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
enum Color { COLOR_UNSPECIFIED = 0; }
enum Shape { SHAPE_UNSPECIFIED = 0; }
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
enum Color { COLOR_UNSPECIFIED = 0; }
"#;

    let outcome = compare(old_proto, new_proto, &["PACKAGE"]);
    assert_eq!(rule_names(&outcome), vec!["ENUM_NO_DELETE"]);
    assert_eq!(outcome.violations()[0].category, BreakingCategory::Package);
}

fn enum_image(closed: bool) -> Image {
    Image {
        files: vec![ImageFile {
            path: "status.proto".to_string(),
            package: "pkg".to_string(),
            syntax: Syntax::Editions,
            enums: vec![Enum {
                name: "Status".to_string(),
                full_name: "pkg.Status".to_string(),
                values: vec![EnumValue {
                    name: "STATUS_UNSPECIFIED".to_string(),
                    number: 0,
                    ..Default::default()
                }],
                closed,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

#[test]
fn test_enum_open_to_closed() {
    let outcome = compare_images(&enum_image(false), &enum_image(true), &["WIRE"]);
    assert_eq!(rule_names(&outcome), vec!["ENUM_SAME_TYPE"]);
    assert_eq!(
        outcome.violations()[0].message,
        "Enum \"pkg.Status\" changed from open to closed."
    );
}

// ========================================
// Services
// ========================================

#[test]
fn test_rpc_signature_changes() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message Req {}
message Resp {}
message Other {}
service S {
  rpc Get(Req) returns (Resp);
}
"#;
    let new_request = old_proto.replace("Get(Req)", "Get(Other)");
    let streaming = old_proto.replace("returns (Resp)", "returns (stream Resp)");

    let outcome = compare(old_proto, &new_request, &["WIRE"]);
    assert_eq!(rule_names(&outcome), vec!["RPC_SAME_REQUEST_TYPE"]);
    assert!(outcome.violations()[0].message.contains("from \"pkg.Req\" to \"pkg.Other\""));

    let outcome = compare(old_proto, &streaming, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["RPC_SAME_STREAMING"]);
    assert!(outcome.violations()[0].message.contains("from \"unary\" to \"server streaming\""));
}

#[test]
fn test_service_deletion() {
    let old_proto = r#"
syntax = "proto3";
package pkg;
message Req {}
service A { rpc Get(Req) returns (Req); }
service B { rpc Get(Req) returns (Req); }
"#;
    let new_proto = r#"
syntax = "proto3";
package pkg;
message Req {}
service A { rpc Get(Req) returns (Req); }
"#;

    assert_eq!(
        rule_names(&compare(old_proto, new_proto, &["FILE"])),
        vec!["SERVICE_NO_DELETE"]
    );
    assert!(compare(old_proto, new_proto, &["WIRE"]).is_compatible());
}

fn idempotency_image(level: Option<&str>) -> Image {
    Image {
        files: vec![ImageFile {
            path: "svc.proto".to_string(),
            package: "pkg".to_string(),
            syntax: Syntax::Proto3,
            messages: vec![proto_compat::canonical::Message {
                name: "Req".to_string(),
                full_name: "pkg.Req".to_string(),
                ..Default::default()
            }],
            services: vec![Service {
                name: "S".to_string(),
                full_name: "pkg.S".to_string(),
                methods: vec![Method {
                    name: "Get".to_string(),
                    input_type: "pkg.Req".to_string(),
                    output_type: "pkg.Req".to_string(),
                    idempotency_level: level.map(str::to_string),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

#[test]
fn test_rpc_idempotency_level_change() {
    let outcome = compare_images(
        &idempotency_image(None),
        &idempotency_image(Some("NO_SIDE_EFFECTS")),
        &["WIRE"],
    );
    assert_eq!(rule_names(&outcome), vec!["RPC_SAME_IDEMPOTENCY_LEVEL"]);
    assert!(
        outcome.violations()[0]
            .message
            .contains("from \"IDEMPOTENCY_UNKNOWN\" to \"NO_SIDE_EFFECTS\"")
    );
}

// ========================================
// Files
// ========================================

#[test]
fn test_file_option_and_package_changes() {
    let old_proto = r#"
syntax = "proto3";
package acme.v1;
option java_package = "com.acme.v1";
option go_package = "acme/v1";
"#;
    let new_proto = r#"
syntax = "proto3";
package acme.v2;
option java_package = "com.acme.v2";
option go_package = "acme/v1";
"#;

    let outcome = compare(old_proto, new_proto, &["FILE"]);
    assert_eq!(
        rule_names(&outcome),
        vec!["FILE_SAME_JAVA_PACKAGE", "FILE_SAME_PACKAGE"]
    );
    assert_eq!(
        rule_names(&compare(old_proto, new_proto, &["WIRE_JSON"])),
        vec!["FILE_SAME_PACKAGE"]
    );
}

#[test]
fn test_file_deletion() {
    let a = "syntax = \"proto3\";\npackage pkg;\nmessage A {}\n";
    let b = "syntax = \"proto3\";\npackage pkg;\nmessage B {}\nenum Kind { KIND_UNSPECIFIED = 0; }\n";
    let old = Image::from_sources(&[("a.proto", a), ("b.proto", b)]).unwrap();
    let new = Image::from_sources(&[("a.proto", a)]).unwrap();

    let outcome = compare_images(&old, &new, &["FILE", "PACKAGE"]);
    assert_eq!(
        rule_names(&outcome),
        vec!["FILE_NO_DELETE", "PACKAGE_NO_DELETE", "PACKAGE_NO_DELETE"]
    );
    assert!(
        outcome
            .violations()
            .iter()
            .all(|v| (v.file.as_str(), v.line, v.column) == ("b.proto", 1, 1))
    );
    assert_eq!(
        outcome.violations()[1].message,
        "Previously present enum \"pkg.Kind\" was deleted from package \"pkg\"."
    );
}

#[test]
fn test_declaration_moved_between_files() {
    let a_old = "syntax = \"proto3\";\npackage pkg;\nmessage A {}\nmessage B {}\n";
    let a_new = "syntax = \"proto3\";\npackage pkg;\nmessage A {}\n";
    let b_new = "syntax = \"proto3\";\npackage pkg;\nmessage B {}\n";
    let old = Image::from_sources(&[("a.proto", a_old)]).unwrap();
    let new = Image::from_sources(&[("a.proto", a_new), ("b.proto", b_new)]).unwrap();

    let outcome = compare_images(&old, &new, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["DECLARATION_SAME_FILE"]);
    assert_eq!(
        outcome.violations()[0].message,
        "Message \"pkg.B\" moved from file \"a.proto\" to file \"b.proto\"."
    );
    assert!(compare_images(&old, &new, &["PACKAGE"]).is_compatible());
}

#[test]
fn test_declaration_moved_out_of_deleted_file() {
    let a = "syntax = \"proto3\";\npackage pkg;\nmessage A {}\n";
    let b = "syntax = \"proto3\";\npackage pkg;\nmessage B {}\n";
    let old = Image::from_sources(&[("a.proto", a), ("b.proto", b)]).unwrap();
    let new = Image::from_sources(&[("a.proto", a), ("c.proto", b)]).unwrap();

    let outcome = compare_images(&old, &new, &["FILE", "PACKAGE"]);
    assert_eq!(rule_names(&outcome), vec!["FILE_NO_DELETE"]);
}

// ========================================
// Extensions
// ========================================

#[test]
fn test_extension_changes() {
    let old_proto = r#"
syntax = "proto2";
package pkg;
message Base {
  extensions 100 to 199;
}
extend Base {
  optional int32 tag = 100;
}
"#;
    let removed = r#"
syntax = "proto2";
package pkg;
message Base {
  extensions 100 to 199;
}
"#;
    let shrunk = old_proto.replace("100 to 199", "100 to 150");

    let outcome = compare(old_proto, removed, &["FILE"]);
    assert_eq!(rule_names(&outcome), vec!["EXTENSION_NO_DELETE"]);
    assert_eq!(
        outcome.violations()[0].message,
        "Previously present extension \"100\" with name \"tag\" on message \"pkg.Base\" was deleted."
    );

    let outcome = compare(old_proto, &shrunk, &["WIRE"]);
    assert_eq!(rule_names(&outcome), vec!["EXTENSION_MESSAGE_NO_DELETE"]);
    assert!(outcome.violations()[0].message.contains("\"[100,199]\""));
}
