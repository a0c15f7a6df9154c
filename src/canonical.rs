//! Canonical, serializable model of a resolved schema snapshot (an "image").
//!
//! Declarations keep their declaration order, since report ordering follows
//! it. Source spans are carried for reporting but never serialized, so the
//! fingerprint of an image ignores comments and formatting.

use serde::{Deserialize, Serialize};

//==============================================================================
// Source Locations
//==============================================================================

/// 1-based source position of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// Inclusive range of field or enum value numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NumberRange {
    pub start: i32,
    pub end: i32,
}

impl NumberRange {
    pub fn contains(&self, number: i32) -> bool {
        self.start <= number && number <= self.end
    }
}

impl std::fmt::Display for NumberRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "[{},{}]", self.start, self.end)
        }
    }
}

//==============================================================================
// Image
//==============================================================================

/// A fully resolved set of files for one schema snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub files: Vec<ImageFile>,
}

impl Image {
    pub fn file(&self, path: &str) -> Option<&ImageFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Files that were requested as inputs, as opposed to pulled-in imports.
    pub fn input_files(&self) -> impl Iterator<Item = &ImageFile> {
        self.files.iter().filter(|f| !f.is_import)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
    Editions,
}

impl Syntax {
    pub fn as_str(&self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
            Syntax::Editions => "editions",
        }
    }
}

/// One `.proto` file of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    pub syntax: Syntax,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_import: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<Enum>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Field>,
    #[serde(default)]
    pub options: FileOptions,
    #[serde(skip)]
    pub span: Span,
}

// ========================================
// File Options
// ========================================

/// File options that shape generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub go_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_multiple_files: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_outer_classname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_string_check_utf8: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_generic_services: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csharp_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruby_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objc_class_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub php_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub php_class_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub php_metadata_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swift_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_for: Option<String>, // "SPEED", "CODE_SIZE", "LITE_RUNTIME"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_enable_arenas: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_generic_services: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub py_generic_services: Option<bool>,
}

//==============================================================================
// Messages and Fields
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oneofs: Vec<Oneof>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<Enum>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ranges: Vec<NumberRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_ranges: Vec<NumberRange>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub map_entry: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub message_set_wire_format: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_standard_descriptor_accessor: bool,
    #[serde(skip)]
    pub span: Span,
}

impl Message {
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn oneof(&self, name: &str) -> Option<&Oneof> {
        self.oneofs.iter().find(|o| o.name == name)
    }

    pub fn is_number_reserved(&self, number: i32) -> bool {
        self.reserved_ranges.iter().any(|r| r.contains(number))
    }

    pub fn is_name_reserved(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Oneof {
    pub name: String,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    Optional,
    Required,
    Repeated,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Optional => "optional",
            Label::Required => "required",
            Label::Repeated => "repeated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Double,
    Float,
    #[default]
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Group,
    Message,
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Uint32 => "uint32",
            FieldType::Uint64 => "uint64",
            FieldType::Sint32 => "sint32",
            FieldType::Sint64 => "sint64",
            FieldType::Fixed32 => "fixed32",
            FieldType::Fixed64 => "fixed64",
            FieldType::Sfixed32 => "sfixed32",
            FieldType::Sfixed64 => "sfixed64",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Group => "group",
            FieldType::Message => "message",
            FieldType::Enum => "enum",
        }
    }

    /// Whether values of this type refer to another declaration by name.
    pub fn is_named(&self) -> bool {
        matches!(self, FieldType::Message | FieldType::Enum | FieldType::Group)
    }

    /// Length-delimited types can switch between singular and repeated on
    /// the wire; packable scalars cannot.
    pub fn is_length_delimited(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Bytes | FieldType::Message | FieldType::Group
        )
    }
}

/// A message field or an extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub number: i32,
    pub label: Label,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Fully-qualified message or enum name, without the leading dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub proto3_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jstype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctype: Option<String>,
    /// Extended message for extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extendee: Option<String>,
    /// Fully-qualified name of an extension (scope + name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip)]
    pub span: Span,
}

impl Field {
    /// Type as written in a schema: a scalar keyword or the named type.
    pub fn type_display(&self) -> &str {
        match (&self.type_name, self.field_type.is_named()) {
            (Some(name), true) => name,
            _ => self.field_type.as_str(),
        }
    }

    /// JSON name as serialized by protobuf JSON mapping.
    pub fn effective_json_name(&self) -> String {
        match &self.json_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => lower_camel(&self.name),
        }
    }
}

fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

//==============================================================================
// Enums
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ranges: Vec<NumberRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_alias: bool,
    /// Closed enums reject unknown numbers (proto2 semantics).
    ///
    /// Only the file syntax decides this. Editions files are taken as
    /// open, the edition 2023 default; a per-enum `features.enum_type`
    /// override is not read.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub closed: bool,
    #[serde(skip)]
    pub span: Span,
}

impl Enum {
    /// All value names declared for `number`, in declaration order.
    pub fn names_for(&self, number: i32) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(move |v| v.number == number)
            .map(|v| v.name.as_str())
    }

    pub fn is_number_reserved(&self, number: i32) -> bool {
        self.reserved_ranges.iter().any(|r| r.contains(number))
    }

    pub fn is_name_reserved(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    #[serde(skip)]
    pub span: Span,
}

//==============================================================================
// Services
//==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Method>,
    #[serde(skip)]
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub client_streaming: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub server_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_level: Option<String>, // "NO_SIDE_EFFECTS", "IDEMPOTENT"
    #[serde(skip)]
    pub span: Span,
}

impl Method {
    pub fn streaming_mode(&self) -> &'static str {
        match (self.client_streaming, self.server_streaming) {
            (false, false) => "unary",
            (true, false) => "client streaming",
            (false, true) => "server streaming",
            (true, true) => "bidirectional streaming",
        }
    }
}
