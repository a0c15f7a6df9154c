//! Converts the raw `FileDescriptorProto` AST from the `protobuf` crate
//! into the serializable `ImageFile` representation.
//!
//! Spans come from `source_code_info` when the producer recorded it. The
//! descriptor paths below follow the field numbers of `descriptor.proto`.

use crate::canonical::{
    Enum, EnumValue, Field, FieldType, FileOptions, ImageFile, Label, Message, Method, NumberRange,
    Oneof, Service, Span, Syntax,
};
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto, field_descriptor_proto, method_options,
};
use protobuf::EnumOrUnknown;
use std::collections::{HashMap, HashSet};

// FileDescriptorProto
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const FILE_EXTENSION: i32 = 7;
// DescriptorProto
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const MESSAGE_EXTENSION: i32 = 6;
const MESSAGE_ONEOF_DECL: i32 = 8;
// EnumDescriptorProto / ServiceDescriptorProto
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

/// Source positions keyed by descriptor path.
struct SourceMap {
    spans: HashMap<Vec<i32>, Span>,
}

impl SourceMap {
    fn new(file: &FileDescriptorProto) -> Self {
        let mut spans = HashMap::new();
        if let Some(info) = file.source_code_info.as_ref() {
            for location in &info.location {
                if location.span.len() < 2 {
                    continue;
                }
                let line = u32::try_from(location.span[0]).unwrap_or(0) + 1;
                let column = u32::try_from(location.span[1]).unwrap_or(0) + 1;
                // The first location recorded for a path is the declaration itself.
                spans
                    .entry(location.path.clone())
                    .or_insert_with(|| Span::new(line, column));
            }
        }
        Self { spans }
    }

    fn span(&self, path: &[i32]) -> Span {
        self.spans.get(path).copied().unwrap_or_default()
    }
}

fn child_path(path: &[i32], field: i32, index: usize) -> Vec<i32> {
    let mut out = Vec::with_capacity(path.len() + 2);
    out.extend_from_slice(path);
    out.push(field);
    out.push(index as i32);
    out
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn strip_dot(name: &str) -> String {
    name.strip_prefix('.').unwrap_or(name).to_string()
}

fn enum_name<E: protobuf::Enum + std::fmt::Debug>(value: EnumOrUnknown<E>) -> String {
    match value.enum_value() {
        Ok(v) => format!("{v:?}"),
        Err(number) => number.to_string(),
    }
}

pub fn normalize_file(file: &FileDescriptorProto, is_import: bool) -> ImageFile {
    let sources = SourceMap::new(file);
    let syntax = match file.syntax() {
        "proto3" => Syntax::Proto3,
        "editions" => Syntax::Editions,
        _ => Syntax::Proto2,
    };
    let package = file.package().to_string();
    let ctx = Ctx {
        sources: &sources,
        syntax,
    };

    let messages = file
        .message_type
        .iter()
        .enumerate()
        .map(|(i, m)| ctx.message(m, &package, &[FILE_MESSAGE_TYPE, i as i32]))
        .collect();
    let enums = file
        .enum_type
        .iter()
        .enumerate()
        .map(|(i, e)| ctx.enumeration(e, &package, &[FILE_ENUM_TYPE, i as i32]))
        .collect();
    let services = file
        .service
        .iter()
        .enumerate()
        .map(|(i, s)| ctx.service(s, &package, &[FILE_SERVICE, i as i32]))
        .collect();
    let extensions = file
        .extension
        .iter()
        .enumerate()
        .map(|(i, f)| ctx.field(f, &package, &[FILE_EXTENSION, i as i32], &[], &HashSet::new()))
        .collect();

    ImageFile {
        path: file.name().to_string(),
        package,
        syntax,
        is_import,
        imports: file.dependency.clone(),
        messages,
        enums,
        services,
        extensions,
        options: normalize_file_options(file),
        span: Span::default(),
    }
}

fn normalize_file_options(file: &FileDescriptorProto) -> FileOptions {
    let Some(o) = file.options.as_ref() else {
        return FileOptions::default();
    };
    FileOptions {
        go_package: o.go_package.clone(),
        java_package: o.java_package.clone(),
        java_multiple_files: o.java_multiple_files,
        java_outer_classname: o.java_outer_classname.clone(),
        java_string_check_utf8: o.java_string_check_utf8,
        java_generic_services: o.java_generic_services,
        csharp_namespace: o.csharp_namespace.clone(),
        ruby_package: o.ruby_package.clone(),
        objc_class_prefix: o.objc_class_prefix.clone(),
        php_namespace: o.php_namespace.clone(),
        php_class_prefix: o.php_class_prefix.clone(),
        php_metadata_namespace: o.php_metadata_namespace.clone(),
        swift_prefix: o.swift_prefix.clone(),
        optimize_for: o.optimize_for.map(enum_name),
        cc_enable_arenas: o.cc_enable_arenas,
        cc_generic_services: o.cc_generic_services,
        py_generic_services: o.py_generic_services,
    }
}

struct Ctx<'s> {
    sources: &'s SourceMap,
    syntax: Syntax,
}

impl Ctx<'_> {
    fn message(&self, msg: &DescriptorProto, scope: &str, path: &[i32]) -> Message {
        let full_name = qualify(scope, msg.name());

        // proto3 `optional` fields live in a synthetic oneof of their own.
        let synthetic: HashSet<i32> = msg
            .field
            .iter()
            .filter(|f| f.proto3_optional())
            .filter_map(|f| f.oneof_index)
            .collect();
        let oneof_names: Vec<String> = msg.oneof_decl.iter().map(|o| o.name().to_string()).collect();

        let oneofs = msg
            .oneof_decl
            .iter()
            .enumerate()
            .filter(|(i, _)| !synthetic.contains(&(*i as i32)))
            .map(|(i, o)| Oneof {
                name: o.name().to_string(),
                span: self.sources.span(&child_path(path, MESSAGE_ONEOF_DECL, i)),
            })
            .collect();

        let fields = msg
            .field
            .iter()
            .enumerate()
            .map(|(i, f)| {
                self.field(
                    f,
                    &full_name,
                    &child_path(path, MESSAGE_FIELD, i),
                    &oneof_names,
                    &synthetic,
                )
            })
            .collect();

        let messages = msg
            .nested_type
            .iter()
            .enumerate()
            .map(|(i, m)| self.message(m, &full_name, &child_path(path, MESSAGE_NESTED_TYPE, i)))
            .collect();
        let enums = msg
            .enum_type
            .iter()
            .enumerate()
            .map(|(i, e)| self.enumeration(e, &full_name, &child_path(path, MESSAGE_ENUM_TYPE, i)))
            .collect();
        let extensions = msg
            .extension
            .iter()
            .enumerate()
            .map(|(i, f)| {
                self.field(
                    f,
                    &full_name,
                    &child_path(path, MESSAGE_EXTENSION, i),
                    &[],
                    &HashSet::new(),
                )
            })
            .collect();

        // Message ranges are end-exclusive in descriptors.
        let reserved_ranges = msg
            .reserved_range
            .iter()
            .map(|r| NumberRange {
                start: r.start(),
                end: r.end() - 1,
            })
            .collect();
        let extension_ranges = msg
            .extension_range
            .iter()
            .map(|r| NumberRange {
                start: r.start(),
                end: r.end() - 1,
            })
            .collect();

        let options = msg.options.as_ref();
        Message {
            name: msg.name().to_string(),
            full_name,
            fields,
            oneofs,
            messages,
            enums,
            extensions,
            reserved_ranges,
            reserved_names: msg.reserved_name.clone(),
            extension_ranges,
            map_entry: options.is_some_and(|o| o.map_entry()),
            message_set_wire_format: options.is_some_and(|o| o.message_set_wire_format()),
            no_standard_descriptor_accessor: options
                .is_some_and(|o| o.no_standard_descriptor_accessor()),
            span: self.sources.span(path),
        }
    }

    fn field(
        &self,
        field: &FieldDescriptorProto,
        scope: &str,
        path: &[i32],
        oneof_names: &[String],
        synthetic: &HashSet<i32>,
    ) -> Field {
        use field_descriptor_proto::{Label as L, Type as T};

        let label = match field.label() {
            L::LABEL_OPTIONAL => Label::Optional,
            L::LABEL_REQUIRED => Label::Required,
            L::LABEL_REPEATED => Label::Repeated,
        };
        let field_type = match field.type_() {
            T::TYPE_DOUBLE => FieldType::Double,
            T::TYPE_FLOAT => FieldType::Float,
            T::TYPE_INT64 => FieldType::Int64,
            T::TYPE_UINT64 => FieldType::Uint64,
            T::TYPE_INT32 => FieldType::Int32,
            T::TYPE_FIXED64 => FieldType::Fixed64,
            T::TYPE_FIXED32 => FieldType::Fixed32,
            T::TYPE_BOOL => FieldType::Bool,
            T::TYPE_STRING => FieldType::String,
            T::TYPE_GROUP => FieldType::Group,
            T::TYPE_MESSAGE => FieldType::Message,
            T::TYPE_BYTES => FieldType::Bytes,
            T::TYPE_UINT32 => FieldType::Uint32,
            T::TYPE_ENUM => FieldType::Enum,
            T::TYPE_SFIXED32 => FieldType::Sfixed32,
            T::TYPE_SFIXED64 => FieldType::Sfixed64,
            T::TYPE_SINT32 => FieldType::Sint32,
            T::TYPE_SINT64 => FieldType::Sint64,
        };

        let oneof = field
            .oneof_index
            .filter(|i| !synthetic.contains(i))
            .and_then(|i| oneof_names.get(i as usize).cloned());
        let is_extension = field.extendee.is_some();
        let options = field.options.as_ref();

        Field {
            name: field.name().to_string(),
            number: field.number(),
            label,
            field_type,
            type_name: field
                .type_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(strip_dot),
            oneof,
            json_name: field.json_name.clone(),
            default_value: field.default_value.clone(),
            proto3_optional: field.proto3_optional(),
            jstype: options.and_then(|o| o.jstype).map(enum_name),
            ctype: options.and_then(|o| o.ctype).map(enum_name),
            extendee: field.extendee.as_deref().map(strip_dot),
            full_name: is_extension.then(|| qualify(scope, field.name())),
            span: self.sources.span(path),
        }
    }

    fn enumeration(&self, en: &EnumDescriptorProto, scope: &str, path: &[i32]) -> Enum {
        let values = en
            .value
            .iter()
            .enumerate()
            .map(|(i, v)| EnumValue {
                name: v.name().to_string(),
                number: v.number(),
                span: self.sources.span(&child_path(path, ENUM_VALUE, i)),
            })
            .collect();

        Enum {
            name: en.name().to_string(),
            full_name: qualify(scope, en.name()),
            values,
            // Enum ranges are end-inclusive in descriptors.
            reserved_ranges: en
                .reserved_range
                .iter()
                .map(|r| NumberRange {
                    start: r.start(),
                    end: r.end(),
                })
                .collect(),
            reserved_names: en.reserved_name.clone(),
            allow_alias: en.options.as_ref().is_some_and(|o| o.allow_alias()),
            // features.enum_type is not consulted for editions files.
            closed: self.syntax == Syntax::Proto2,
            span: self.sources.span(path),
        }
    }

    fn service(&self, svc: &ServiceDescriptorProto, scope: &str, path: &[i32]) -> Service {
        let methods = svc
            .method
            .iter()
            .enumerate()
            .map(|(i, m)| Method {
                name: m.name().to_string(),
                input_type: strip_dot(m.input_type()),
                output_type: strip_dot(m.output_type()),
                client_streaming: m.client_streaming(),
                server_streaming: m.server_streaming(),
                idempotency_level: m
                    .options
                    .as_ref()
                    .and_then(|o| o.idempotency_level)
                    .filter(|l| {
                        l.enum_value() != Ok(method_options::IdempotencyLevel::IDEMPOTENCY_UNKNOWN)
                    })
                    .map(enum_name),
                span: self.sources.span(&child_path(path, SERVICE_METHOD, i)),
            })
            .collect();

        Service {
            name: svc.name().to_string(),
            full_name: qualify(scope, svc.name()),
            methods,
            span: self.sources.span(path),
        }
    }
}
