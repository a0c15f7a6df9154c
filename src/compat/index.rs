//! Declaration index: every declaration of an image keyed by its stable
//! identity.
//!
//! Fields and extensions are keyed by number, not name, so a rename keeps
//! the identity and a renumber does not.

use crate::canonical::{
    Enum, EnumValue, Field, Image, ImageFile, Message, Method, Oneof, Service, Span,
};
use crate::compat::error::BreakingError;
use crate::compat::types::NodeKind;
use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;

/// Stable identity used to match declarations across images.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKey {
    File(String),
    Message(String),
    Enum(String),
    Service(String),
    Field { message: String, number: i32 },
    Extension { extendee: String, number: i32 },
    EnumValue { parent: String, number: i32 },
    Method { service: String, name: String },
    Oneof { message: String, name: String },
}

impl std::fmt::Display for DeclKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclKey::File(path) => write!(f, "file {path}"),
            DeclKey::Message(name) => write!(f, "message {name}"),
            DeclKey::Enum(name) => write!(f, "enum {name}"),
            DeclKey::Service(name) => write!(f, "service {name}"),
            DeclKey::Field { message, number } => write!(f, "field {message}#{number}"),
            DeclKey::Extension { extendee, number } => write!(f, "extension {extendee}#{number}"),
            DeclKey::EnumValue { parent, number } => write!(f, "enum value {parent}#{number}"),
            DeclKey::Method { service, name } => write!(f, "method {service}.{name}"),
            DeclKey::Oneof { message, name } => write!(f, "oneof {message}.{name}"),
        }
    }
}

/// Borrowed view of one declaration.
#[derive(Debug, Clone, Copy)]
pub enum Decl<'a> {
    File(&'a ImageFile),
    Message(&'a Message),
    Field(&'a Field),
    Oneof(&'a Oneof),
    Enum(&'a Enum),
    EnumValue(&'a EnumValue),
    Service(&'a Service),
    Method(&'a Method),
    Extension(&'a Field),
}

impl<'a> Decl<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Decl::File(_) => NodeKind::File,
            Decl::Message(_) => NodeKind::Message,
            Decl::Field(_) => NodeKind::Field,
            Decl::Oneof(_) => NodeKind::Oneof,
            Decl::Enum(_) => NodeKind::Enum,
            Decl::EnumValue(_) => NodeKind::EnumValue,
            Decl::Service(_) => NodeKind::Service,
            Decl::Method(_) => NodeKind::Method,
            Decl::Extension(_) => NodeKind::Extension,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::File(f) => f.span,
            Decl::Message(m) => m.span,
            Decl::Field(f) | Decl::Extension(f) => f.span,
            Decl::Oneof(o) => o.span,
            Decl::Enum(e) => e.span,
            Decl::EnumValue(v) => v.span,
            Decl::Service(s) => s.span,
            Decl::Method(m) => m.span,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Decl::File(f) => &f.path,
            Decl::Message(m) => &m.name,
            Decl::Field(f) | Decl::Extension(f) => &f.name,
            Decl::Oneof(o) => &o.name,
            Decl::Enum(e) => &e.name,
            Decl::EnumValue(v) => &v.name,
            Decl::Service(s) => &s.name,
            Decl::Method(m) => &m.name,
        }
    }

    pub fn as_file(&self) -> Option<&'a ImageFile> {
        match self {
            Decl::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&'a Message> {
        match self {
            Decl::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Fields and extensions.
    pub fn as_field(&self) -> Option<&'a Field> {
        match self {
            Decl::Field(f) | Decl::Extension(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_oneof(&self) -> Option<&'a Oneof> {
        match self {
            Decl::Oneof(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&'a Enum> {
        match self {
            Decl::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_enum_value(&self) -> Option<&'a EnumValue> {
        match self {
            Decl::EnumValue(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&'a Service> {
        match self {
            Decl::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&'a Method> {
        match self {
            Decl::Method(m) => Some(m),
            _ => None,
        }
    }
}

/// An indexed declaration with its file and enclosing declaration.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub decl: Decl<'a>,
    pub file: &'a ImageFile,
    /// Enclosing message, enum or service. `None` at file scope.
    pub parent: Option<Decl<'a>>,
}

impl<'a> Entry<'a> {
    /// Fully-qualified name used for symbol exclusions and reporting.
    pub fn symbol(&self) -> String {
        let scoped = |parent: Option<Decl<'a>>, name: &str| match parent {
            Some(Decl::Message(m)) => format!("{}.{name}", m.full_name),
            Some(Decl::Enum(e)) => format!("{}.{name}", e.full_name),
            Some(Decl::Service(s)) => format!("{}.{name}", s.full_name),
            _ => qualify(&self.file.package, name),
        };
        match self.decl {
            Decl::File(f) => f.path.clone(),
            Decl::Message(m) => m.full_name.clone(),
            Decl::Enum(e) => e.full_name.clone(),
            Decl::Service(s) => s.full_name.clone(),
            Decl::Extension(f) => f
                .full_name
                .clone()
                .unwrap_or_else(|| scoped(self.parent, &f.name)),
            other => scoped(self.parent, other.name()),
        }
    }

    pub fn package(&self) -> &'a str {
        &self.file.package
    }

    pub fn parent_message(&self) -> Option<&'a Message> {
        self.parent.and_then(|p| p.as_message())
    }

    pub fn parent_enum(&self) -> Option<&'a Enum> {
        self.parent.and_then(|p| p.as_enum())
    }

    pub fn parent_service(&self) -> Option<&'a Service> {
        self.parent.and_then(|p| p.as_service())
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// Lookup table of every declaration in one image.
#[derive(Debug)]
pub struct DeclarationIndex<'a> {
    image: &'a Image,
    entries: HashMap<DeclKey, Entry<'a>>,
}

impl<'a> DeclarationIndex<'a> {
    /// Indexes `image`, then checks that every type reference resolves.
    pub fn build(image: &'a Image) -> Result<Self, BreakingError> {
        let mut index = DeclarationIndex {
            image,
            entries: HashMap::new(),
        };
        for file in &image.files {
            index.insert(DeclKey::File(file.path.clone()), Decl::File(file), file, None)?;
            for message in &file.messages {
                index.insert_message(message, file, None)?;
            }
            for en in &file.enums {
                index.insert_enum(en, file, None)?;
            }
            for service in &file.services {
                index.insert_service(service, file)?;
            }
            for extension in &file.extensions {
                index.insert_extension(extension, file, None)?;
            }
        }
        index.check_references()?;
        Ok(index)
    }

    pub fn image(&self) -> &'a Image {
        self.image
    }

    pub fn get(&self, key: &DeclKey) -> Option<&Entry<'a>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &DeclKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn message(&self, full_name: &str) -> Option<&'a Message> {
        self.entries
            .get(&DeclKey::Message(full_name.to_string()))
            .and_then(|e| e.decl.as_message())
    }

    pub fn enumeration(&self, full_name: &str) -> Option<&'a Enum> {
        self.entries
            .get(&DeclKey::Enum(full_name.to_string()))
            .and_then(|e| e.decl.as_enum())
    }

    fn insert(
        &mut self,
        key: DeclKey,
        decl: Decl<'a>,
        file: &'a ImageFile,
        parent: Option<Decl<'a>>,
    ) -> Result<(), BreakingError> {
        match self.entries.entry(key) {
            MapEntry::Occupied(occupied) => Err(BreakingError::DuplicateIdentity {
                key: occupied.key().to_string(),
                file: file.path.clone(),
            }),
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry { decl, file, parent });
                Ok(())
            }
        }
    }

    fn insert_message(
        &mut self,
        message: &'a Message,
        file: &'a ImageFile,
        parent: Option<&'a Message>,
    ) -> Result<(), BreakingError> {
        let parent_decl = parent.map(Decl::Message);
        self.insert(
            DeclKey::Message(message.full_name.clone()),
            Decl::Message(message),
            file,
            parent_decl,
        )?;

        let scope = Some(Decl::Message(message));
        for field in &message.fields {
            let key = DeclKey::Field {
                message: message.full_name.clone(),
                number: field.number,
            };
            self.insert(key, Decl::Field(field), file, scope)?;
        }
        for oneof in &message.oneofs {
            let key = DeclKey::Oneof {
                message: message.full_name.clone(),
                name: oneof.name.clone(),
            };
            self.insert(key, Decl::Oneof(oneof), file, scope)?;
        }
        for nested in &message.messages {
            self.insert_message(nested, file, Some(message))?;
        }
        for en in &message.enums {
            self.insert_enum(en, file, Some(message))?;
        }
        for extension in &message.extensions {
            self.insert_extension(extension, file, Some(message))?;
        }
        Ok(())
    }

    fn insert_enum(
        &mut self,
        en: &'a Enum,
        file: &'a ImageFile,
        parent: Option<&'a Message>,
    ) -> Result<(), BreakingError> {
        self.insert(
            DeclKey::Enum(en.full_name.clone()),
            Decl::Enum(en),
            file,
            parent.map(Decl::Message),
        )?;
        for value in &en.values {
            let key = DeclKey::EnumValue {
                parent: en.full_name.clone(),
                number: value.number,
            };
            // Aliases share one identity; the first declared name is canonical.
            if en.allow_alias && self.entries.contains_key(&key) {
                continue;
            }
            self.insert(key, Decl::EnumValue(value), file, Some(Decl::Enum(en)))?;
        }
        Ok(())
    }

    fn insert_service(
        &mut self,
        service: &'a Service,
        file: &'a ImageFile,
    ) -> Result<(), BreakingError> {
        self.insert(
            DeclKey::Service(service.full_name.clone()),
            Decl::Service(service),
            file,
            None,
        )?;
        for method in &service.methods {
            let key = DeclKey::Method {
                service: service.full_name.clone(),
                name: method.name.clone(),
            };
            self.insert(key, Decl::Method(method), file, Some(Decl::Service(service)))?;
        }
        Ok(())
    }

    fn insert_extension(
        &mut self,
        extension: &'a Field,
        file: &'a ImageFile,
        parent: Option<&'a Message>,
    ) -> Result<(), BreakingError> {
        let key = DeclKey::Extension {
            extendee: extension.extendee.clone().unwrap_or_default(),
            number: extension.number,
        };
        self.insert(key, Decl::Extension(extension), file, parent.map(Decl::Message))
    }

    fn resolves(&self, type_name: &str) -> bool {
        self.message(type_name).is_some() || self.enumeration(type_name).is_some()
    }

    fn check_references(&self) -> Result<(), BreakingError> {
        // Sorted so the reported error does not depend on map order.
        let mut entries: Vec<(&DeclKey, &Entry<'a>)> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (_, entry) in entries {
            let unresolved = |target: &str| BreakingError::UnresolvedReference {
                from: entry.symbol(),
                target: target.to_string(),
            };
            match entry.decl {
                Decl::Field(field) | Decl::Extension(field) => {
                    if field.field_type.is_named() {
                        let target = field.type_name.as_deref().unwrap_or_default();
                        if !self.resolves(target) {
                            return Err(unresolved(target));
                        }
                    }
                    if let Some(extendee) = field.extendee.as_deref() {
                        if self.message(extendee).is_none() {
                            return Err(unresolved(extendee));
                        }
                    }
                }
                Decl::Method(method) => {
                    for target in [&method.input_type, &method.output_type] {
                        if self.message(target).is_none() {
                            return Err(unresolved(target));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
