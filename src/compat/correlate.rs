//! Pairs declarations of an old and a new image by identity.
//!
//! The result is a tree of file nodes. Matched nodes carry children paired
//! inside the matched scope; added and removed nodes are leaves, except
//! file and oneof nodes which group whatever the new image places in them.

use crate::canonical::{Enum, ImageFile, Message, Service};
use crate::compat::index::{Decl, DeclKey, DeclarationIndex, Entry};
use crate::compat::types::NodeKind;
use std::collections::HashSet;

/// How a declaration of one image relates to the other image.
#[derive(Debug, Clone, Copy)]
pub enum Pairing<'a> {
    Matched { old: Entry<'a>, new: Entry<'a> },
    Added { new: Entry<'a> },
    Removed { old: Entry<'a> },
}

impl<'a> Pairing<'a> {
    pub fn old(&self) -> Option<&Entry<'a>> {
        match self {
            Pairing::Matched { old, .. } | Pairing::Removed { old } => Some(old),
            Pairing::Added { .. } => None,
        }
    }

    pub fn new(&self) -> Option<&Entry<'a>> {
        match self {
            Pairing::Matched { new, .. } | Pairing::Added { new } => Some(new),
            Pairing::Removed { .. } => None,
        }
    }

    /// The newest side available.
    pub fn current(&self) -> &Entry<'a> {
        match self {
            Pairing::Matched { new, .. } | Pairing::Added { new } => new,
            Pairing::Removed { old } => old,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Pairing::Matched { .. } => "matched",
            Pairing::Added { .. } => "added",
            Pairing::Removed { .. } => "removed",
        }
    }
}

#[derive(Debug)]
pub struct CorrespondenceNode<'a> {
    pub kind: NodeKind,
    pub key: DeclKey,
    pub pairing: Pairing<'a>,
    pub children: Vec<CorrespondenceNode<'a>>,
}

impl<'a> CorrespondenceNode<'a> {
    pub fn is_matched(&self) -> bool {
        matches!(self.pairing, Pairing::Matched { .. })
    }

    pub fn symbol(&self) -> String {
        self.pairing.current().symbol()
    }

    /// Path of the file the node currently lives in.
    pub fn file_path(&self) -> &'a str {
        &self.pairing.current().file.path
    }

    pub fn package(&self) -> &'a str {
        self.pairing.current().package()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(|c| c.len()).sum::<usize>()
    }
}

/// The correspondence tree: one node per file.
#[derive(Debug, Default)]
pub struct Correspondence<'a> {
    pub files: Vec<CorrespondenceNode<'a>>,
}

impl Correspondence<'_> {
    pub fn node_count(&self) -> usize {
        self.files.iter().map(|f| f.len()).sum()
    }
}

/// Which files take part in the correlation.
#[derive(Debug, Clone, Copy)]
pub struct CorrelateOptions {
    /// Leave files marked as imports out of the comparison.
    pub exclude_imports: bool,
    /// Only compare old files that still exist in the new image.
    pub limit_to_input_files: bool,
}

impl Default for CorrelateOptions {
    fn default() -> Self {
        Self {
            exclude_imports: true,
            limit_to_input_files: false,
        }
    }
}

pub fn correlate<'a>(
    old: &DeclarationIndex<'a>,
    new: &DeclarationIndex<'a>,
    options: &CorrelateOptions,
) -> Correspondence<'a> {
    let resolver = Resolver { old, new };
    let included = |file: &&ImageFile| !(options.exclude_imports && file.is_import);

    let mut files = Vec::new();
    for file in new.image().files.iter().filter(included) {
        if let Some(node) = resolver.file_node(&file.path) {
            files.push(node);
        }
    }
    if !options.limit_to_input_files {
        for file in old.image().files.iter().filter(included) {
            let key = DeclKey::File(file.path.clone());
            if !new.contains(&key) {
                if let Some(node) = resolver.leaf(key, NodeKind::File) {
                    files.push(node);
                }
            }
        }
    }
    Correspondence { files }
}

struct Resolver<'r, 'a> {
    old: &'r DeclarationIndex<'a>,
    new: &'r DeclarationIndex<'a>,
}

impl<'a> Resolver<'_, 'a> {
    fn pairing(&self, key: &DeclKey) -> Option<Pairing<'a>> {
        match (self.old.get(key), self.new.get(key)) {
            (Some(old), Some(new)) => Some(Pairing::Matched {
                old: *old,
                new: *new,
            }),
            (Some(old), None) => Some(Pairing::Removed { old: *old }),
            (None, Some(new)) => Some(Pairing::Added { new: *new }),
            (None, None) => None,
        }
    }

    fn leaf(&self, key: DeclKey, kind: NodeKind) -> Option<CorrespondenceNode<'a>> {
        let pairing = self.pairing(&key)?;
        Some(CorrespondenceNode {
            kind,
            key,
            pairing,
            children: Vec::new(),
        })
    }

    /// A node whose children are paired when both sides exist.
    fn node(&self, key: DeclKey, kind: NodeKind) -> Option<CorrespondenceNode<'a>> {
        let mut node = self.leaf(key, kind)?;
        if let Pairing::Matched { old, new } = node.pairing {
            node.children = match (old.decl, new.decl) {
                (Decl::Message(o), Decl::Message(n)) => self.message_children(o, n),
                (Decl::Enum(o), Decl::Enum(n)) => self.enum_children(o, n),
                (Decl::Service(o), Decl::Service(n)) => self.service_children(o, n),
                _ => Vec::new(),
            };
        }
        Some(node)
    }

    /// Old-only declarations, in old order, as removed leaves.
    fn removed<I>(&self, keys: I, kind: NodeKind) -> Vec<CorrespondenceNode<'a>>
    where
        I: IntoIterator<Item = DeclKey>,
    {
        keys.into_iter()
            .filter(|key| !self.new.contains(key))
            .filter_map(|key| self.leaf(key, kind))
            .collect()
    }

    fn file_node(&self, path: &str) -> Option<CorrespondenceNode<'a>> {
        let key = DeclKey::File(path.to_string());
        let mut node = self.leaf(key, NodeKind::File)?;
        let new_file = node.pairing.new().and_then(|e| e.decl.as_file());
        let old_file = node.pairing.old().and_then(|e| e.decl.as_file());

        let mut children = Vec::new();
        if let Some(file) = new_file {
            children.extend(top_level_keys(file).filter_map(|(key, kind)| self.node(key, kind)));
        }
        if let (Some(file), Some(_)) = (old_file, new_file) {
            for (key, kind) in top_level_keys(file) {
                if !self.new.contains(&key) {
                    children.extend(self.leaf(key, kind));
                }
            }
        }
        node.children = children;
        Some(node)
    }

    fn message_children(&self, old: &'a Message, new: &'a Message) -> Vec<CorrespondenceNode<'a>> {
        let scope = &new.full_name;
        let field_key = |number: i32| DeclKey::Field {
            message: scope.clone(),
            number,
        };

        let mut children = Vec::new();
        let mut emitted_oneofs = HashSet::new();
        for field in &new.fields {
            match &field.oneof {
                Some(oneof) => {
                    if emitted_oneofs.insert(oneof.as_str()) {
                        children.extend(self.oneof_node(old, new, oneof));
                    }
                }
                None => children.extend(self.leaf(field_key(field.number), NodeKind::Field)),
            }
        }

        // Removed fields of a surviving oneof are listed under that oneof.
        let removed_fields = old
            .fields
            .iter()
            .filter(|f| match &f.oneof {
                Some(oneof) => new.oneof(oneof).is_none(),
                None => true,
            })
            .map(|f| field_key(f.number));
        children.extend(self.removed(removed_fields, NodeKind::Field));

        let removed_oneofs = old.oneofs.iter().map(|o| DeclKey::Oneof {
            message: scope.clone(),
            name: o.name.clone(),
        });
        children.extend(self.removed(removed_oneofs, NodeKind::Oneof));

        for nested in &new.messages {
            children.extend(self.node(DeclKey::Message(nested.full_name.clone()), NodeKind::Message));
        }
        children.extend(self.removed(
            old.messages
                .iter()
                .map(|m| DeclKey::Message(m.full_name.clone())),
            NodeKind::Message,
        ));

        for en in &new.enums {
            children.extend(self.node(DeclKey::Enum(en.full_name.clone()), NodeKind::Enum));
        }
        children.extend(self.removed(
            old.enums.iter().map(|e| DeclKey::Enum(e.full_name.clone())),
            NodeKind::Enum,
        ));

        for extension in &new.extensions {
            children.extend(self.leaf(extension_key(extension), NodeKind::Extension));
        }
        children.extend(self.removed(
            old.extensions.iter().map(extension_key),
            NodeKind::Extension,
        ));

        children
    }

    fn oneof_node(
        &self,
        old: &'a Message,
        new: &'a Message,
        name: &str,
    ) -> Option<CorrespondenceNode<'a>> {
        let scope = &new.full_name;
        let key = DeclKey::Oneof {
            message: scope.clone(),
            name: name.to_string(),
        };
        let mut node = self.leaf(key, NodeKind::Oneof)?;
        let field_key = |number: i32| DeclKey::Field {
            message: scope.clone(),
            number,
        };

        let mut children: Vec<_> = new
            .fields
            .iter()
            .filter(|f| f.oneof.as_deref() == Some(name))
            .filter_map(|f| self.leaf(field_key(f.number), NodeKind::Field))
            .collect();
        if node.is_matched() {
            let removed = old
                .fields
                .iter()
                .filter(|f| f.oneof.as_deref() == Some(name))
                .map(|f| field_key(f.number));
            children.extend(self.removed(removed, NodeKind::Field));
        }
        node.children = children;
        Some(node)
    }

    fn enum_children(&self, old: &'a Enum, new: &'a Enum) -> Vec<CorrespondenceNode<'a>> {
        let value_keys = |en: &'a Enum| {
            let mut seen = HashSet::new();
            en.values
                .iter()
                .filter(move |v| seen.insert(v.number))
                .map(move |v| DeclKey::EnumValue {
                    parent: en.full_name.clone(),
                    number: v.number,
                })
        };
        let mut children: Vec<_> = value_keys(new)
            .filter_map(|key| self.leaf(key, NodeKind::EnumValue))
            .collect();
        children.extend(self.removed(value_keys(old), NodeKind::EnumValue));
        children
    }

    fn service_children(&self, old: &'a Service, new: &'a Service) -> Vec<CorrespondenceNode<'a>> {
        let method_keys = |service: &'a Service| {
            service.methods.iter().map(move |m| DeclKey::Method {
                service: service.full_name.clone(),
                name: m.name.clone(),
            })
        };
        let mut children: Vec<_> = method_keys(new)
            .filter_map(|key| self.leaf(key, NodeKind::Method))
            .collect();
        children.extend(self.removed(method_keys(old), NodeKind::Method));
        children
    }
}

fn extension_key(extension: &crate::canonical::Field) -> DeclKey {
    DeclKey::Extension {
        extendee: extension.extendee.clone().unwrap_or_default(),
        number: extension.number,
    }
}

/// Top-level declarations of a file in declaration order, grouped by kind.
fn top_level_keys(file: &ImageFile) -> impl Iterator<Item = (DeclKey, NodeKind)> + '_ {
    let messages = file
        .messages
        .iter()
        .map(|m| (DeclKey::Message(m.full_name.clone()), NodeKind::Message));
    let enums = file
        .enums
        .iter()
        .map(|e| (DeclKey::Enum(e.full_name.clone()), NodeKind::Enum));
    let services = file
        .services
        .iter()
        .map(|s| (DeclKey::Service(s.full_name.clone()), NodeKind::Service));
    let extensions = file
        .extensions
        .iter()
        .map(|f| (extension_key(f), NodeKind::Extension));
    messages.chain(enums).chain(services).chain(extensions)
}
