//! Shared helpers for rule implementations: the rule input, report
//! locations and the scalar compatibility tables.

use crate::canonical::{Field, FieldType, Label, NumberRange, Span, Syntax};
use crate::compat::correlate::{CorrespondenceNode, Pairing};
use crate::compat::index::{Decl, DeclKey, DeclarationIndex, Entry};
use crate::compat::policy::Policy;
use crate::compat::types::{Finding, RuleFault, RuleResult, SourceRef};

/// Everything a rule may look at when it runs on one node.
pub struct RuleInput<'r, 'a> {
    pub node: &'r CorrespondenceNode<'a>,
    /// Enclosing nodes, outermost first.
    pub ancestors: &'r [&'r CorrespondenceNode<'a>],
    pub old: &'r DeclarationIndex<'a>,
    pub new: &'r DeclarationIndex<'a>,
    pub policy: &'r Policy,
}

impl<'a> RuleInput<'_, 'a> {
    /// Both sides of a matched node viewed through `view`.
    pub fn matched<T>(
        &self,
        view: impl Fn(&Decl<'a>) -> Option<T>,
    ) -> Result<Option<(T, T)>, RuleFault> {
        match &self.node.pairing {
            Pairing::Matched { old, new } => match (view(&old.decl), view(&new.decl)) {
                (Some(o), Some(n)) => Ok(Some((o, n))),
                _ => Err(self.unexpected_shape()),
            },
            _ => Ok(None),
        }
    }

    /// The old side of a removed node viewed through `view`.
    pub fn removed<T>(&self, view: impl Fn(&Decl<'a>) -> Option<T>) -> Result<Option<T>, RuleFault> {
        match &self.node.pairing {
            Pairing::Removed { old } => view(&old.decl).map(Some).ok_or_else(|| self.unexpected_shape()),
            _ => Ok(None),
        }
    }

    /// The new side of an added node viewed through `view`.
    pub fn added<T>(&self, view: impl Fn(&Decl<'a>) -> Option<T>) -> Result<Option<T>, RuleFault> {
        match &self.node.pairing {
            Pairing::Added { new } => view(&new.decl).map(Some).ok_or_else(|| self.unexpected_shape()),
            _ => Ok(None),
        }
    }

    pub fn old_entry(&self) -> Option<&Entry<'a>> {
        self.node.pairing.old()
    }

    pub fn new_entry(&self) -> Option<&Entry<'a>> {
        self.node.pairing.new()
    }

    pub fn unexpected_shape(&self) -> RuleFault {
        RuleFault::new(format!(
            "unexpected declaration shape for {} node {}",
            self.node.kind.id(),
            self.node.key
        ))
    }

    /// Where findings on this node are reported.
    ///
    /// Matched and added nodes point at the new declaration. A removed
    /// field points at a same-named field of the new message when there is
    /// one, otherwise at the message. Other removed declarations point at
    /// their nearest ancestor that still exists; a removed file at its old
    /// path.
    pub fn location(&self) -> SourceRef {
        match &self.node.pairing {
            Pairing::Matched { new, .. } | Pairing::Added { new } => {
                SourceRef::new(new.file.path.as_str(), new.decl.span())
            }
            Pairing::Removed { old } => self.removed_location(old),
        }
    }

    fn removed_location(&self, old: &Entry<'a>) -> SourceRef {
        if let (Decl::Field(field), Some(parent)) = (old.decl, old.parent_message()) {
            let key = DeclKey::Message(parent.full_name.clone());
            if let Some(entry) = self.new.get(&key) {
                if let Some(message) = entry.decl.as_message() {
                    let span = message
                        .field_by_name(&field.name)
                        .map(|f| f.span)
                        .unwrap_or(message.span);
                    return SourceRef::new(entry.file.path.as_str(), span);
                }
            }
        }
        self.ancestors
            .iter()
            .rev()
            .find_map(|a| {
                a.pairing
                    .new()
                    .map(|e| SourceRef::new(e.file.path.as_str(), e.decl.span()))
            })
            .unwrap_or_else(|| SourceRef::new(old.file.path.as_str(), Span::default()))
    }

    pub fn finding(&self, message: impl Into<String>) -> Finding {
        Finding {
            location: self.location(),
            message: message.into(),
        }
    }

    /// A single finding at the node's location.
    pub fn report(&self, message: impl Into<String>) -> RuleResult {
        Ok(vec![self.finding(message)])
    }
}

/// Describes the scope a declaration lived in, for deletion messages.
pub fn scope_description(entry: &Entry<'_>) -> String {
    match entry.parent {
        Some(Decl::Message(m)) => format!("message \"{}\"", m.full_name),
        Some(Decl::Enum(e)) => format!("enum \"{}\"", e.full_name),
        Some(Decl::Service(s)) => format!("service \"{}\"", s.full_name),
        _ => format!("file \"{}\"", entry.file.path),
    }
}

/// Name of the message or extendee a field belongs to.
pub fn field_owner(entry: &Entry<'_>, field: &Field) -> String {
    match (&field.extendee, entry.parent_message()) {
        (Some(extendee), _) => extendee.clone(),
        (None, Some(message)) => message.full_name.clone(),
        (None, None) => String::new(),
    }
}

// ========================================
// Cardinality
// ========================================

/// Cardinality as users see it. Singular proto3 scalars without `optional`
/// have implicit presence.
pub fn cardinality(field: &Field, syntax: Syntax) -> &'static str {
    match field.label {
        Label::Repeated => "repeated",
        Label::Required => "required",
        Label::Optional => {
            let implicit = syntax == Syntax::Proto3
                && !field.proto3_optional
                && field.oneof.is_none()
                && !matches!(field.field_type, FieldType::Message | FieldType::Group);
            if implicit { "implicit" } else { "optional" }
        }
    }
}

/// Repeated and singular only interchange on the wire for length-delimited
/// values; required changes never do.
pub fn are_cardinalities_wire_compatible(old: &Field, new: &Field) -> bool {
    if (old.label == Label::Required) != (new.label == Label::Required) {
        return false;
    }
    let old_repeated = old.label == Label::Repeated;
    let new_repeated = new.label == Label::Repeated;
    old_repeated == new_repeated
        || (old.field_type.is_length_delimited() && new.field_type.is_length_delimited())
}

pub fn are_cardinalities_wire_json_compatible(old: &Field, new: &Field) -> bool {
    (old.label == Label::Required) == (new.label == Label::Required)
        && (old.label == Label::Repeated) == (new.label == Label::Repeated)
}

// ========================================
// Scalar Types
// ========================================

fn wire_group(field_type: FieldType) -> Option<u8> {
    match field_type {
        FieldType::Int32
        | FieldType::Int64
        | FieldType::Uint32
        | FieldType::Uint64
        | FieldType::Bool
        | FieldType::Enum => Some(0),
        FieldType::Sint32 | FieldType::Sint64 => Some(1),
        FieldType::Fixed32 | FieldType::Sfixed32 => Some(2),
        FieldType::Fixed64 | FieldType::Sfixed64 => Some(3),
        FieldType::String | FieldType::Bytes => Some(4),
        _ => None,
    }
}

fn wire_json_group(field_type: FieldType) -> Option<u8> {
    match field_type {
        FieldType::Int32 | FieldType::Uint32 => Some(0),
        FieldType::Int64 | FieldType::Uint64 => Some(1),
        FieldType::Fixed32 | FieldType::Sfixed32 => Some(2),
        FieldType::Fixed64 | FieldType::Sfixed64 => Some(3),
        _ => None,
    }
}

pub fn is_same_type(old: &Field, new: &Field) -> bool {
    old.field_type == new.field_type
        && (!old.field_type.is_named() || old.type_name == new.type_name)
}

/// Whether the binary encoding of `old` can be read as `new`.
pub fn are_types_wire_compatible(old: &Field, new: &Field) -> bool {
    if old.field_type == new.field_type {
        return !old.field_type.is_named() || old.type_name == new.type_name;
    }
    matches!(
        (wire_group(old.field_type), wire_group(new.field_type)),
        (Some(a), Some(b)) if a == b
    )
}

/// Whether both the binary and the JSON encoding of `old` can be read as `new`.
pub fn are_types_wire_json_compatible(old: &Field, new: &Field) -> bool {
    if old.field_type == new.field_type {
        return !old.field_type.is_named() || old.type_name == new.type_name;
    }
    matches!(
        (wire_json_group(old.field_type), wire_json_group(new.field_type)),
        (Some(a), Some(b)) if a == b
    )
}

// ========================================
// Ranges
// ========================================

/// Whether every number of `range` lies inside `ranges`.
pub fn is_range_covered(range: &NumberRange, ranges: &[NumberRange]) -> bool {
    let mut sorted = ranges.to_vec();
    sorted.sort();
    let mut next = i64::from(range.start);
    for candidate in sorted {
        if i64::from(candidate.start) > next {
            break;
        }
        next = next.max(i64::from(candidate.end) + 1);
        if next > i64::from(range.end) {
            return true;
        }
    }
    next > i64::from(range.end)
}
