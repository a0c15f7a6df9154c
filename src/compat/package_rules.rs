//! Package-level deletion
//!
//! A removed file node has no children, so the declarations it took with
//! it are read from the old file directly.

use crate::canonical::ImageFile;
use crate::compat::handlers::RuleInput;
use crate::compat::index::{Decl, DeclKey};
use crate::compat::types::RuleResult;

pub fn check_package_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(file) = input.removed(Decl::as_file)? else {
        return Ok(Vec::new());
    };
    let findings = deleted_declarations(file)
        .filter(|(key, _, _)| !input.new.contains(key))
        .map(|(_, what, name)| {
            input.finding(format!(
                "Previously present {what} \"{name}\" was deleted from package \"{}\".",
                file.package
            ))
        })
        .collect();
    Ok(findings)
}

fn deleted_declarations(
    file: &ImageFile,
) -> impl Iterator<Item = (DeclKey, &'static str, &str)> + '_ {
    let messages = file
        .messages
        .iter()
        .map(|m| (DeclKey::Message(m.full_name.clone()), "message", m.full_name.as_str()));
    let enums = file
        .enums
        .iter()
        .map(|e| (DeclKey::Enum(e.full_name.clone()), "enum", e.full_name.as_str()));
    let services = file
        .services
        .iter()
        .map(|s| (DeclKey::Service(s.full_name.clone()), "service", s.full_name.as_str()));
    let extensions = file.extensions.iter().map(|f| {
        (
            DeclKey::Extension {
                extendee: f.extendee.clone().unwrap_or_default(),
                number: f.number,
            },
            "extension",
            f.full_name.as_deref().unwrap_or(f.name.as_str()),
        )
    });
    messages.chain(enums).chain(services).chain(extensions)
}
