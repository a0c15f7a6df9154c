//! Service and RPC rules

use crate::canonical::Method;
use crate::compat::handlers::{RuleInput, scope_description};
use crate::compat::index::Decl;
use crate::compat::types::RuleResult;

pub fn check_service_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(service) = input.removed(Decl::as_service)? else {
        return Ok(Vec::new());
    };
    let Some(old) = input.old_entry() else {
        return Ok(Vec::new());
    };
    input.report(format!(
        "Previously present service \"{}\" was deleted from {}.",
        service.full_name,
        scope_description(old)
    ))
}

/// Reported on the service, since the method has no new declaration.
pub fn check_rpc_no_delete(input: &RuleInput<'_, '_>) -> RuleResult {
    let Some(method) = input.removed(Decl::as_method)? else {
        return Ok(Vec::new());
    };
    let Some(service) = input.old_entry().and_then(|e| e.parent_service()) else {
        return Err(input.unexpected_shape());
    };
    input.report(format!(
        "Previously present RPC \"{}\" on service \"{}\" was deleted.",
        method.name, service.full_name
    ))
}

fn method_change(
    input: &RuleInput<'_, '_>,
    what: &str,
    value: impl Fn(&Method) -> String,
) -> RuleResult {
    let Some((old, new)) = input.matched(Decl::as_method)? else {
        return Ok(Vec::new());
    };
    let (before, after) = (value(old), value(new));
    if before == after {
        return Ok(Vec::new());
    }
    let service = input
        .new_entry()
        .and_then(|e| e.parent_service())
        .map(|s| s.full_name.as_str())
        .unwrap_or_default();
    input.report(format!(
        "RPC \"{}\" on service \"{service}\" changed {what} from \"{before}\" to \"{after}\".",
        new.name
    ))
}

pub fn check_rpc_same_request_type(input: &RuleInput<'_, '_>) -> RuleResult {
    method_change(input, "request type", |m| m.input_type.clone())
}

pub fn check_rpc_same_response_type(input: &RuleInput<'_, '_>) -> RuleResult {
    method_change(input, "response type", |m| m.output_type.clone())
}

pub fn check_rpc_same_streaming(input: &RuleInput<'_, '_>) -> RuleResult {
    method_change(input, "streaming", |m| m.streaming_mode().to_string())
}

pub fn check_rpc_same_idempotency_level(input: &RuleInput<'_, '_>) -> RuleResult {
    method_change(input, "option \"idempotency_level\"", |m| {
        m.idempotency_level
            .clone()
            .unwrap_or_else(|| "IDEMPOTENCY_UNKNOWN".to_string())
    })
}
