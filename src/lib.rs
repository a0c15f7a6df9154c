pub mod canonical;
pub mod compat;
pub mod image;
pub mod normalize;
pub mod source_info;

pub use canonical::Image;
pub use compat::{BreakingConfig, BreakingError, Cancellation, Outcome, Violation};
pub use image::load_image;

use std::num::NonZeroUsize;

/// Checks whether `new` breaks consumers of `old` under `config`.
///
/// File subtrees are evaluated on as many threads as the machine offers.
/// The report is the same whatever that number is.
///
/// # Errors
///
/// Returns a [`BreakingError`] when the policy is invalid, when either
/// image repeats a declaration identity or refers to an unknown type, or
/// when a rule cannot evaluate a declaration.
pub fn check_breaking(
    old: &Image,
    new: &Image,
    config: &BreakingConfig,
) -> Result<Outcome, BreakingError> {
    let jobs = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    check_breaking_with(old, new, config, &Cancellation::new(), jobs)
}

/// Like [`check_breaking`], with an explicit cancellation token and number
/// of worker threads.
pub fn check_breaking_with(
    old: &Image,
    new: &Image,
    config: &BreakingConfig,
    cancel: &Cancellation,
    jobs: usize,
) -> Result<Outcome, BreakingError> {
    compat::engine::check(old, new, config, cancel, jobs)
}

/// Generates a semantic fingerprint for a given Protobuf file content.
///
/// The fingerprint is a SHA-256 hash of the file's canonical, semantic
/// representation, so it does not change with comments or formatting.
pub fn generate_fingerprint(proto_content: &str) -> anyhow::Result<String> {
    Image::from_proto(proto_content)?.fingerprint()
}
