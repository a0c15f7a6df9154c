//! Building images from `.proto` sources, directories and serialized
//! `FileDescriptorSet`s.

use crate::canonical::Image;
use crate::normalize;
use crate::source_info;
use anyhow::{Context, bail};
use protobuf::Message as _;
use protobuf::descriptor::FileDescriptorSet;
use protobuf_parse::Parser;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name given to the single file parsed by [`Image::from_proto`].
pub const DEFAULT_FILE_NAME: &str = "input.proto";

const DESCRIPTOR_SET_EXTENSIONS: &[&str] = &["binpb", "pb", "bin"];

impl Image {
    /// Builds an image from a descriptor set. Files named in `inputs` are
    /// inputs and everything else is an import; with no list every file is
    /// an input.
    pub fn from_descriptor_set(set: &FileDescriptorSet, inputs: Option<&HashSet<String>>) -> Self {
        let files = set
            .file
            .iter()
            .map(|fd| {
                let is_import = inputs.is_some_and(|names| !names.contains(fd.name()));
                normalize::normalize_file(fd, is_import)
            })
            .collect();
        Image { files }
    }

    /// Parses a single in-memory file named [`DEFAULT_FILE_NAME`].
    pub fn from_proto(content: &str) -> anyhow::Result<Self> {
        Self::from_sources(&[(DEFAULT_FILE_NAME, content)])
    }

    /// Parses in-memory files given as `(relative path, content)` pairs.
    ///
    /// Imports that are not among the sources and are not well-known types
    /// are satisfied with empty placeholder files, which end up marked as
    /// imports.
    pub fn from_sources(sources: &[(&str, &str)]) -> anyhow::Result<Self> {
        // The parser works with the filesystem, so the sources are staged in
        // a temporary directory.
        let temp_dir = tempfile::tempdir().context("Failed to create temp directory")?;
        let provided: HashSet<&str> = sources.iter().map(|(path, _)| *path).collect();

        for (path, content) in sources {
            write_source(temp_dir.path(), path, content)?;
            for import in imports_of(content) {
                if import.starts_with("google/protobuf/") || provided.contains(import) {
                    continue;
                }
                let placeholder = temp_dir.path().join(import);
                if !placeholder.exists() {
                    write_source(temp_dir.path(), import, "syntax = \"proto3\";")?;
                }
            }
        }

        let relative: Vec<String> = sources.iter().map(|(p, _)| p.to_string()).collect();
        parse_tree(temp_dir.path(), &relative)
    }

    /// SHA-256 over the canonical JSON form of the image.
    ///
    /// Source spans are not part of the canonical form, so the fingerprint
    /// does not change with comments or formatting.
    pub fn fingerprint(&self) -> anyhow::Result<String> {
        let json = serde_json::to_string(self)
            .context("Failed to serialize canonical representation to JSON")?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Loads an image from a `.proto` file, a directory of `.proto` files or a
/// serialized `FileDescriptorSet`.
pub fn load_image(path: &Path) -> anyhow::Result<Image> {
    if path.is_dir() {
        let relative = collect_protos(path)?;
        if relative.is_empty() {
            bail!("no .proto files found under '{}'", path.display());
        }
        tracing::debug!(root = %path.display(), files = relative.len(), "parsing proto directory");
        return parse_tree(path, &relative);
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if DESCRIPTOR_SET_EXTENSIONS.contains(&extension) {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read descriptor set '{}'", path.display()))?;
        let set = FileDescriptorSet::parse_from_bytes(&bytes)
            .with_context(|| format!("Invalid FileDescriptorSet in '{}'", path.display()))?;
        return Ok(Image::from_descriptor_set(&set, None));
    }

    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid proto file path '{}'", path.display()))?;
    parse_tree(root, &[name.to_string()])
}

fn parse_tree(root: &Path, relative: &[String]) -> anyhow::Result<Image> {
    let inputs: Vec<PathBuf> = relative.iter().map(|r| root.join(r)).collect();
    let mut set = Parser::new()
        .pure()
        .include(root)
        .inputs(&inputs)
        .file_descriptor_set()
        .context("Protobuf parsing failed")?;

    // Well-known types are bundled with the parser and have no file here.
    for file in set.file.iter_mut() {
        if file.source_code_info.is_some() {
            continue;
        }
        if let Ok(content) = std::fs::read_to_string(root.join(file.name())) {
            source_info::attach(&content, file);
        }
    }

    let names: HashSet<String> = relative.iter().cloned().collect();
    Ok(Image::from_descriptor_set(&set, Some(&names)))
}

fn write_source(root: &Path, relative: &str, content: &str) -> anyhow::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent dirs for '{relative}'"))?;
    }
    std::fs::write(&path, content).with_context(|| format!("Failed to write '{relative}'"))
}

fn imports_of(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter_map(|line| {
        let rest = line.trim().strip_prefix("import ")?;
        let rest = rest
            .trim_start()
            .trim_start_matches("public ")
            .trim_start_matches("weak ");
        Some(rest.trim().trim_end_matches(';').trim().trim_matches('"'))
    })
}

fn collect_protos(root: &Path) -> anyhow::Result<Vec<String>> {
    let mut relative = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk '{}'", root.display()))?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|e| e != "proto") {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        relative.push(rel.to_string_lossy().replace('\\', "/"));
    }
    relative.sort();
    Ok(relative)
}
