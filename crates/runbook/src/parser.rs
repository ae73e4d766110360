// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule file parsing (HCL, with TOML and JSON accepted for the same schema)
//! and directory loading.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::rule::RuleFile;

/// Rule file format, chosen by the caller or inferred from a path's
/// extension in [`load_dir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Hcl,
    Toml,
    Json,
}

impl Format {
    fn from_extension(ext: &str) -> Option<Format> {
        match ext {
            "hcl" => Some(Format::Hcl),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reading rule file {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("{path}: unrecognized rule file extension (expected .hcl, .toml, or .json)")]
    UnknownExtension { path: String },
}

/// Parse a single rule file's content in the given format.
pub fn parse_rule_file(content: &str, format: Format) -> Result<RuleFile, ParseError> {
    Ok(match format {
        Format::Hcl => hcl::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
    })
}

/// Load and merge every `.hcl`/`.toml`/`.json` file directly under `dir`, in
/// sorted filename order, so the result is deterministic and a later file
/// wins on a `(handler_type, id)` collision (see [`RuleFile::merge`]).
/// Non-rule files and subdirectories are skipped.
pub fn load_dir(dir: &Path) -> Result<RuleFile, ParseError> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(|source| ParseError::Io { path: dir.display().to_string(), source })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut merged = RuleFile::default();
    for path in paths {
        let Some(format) = path.extension().and_then(|ext| ext.to_str()).and_then(Format::from_extension) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|source| ParseError::Io { path: path.display().to_string(), source })?;
        let file = parse_rule_file(&content, format)?;
        debug!(path = %path.display(), "loaded rule file");
        merged.merge(file);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unknown_extension_is_skipped_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "not a rule file").unwrap();
        let merged = load_dir(dir.path()).unwrap();
        assert!(merged.into_descriptors().is_empty());
    }

    #[test]
    fn load_dir_merges_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = std::fs::File::create(dir.path().join("10-base.hcl")).unwrap();
        write!(a, r#"handler "deploy" "x" {{ disabled = false }}"#).unwrap();
        let mut b = std::fs::File::create(dir.path().join("20-override.hcl")).unwrap();
        write!(b, r#"handler "deploy" "x" {{ disabled = true }}"#).unwrap();

        let merged = load_dir(dir.path()).unwrap();
        let descriptors = merged.into_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert!(descriptors[0].disabled);
    }

    #[test]
    fn toml_and_json_parse_the_same_schema() {
        let toml_file = parse_rule_file(
            "[handler.deploy.x]\ndisabled = true\n",
            Format::Toml,
        )
        .unwrap();
        assert!(toml_file.into_descriptors()[0].disabled);

        let json_file = parse_rule_file(
            r#"{"handlers":{"deploy":{"x":{"disabled":true}}}}"#,
            Format::Json,
        )
        .unwrap();
        assert!(json_file.into_descriptors()[0].disabled);
    }
}
