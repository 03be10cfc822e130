//! On-disk layout contract.
//!
//! Canonical paths are `{workspace-name}/releases/{release-id}/{file-name}`.
//! File names may contain `/` (nested output directories) but must never
//! escape the release directory; this module is the single place that
//! validates and builds those paths. The layout is shared with existing
//! deployments and must be preserved bit-for-bit.

use pubgate_core::error::AppError;
use pubgate_core::result::AppResult;
use pubgate_core::types::id::ReleaseId;
use uuid::Uuid;

/// Prefix for in-flight temporary files, inside the same provider root so
/// the final rename is a same-filesystem atomic move.
pub const TEMP_PREFIX: &str = "tmp";

/// Validate a researcher-facing file name.
///
/// Accepts nested relative paths; rejects anything that could resolve
/// outside the release directory.
pub fn validate_file_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("file name must not be empty"));
    }
    if name.starts_with('/') {
        return Err(AppError::validation(format!(
            "file name must be relative: {name:?}"
        )));
    }
    if name.contains('\\') {
        return Err(AppError::validation(format!(
            "file name must use forward slashes: {name:?}"
        )));
    }
    if name.contains('\0') {
        return Err(AppError::validation("file name contains a NUL byte"));
    }
    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(AppError::validation(format!(
                "file name contains an empty segment: {name:?}"
            )));
        }
        if segment == "." || segment == ".." {
            return Err(AppError::validation(format!(
                "file name must not contain {segment:?} segments: {name:?}"
            )));
        }
    }
    Ok(())
}

/// Validate a workspace name for use as the top-level path segment.
pub fn validate_workspace_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("workspace name must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(AppError::validation(format!(
            "workspace name must be a single path segment: {name:?}"
        )));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!(
            "invalid workspace name: {name:?}"
        )));
    }
    Ok(())
}

/// Build the canonical path for a release file.
pub fn release_path(workspace: &str, release: &ReleaseId, name: &str) -> AppResult<String> {
    validate_workspace_name(workspace)?;
    validate_file_name(name)?;
    Ok(format!("{workspace}/releases/{release}/{name}"))
}

/// Allocate a fresh temporary path for an in-flight upload.
pub fn temp_path() -> String {
    format!("{TEMP_PREFIX}/{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubgate_core::digest::digest_bytes;

    fn release_id() -> ReleaseId {
        ReleaseId::from(digest_bytes(b"release"))
    }

    #[test]
    fn test_release_path_shape() {
        let id = release_id();
        let path = release_path("my-workspace", &id, "outputs/table.csv").unwrap();
        assert_eq!(path, format!("my-workspace/releases/{id}/outputs/table.csv"));
    }

    #[test]
    fn test_nested_names_allowed() {
        assert!(validate_file_name("a/b/c.txt").is_ok());
        assert!(validate_file_name("deep/dir/structure/out.csv").is_ok());
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(validate_file_name("../escape.txt").is_err());
        assert!(validate_file_name("a/../../b").is_err());
        assert!(validate_file_name("a/./b").is_err());
        assert!(validate_file_name("/absolute").is_err());
        assert!(validate_file_name("a//b").is_err());
        assert!(validate_file_name("a\\b").is_err());
        assert!(validate_file_name("").is_err());
    }

    #[test]
    fn test_workspace_name_rules() {
        assert!(validate_workspace_name("team-alpha").is_ok());
        assert!(validate_workspace_name("a/b").is_err());
        assert!(validate_workspace_name("..").is_err());
        assert!(validate_workspace_name("").is_err());
    }

    #[test]
    fn test_temp_paths_unique() {
        assert_ne!(temp_path(), temp_path());
        assert!(temp_path().starts_with("tmp/"));
    }
}
