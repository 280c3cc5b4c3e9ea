//! Input validation utilities

use crate::error::{EdmsError, EdmsResult};
use crate::models::DocumentKeyParts;
use regex::Regex;
use std::sync::LazyLock;

/// Document key parts: letters and digits only, so the `-` joined key stays unambiguous
static VALID_KEY_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,20}$").expect("valid key part regex"));

/// Uploaded file names: alphanumeric, underscore, hyphen, dot
static VALID_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid file name regex"));

const MAX_TITLE_LEN: usize = 250;

/// Validate every part of a document key
pub fn validate_document_key(parts: &DocumentKeyParts) -> EdmsResult<()> {
    for (field, value) in parts.iter() {
        if !VALID_KEY_PART.is_match(value) {
            return Err(EdmsError::Validation(format!(
                "Invalid {}: {:?} (1 to 20 letters or digits)",
                field, value
            )));
        }
    }
    Ok(())
}

pub fn validate_title(title: &str) -> EdmsResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(EdmsError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(EdmsError::Validation(format!(
            "Title is longer than {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

pub fn validate_klass(klass: Option<i64>) -> EdmsResult<()> {
    match klass {
        None | Some(1..=4) => Ok(()),
        Some(k) => Err(EdmsError::Validation(format!(
            "Invalid class {}: expected 1 to 4",
            k
        ))),
    }
}

/// Validate the name of an uploaded file before it is written under the import root
pub fn validate_file_name(name: &str) -> EdmsResult<()> {
    let invalid = || EdmsError::Validation(format!("Invalid file name: {:?}", name));

    if name.is_empty() || name.len() > 200 {
        return Err(invalid());
    }

    // Path traversal and null bytes
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(invalid());
    }

    if !VALID_FILE_NAME.is_match(name) {
        return Err(invalid());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(unit: &str) -> DocumentKeyParts {
        DocumentKeyParts {
            contract_number: "FAC09001".to_string(),
            originator: "FWF".to_string(),
            unit: unit.to_string(),
            discipline: "HSE".to_string(),
            document_type: "REP".to_string(),
            sequential_number: "0004".to_string(),
        }
    }

    #[test]
    fn test_validate_document_key() {
        assert!(validate_document_key(&parts("000")).is_ok());
        assert!(validate_document_key(&parts("")).is_err());
        assert!(validate_document_key(&parts("0-0")).is_err()); // would split the key
        assert!(validate_document_key(&parts("0 0")).is_err());
        assert!(validate_document_key(&parts(&"9".repeat(21))).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("HSE monthly report").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"a".repeat(251)).is_err());
    }

    #[test]
    fn test_validate_klass() {
        assert!(validate_klass(None).is_ok());
        assert!(validate_klass(Some(1)).is_ok());
        assert!(validate_klass(Some(5)).is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("import_2014-03.csv").is_ok());
        assert!(validate_file_name("../etc/passwd").is_err());
        assert!(validate_file_name("dir/file.csv").is_err());
        assert!(validate_file_name("file\0.csv").is_err());
        assert!(validate_file_name("my file.csv").is_err());
        assert!(validate_file_name("").is_err());
    }
}
