//! Declarative sync configuration loaded from JSON.
//!
//! ```json
//! [
//!   {
//!     "master": "user",
//!     "sync_to": "profile",
//!     "relationship": { "id": "user_id" },
//!     "mappings": [["name", "display_name"], ["email", "contact"]]
//!   }
//! ]
//! ```
//!
//! Mappings are an array so declaration order survives parsing. Custom
//! mappers are code-only and attached through [`SyncOptions::with_mapper`].

use crate::sync::policy::SyncOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// One master type's sync declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncDeclaration {
    pub master: String,
    pub sync_to: String,
    /// Master key to slave key. Must hold exactly one entry.
    pub relationship: BTreeMap<String, String>,
    #[serde(default)]
    pub mappings: Vec<(String, String)>,
}

impl SyncDeclaration {
    pub fn into_options(self) -> SyncOptions {
        let mut options = SyncOptions::new(self.sync_to);
        options.relationship = self.relationship.into_iter().collect();
        options.mappings = self.mappings;
        options
    }
}

#[derive(Debug)]
pub enum DeclarationError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for DeclarationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(
                f,
                "failed to read sync declarations `{}`: {source}",
                path.display()
            ),
            Self::Parse(err) => write!(f, "invalid sync declarations: {err}"),
        }
    }
}

impl Error for DeclarationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for DeclarationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Parses a JSON array of declarations.
pub fn parse_declarations(json: &str) -> Result<Vec<SyncDeclaration>, DeclarationError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads and parses a declarations file.
pub fn load_declarations(path: impl AsRef<Path>) -> Result<Vec<SyncDeclaration>, DeclarationError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DeclarationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_declarations(&text)
}

#[cfg(test)]
mod tests {
    use super::{parse_declarations, DeclarationError};

    #[test]
    fn parses_declarations_preserving_mapping_order() {
        let declarations = parse_declarations(
            r#"[{
                "master": "user",
                "sync_to": "profile",
                "relationship": {"id": "user_id"},
                "mappings": [["zeta", "x"], ["alpha", "x"]]
            }]"#,
        )
        .unwrap();

        assert_eq!(declarations.len(), 1);
        let options = declarations[0].clone().into_options();
        assert_eq!(options.sync_to, "profile");
        assert_eq!(
            options.relationship,
            vec![("id".to_string(), "user_id".to_string())]
        );
        assert_eq!(
            options.mappings,
            vec![
                ("zeta".to_string(), "x".to_string()),
                ("alpha".to_string(), "x".to_string())
            ]
        );
        assert!(options.mapping_fn.is_none());
    }

    #[test]
    fn mappings_default_to_empty() {
        let declarations = parse_declarations(
            r#"[{"master": "user", "sync_to": "profile", "relationship": {"id": "user_id"}}]"#,
        )
        .unwrap();
        assert!(declarations[0].mappings.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_declarations(
            r#"[{"master": "user", "sync_to": "profile", "relationship": {}, "mapping_block": 1}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeclarationError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = super::load_declarations("/nonexistent/modelsync/sync.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/modelsync/sync.json"));
    }
}
