//! Subject metadata and subject-code configuration

use serde::{Deserialize, Serialize};

use crate::types::{PipelineError, Result};

/// Ordered key/value metadata block of one chamber occupant, as found in the
/// device export preamble
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectMetadata {
    fields: Vec<(String, String)>,
}

impl SubjectMetadata {
    /// Pair a key row with a value row; extra keys get empty values
    pub fn from_rows(keys: &[&str], values: &[&str]) -> Self {
        let fields = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let value = values.get(i).copied().unwrap_or("");
                (key.trim().to_string(), value.trim().to_string())
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `Subject ID` field, required for automatic code generation
    pub fn subject_id(&self) -> Result<&str> {
        self.get("Subject ID")
            .ok_or_else(|| PipelineError::MissingData("Subject ID".to_string()))
    }

    /// The free-text `Comments` field
    pub fn comments(&self) -> Result<&str> {
        self.get("Comments")
            .ok_or_else(|| PipelineError::MissingData("Comments".to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// How output files are named per subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeMode {
    /// Use the metadata `Subject ID`
    Id,
    /// Use `Subject ID` + `_` + `Comments`
    IdComment,
    /// Use caller-provided codes
    Manual,
}

impl std::str::FromStr for CodeMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(CodeMode::Id),
            "id+comment" => Ok(CodeMode::IdComment),
            "manual" => Ok(CodeMode::Manual),
            other => Err(PipelineError::Configuration(format!(
                "unknown code mode `{other}`; expected id, id+comment or manual"
            ))),
        }
    }
}

/// Resolve the pair of subject codes for (room 1, room 2)
pub fn subject_codes(
    mode: CodeMode,
    manual: Option<&(String, String)>,
    r1: &SubjectMetadata,
    r2: &SubjectMetadata,
) -> Result<(String, String)> {
    // An explicit manual pair wins regardless of the declared mode
    if let Some((code_1, code_2)) = manual {
        return Ok((code_1.clone(), code_2.clone()));
    }
    match mode {
        CodeMode::Id => Ok((r1.subject_id()?.to_string(), r2.subject_id()?.to_string())),
        CodeMode::IdComment => Ok((
            format!("{}_{}", r1.subject_id()?, r1.comments()?),
            format!("{}_{}", r2.subject_id()?, r2.comments()?),
        )),
        CodeMode::Manual => Err(PipelineError::Configuration(
            "manual code mode requires a pair of codes, e.g. --manual 1234_v1 5678_v1".to_string(),
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, comments: &str) -> SubjectMetadata {
        SubjectMetadata::from_rows(&["Subject ID", "Comments"], &[id, comments])
    }

    #[test]
    fn test_from_rows_trims_cells() {
        let m = SubjectMetadata::from_rows(&[" Subject ID "], &[" 02LK "]);
        assert_eq!(m.get("Subject ID"), Some("02LK"));
    }

    #[test]
    fn test_codes_from_id() {
        let (c1, c2) =
            subject_codes(CodeMode::Id, None, &meta("02LK", "v2"), &meta("04HH", "v1")).unwrap();
        assert_eq!(c1, "02LK");
        assert_eq!(c2, "04HH");
    }

    #[test]
    fn test_codes_from_id_and_comment() {
        let (c1, _) = subject_codes(
            CodeMode::IdComment,
            None,
            &meta("02LK", "visit2"),
            &meta("04HH", "visit1"),
        )
        .unwrap();
        assert_eq!(c1, "02LK_visit2");
    }

    #[test]
    fn test_manual_pair_wins() {
        let pair = ("a_v1".to_string(), "b_v1".to_string());
        let (c1, c2) = subject_codes(
            CodeMode::Id,
            Some(&pair),
            &meta("02LK", ""),
            &meta("04HH", ""),
        )
        .unwrap();
        assert_eq!((c1.as_str(), c2.as_str()), ("a_v1", "b_v1"));
    }

    #[test]
    fn test_manual_mode_without_pair_is_configuration_error() {
        let err = subject_codes(CodeMode::Manual, None, &meta("a", ""), &meta("b", ""))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_missing_subject_id_is_missing_data() {
        let empty = SubjectMetadata::default();
        let err = subject_codes(CodeMode::Id, None, &empty, &empty).unwrap_err();
        assert!(matches!(err, PipelineError::MissingData(_)));
    }
}
