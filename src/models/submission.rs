//! Submission model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    file_extensions, languages, MAX_SOURCE_CODE_SIZE, MAX_TEST_CASE_INPUT_SIZE,
    MAX_TEST_CASE_OUTPUT_SIZE,
};
use crate::error::{GraderError, GraderResult};

/// Supported language variants; each one selects exactly one compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    /// Get language as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => languages::C,
            Self::Cpp => languages::CPP,
        }
    }

    /// Parse language from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            languages::C => Some(Self::C),
            languages::CPP | "c++" => Some(Self::Cpp),
            _ => None,
        }
    }

    /// File extension expected by the toolchain
    pub fn source_extension(&self) -> &'static str {
        match self {
            Self::C => file_extensions::C,
            Self::Cpp => file_extensions::CPP,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single grading request. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    id: Uuid,
    source_code: String,
    language: Language,
    input: String,
    expected_output: String,
}

impl SubmissionRequest {
    /// Build a request with a fresh identifier
    pub fn new(
        source_code: impl Into<String>,
        language: Language,
        input: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_code: source_code.into(),
            language,
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    /// Check size bounds before any file or process is touched
    pub fn validate(&self) -> GraderResult<()> {
        if self.source_code.len() > MAX_SOURCE_CODE_SIZE {
            return Err(GraderError::InvalidSubmission(format!(
                "source code exceeds {} bytes",
                MAX_SOURCE_CODE_SIZE
            )));
        }
        if self.input.len() > MAX_TEST_CASE_INPUT_SIZE {
            return Err(GraderError::InvalidSubmission(format!(
                "input exceeds {} bytes",
                MAX_TEST_CASE_INPUT_SIZE
            )));
        }
        if self.expected_output.len() > MAX_TEST_CASE_OUTPUT_SIZE {
            return Err(GraderError::InvalidSubmission(format!(
                "expected output exceeds {} bytes",
                MAX_TEST_CASE_OUTPUT_SIZE
            )));
        }
        Ok(())
    }
}
