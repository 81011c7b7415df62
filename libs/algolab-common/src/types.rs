use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Which grading endpoint family a job belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Run,
    Submission,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Run => write!(f, "run"),
            JobKind::Submission => write!(f, "submission"),
        }
    }
}

/// Opaque job identifier handed out by a create call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Job status as reported by the grader.
///
/// The wire form is the human-readable string (`"Time Limit Exceeded"`).
/// Strings the client does not know are preserved in `Other` and are
/// treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Started,
    Accepted,
    Failed,
    Error,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompileError,
    InternalServerError,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Started => "Started",
            JobStatus::Accepted => "Accepted",
            JobStatus::Failed => "Failed",
            JobStatus::Error => "Error",
            JobStatus::WrongAnswer => "Wrong Answer",
            JobStatus::TimeLimitExceeded => "Time Limit Exceeded",
            JobStatus::MemoryLimitExceeded => "Memory Limit Exceeded",
            JobStatus::RuntimeError => "Runtime Error",
            JobStatus::CompileError => "Compile Error",
            JobStatus::InternalServerError => "Internal Server Error",
            JobStatus::Other(s) => s,
        }
    }

    /// Fixed terminal set. No state change follows one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Accepted
                | JobStatus::Failed
                | JobStatus::Error
                | JobStatus::WrongAnswer
                | JobStatus::TimeLimitExceeded
                | JobStatus::MemoryLimitExceeded
                | JobStatus::RuntimeError
                | JobStatus::CompileError
                | JobStatus::InternalServerError
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Accepted)
    }

    /// Ordering used to keep status transitions forward-only
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Started | JobStatus::Other(_) => 1,
            _ => 2,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Pending" => JobStatus::Pending,
            "Started" => JobStatus::Started,
            "Accepted" => JobStatus::Accepted,
            "Failed" => JobStatus::Failed,
            "Error" => JobStatus::Error,
            "Wrong Answer" => JobStatus::WrongAnswer,
            "Time Limit Exceeded" => JobStatus::TimeLimitExceeded,
            "Memory Limit Exceeded" => JobStatus::MemoryLimitExceeded,
            "Runtime Error" => JobStatus::RuntimeError,
            "Compile Error" => JobStatus::CompileError,
            "Internal Server Error" => JobStatus::InternalServerError,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ids arrive as strings from some endpoints and integers from others
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTestcase {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub input: String,
    pub expected: String,
    pub got: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_out: Option<String>,
}

/// Body of `GET /runs/{id}` and `GET /submissions/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_err: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_testcases: Vec<FailedTestcase>,
}

impl JobStatusResponse {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            std_out: None,
            std_err: None,
            failed_testcases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Cpp,
    Javascript,
    Rust,
}

impl Language {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "c++" => Some(Language::Cpp),
            "javascript" | "js" => Some(Language::Javascript),
            "rust" | "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Infer the language from a source file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            "js" | "mjs" => Some(Language::Javascript),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Language::Python,
            Language::Java,
            Language::Cpp,
            Language::Javascript,
            Language::Rust,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Java => write!(f, "java"),
            Language::Cpp => write!(f, "cpp"),
            Language::Javascript => write!(f, "javascript"),
            Language::Rust => write!(f, "rust"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    #[serde(alias = "runId", alias = "submissionId", alias = "jobId")]
    pub id: JobId,
}

/// Error payload carried by every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub mfa_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaRequest {
    pub mfa_token: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub slug: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
}
