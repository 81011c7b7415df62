use crate::types::{JobId, JobKind};

/// REST path semantics - defines only paths, not transport
/// Keeps the client and the grader stubs from drifting apart

pub const LOGIN: &str = "/auth/login";
pub const LOGIN_MFA: &str = "/auth/login/mfa";
pub const LOGOUT: &str = "/auth/logout";
pub const PROBLEMS: &str = "/problems";

/// Path that creates a job of the given kind for a problem
pub fn create_job_path(kind: JobKind, problem: &str) -> String {
    match kind {
        JobKind::Run => format!("{}/{}/run", PROBLEMS, problem),
        JobKind::Submission => format!("{}/{}/submit", PROBLEMS, problem),
    }
}

/// Path that reports the status of a job
pub fn job_status_path(kind: JobKind, job_id: &JobId) -> String {
    match kind {
        JobKind::Run => format!("/runs/{}", job_id),
        JobKind::Submission => format!("/submissions/{}", job_id),
    }
}

/// Join a base URL and a path without doubling the slash
pub fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
