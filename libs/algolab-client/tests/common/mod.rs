#![allow(dead_code)]

// In-process grader stub for integration tests
//
// Serves the same routes as the real backend on an ephemeral port. Each
// created job walks through `script`, one step per status request, and
// stays on the last step.

use algolab_common::routes;
use algolab_common::types::{
    CreateJobRequest, CreateJobResponse, Difficulty, JobId, JobStatusResponse, LoginRequest,
    LoginResponse, MfaRequest, MfaResponse, ProblemSummary,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const PASSWORD: &str = "hunter2";
pub const MFA_CODE: &str = "123456";
pub const ACCESS_TOKEN: &str = "access-token-1";

pub struct StubState {
    script: Vec<JobStatusResponse>,
    jobs: Mutex<HashMap<String, usize>>,
    pub polls: Mutex<HashMap<String, u32>>,
    pub created: Mutex<Vec<(String, CreateJobRequest)>>,
}

impl StubState {
    pub fn polls_for(&self, id: &JobId) -> u32 {
        self.polls.lock().unwrap().get(id.as_str()).copied().unwrap_or(0)
    }
}

pub struct StubGrader {
    pub base_url: String,
    pub state: Arc<StubState>,
}

impl StubGrader {
    pub async fn start(script: Vec<JobStatusResponse>) -> Self {
        let state = Arc::new(StubState {
            script,
            jobs: Mutex::new(HashMap::new()),
            polls: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/problems/:slug/run", post(create_run))
            .route("/problems/:slug/submit", post(create_submission))
            .route("/runs/:id", get(job_status))
            .route("/submissions/:id", get(job_status))
            .route(routes::LOGIN, post(login))
            .route(routes::LOGIN_MFA, post(verify_mfa))
            .route(routes::LOGOUT, post(logout))
            .route(routes::PROBLEMS, get(list_problems))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "message": message }))).into_response()
}

fn create_job(state: &StubState, slug: String, request: CreateJobRequest) -> Response {
    if slug == "missing" {
        return error(StatusCode::NOT_FOUND, "Problem not found");
    }
    let id = Uuid::new_v4().to_string();
    state.jobs.lock().unwrap().insert(id.clone(), 0);
    state.created.lock().unwrap().push((slug, request));
    (
        StatusCode::CREATED,
        Json(CreateJobResponse { id: JobId(id) }),
    )
        .into_response()
}

async fn create_run(
    State(state): State<Arc<StubState>>,
    Path(slug): Path<String>,
    Json(request): Json<CreateJobRequest>,
) -> Response {
    create_job(&state, slug, request)
}

async fn create_submission(
    State(state): State<Arc<StubState>>,
    Path(slug): Path<String>,
    Json(request): Json<CreateJobRequest>,
) -> Response {
    if request.language.is_none() {
        return error(StatusCode::BAD_REQUEST, "Language is required");
    }
    create_job(&state, slug, request)
}

async fn job_status(State(state): State<Arc<StubState>>, Path(id): Path<String>) -> Response {
    let step = {
        let mut jobs = state.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(step) => {
                let current = *step;
                *step = (*step + 1).min(state.script.len().saturating_sub(1));
                current
            }
            None => return error(StatusCode::NOT_FOUND, "Job not found"),
        }
    };
    *state.polls.lock().unwrap().entry(id).or_insert(0) += 1;

    (StatusCode::OK, Json(state.script[step].clone())).into_response()
}

async fn login(Json(request): Json<LoginRequest>) -> Response {
    if request.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }
    let response = if request.email.starts_with("mfa") {
        LoginResponse {
            mfa_required: true,
            mfa_token: Some(format!("mfa-{}", request.email)),
            access_token: None,
        }
    } else {
        LoginResponse {
            mfa_required: false,
            mfa_token: None,
            access_token: Some(ACCESS_TOKEN.to_string()),
        }
    };
    Json(response).into_response()
}

async fn verify_mfa(Json(request): Json<MfaRequest>) -> Response {
    if request.code != MFA_CODE || !request.mfa_token.starts_with("mfa-") {
        return error(StatusCode::UNAUTHORIZED, "Invalid verification code");
    }
    Json(MfaResponse {
        access_token: Some(ACCESS_TOKEN.to_string()),
    })
    .into_response()
}

async fn logout() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn list_problems(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {}", ACCESS_TOKEN);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "Login required");
    }

    Json(vec![
        ProblemSummary {
            id: "1".to_string(),
            slug: "two-sum".to_string(),
            title: "Two Sum".to_string(),
            difficulty: Difficulty::Easy,
            tags: vec!["array".to_string()],
        },
        ProblemSummary {
            id: "2".to_string(),
            slug: "word-ladder".to_string(),
            title: "Word Ladder".to_string(),
            difficulty: Difficulty::Hard,
            tags: vec!["graph".to_string()],
        },
    ])
    .into_response()
}
