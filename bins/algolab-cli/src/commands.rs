// CLI commands: session management, problem listing, run/submit
use algolab_client::api::HttpApi;
use algolab_client::cache::ResponseCache;
use algolab_client::listing::{paginate, PageRequest, ProblemFilter};
use algolab_client::poller::{JobTracker, PollOptions};
use algolab_client::session::{AuthPhase, AuthSession, FileSessionStore};
use algolab_common::config::ClientConfig;
use algolab_common::types::{Difficulty, JobKind, Language, ProblemSummary};
use anyhow::{bail, Context as _, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::render;

const PROBLEMS_CACHE_KEY: &str = "problems";
const PROBLEMS_CACHE_MINUTES: i64 = 10;

/// Everything a command needs: config, persisted session, response cache
pub struct Context {
    pub config: ClientConfig,
    pub session: AuthSession<FileSessionStore>,
    pub cache: ResponseCache,
}

impl Context {
    pub fn open(config: ClientConfig) -> Result<Self> {
        let cache = ResponseCache::new(config.cache_dir());
        let session = AuthSession::restore(FileSessionStore::new(config.session_path()))
            .context("Failed to read session state")?
            .with_cache(cache.clone());

        Ok(Self {
            config,
            session,
            cache,
        })
    }

    fn api(&self) -> Result<HttpApi> {
        let api = HttpApi::new(&self.config).context("Failed to build HTTP client")?;
        Ok(api.with_token(self.session.access_token().map(String::from)))
    }

    fn require_login(&self) -> Result<()> {
        match self.session.phase() {
            AuthPhase::Authenticated => Ok(()),
            AuthPhase::MfaPending => bail!("Sign-in not finished. Run: algolab mfa --code <code>"),
            AuthPhase::Unauthenticated => bail!("Not signed in. Run: algolab login --email <email>"),
        }
    }

    fn poll_options(&self, timeout: Option<Duration>) -> PollOptions {
        let interval = self.config.poll_interval;
        let max_polls = timeout.map(|t| {
            let polls = t.as_millis() / interval.as_millis().max(1);
            polls.clamp(1, u32::MAX as u128) as u32
        });
        PollOptions {
            interval,
            max_polls,
        }
    }
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(ctx: &mut Context, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    if email.trim().is_empty() || password.is_empty() {
        bail!("Email and password cannot be empty");
    }

    let response = ctx
        .api()?
        .login(email, &password)
        .await
        .context("Login failed")?;

    if response.mfa_required {
        let token = response
            .mfa_token
            .context("Server asked for verification but sent no token")?;
        ctx.session.login_started(token)?;
        println!("🔐 Verification code required.");
        println!("   Run: algolab mfa --code <code>");
    } else {
        ctx.session.login_completed(response.access_token)?;
        println!("✅ Signed in as {}", email);
    }

    Ok(())
}

pub async fn verify_mfa(ctx: &mut Context, code: &str) -> Result<()> {
    let token = match (ctx.session.phase(), ctx.session.state().mfa_token.clone()) {
        (AuthPhase::MfaPending, Some(token)) => token,
        (AuthPhase::Authenticated, _) => {
            println!("Already signed in.");
            return Ok(());
        }
        _ => bail!("No sign-in in progress. Run: algolab login --email <email>"),
    };

    let response = ctx
        .api()?
        .verify_mfa(&token, code.trim())
        .await
        .context("Verification failed")?;
    ctx.session.complete_mfa(response.access_token)?;

    println!("✅ Signed in");
    Ok(())
}

pub async fn logout(ctx: &mut Context) -> Result<()> {
    if ctx.session.phase() == AuthPhase::Authenticated {
        // Local state is cleared even if the server call fails
        if let Err(e) = ctx.api()?.logout().await {
            warn!(error = %e, "Server logout failed");
        }
    }
    ctx.session.logout()?;
    println!("👋 Signed out");
    Ok(())
}

pub fn whoami(ctx: &Context) {
    let state = ctx.session.state();
    match state.phase() {
        AuthPhase::Authenticated => println!("Signed in"),
        AuthPhase::MfaPending => println!("Waiting for verification code"),
        AuthPhase::Unauthenticated => println!("Not signed in"),
    }
    if let Some(at) = state.updated_at {
        println!("  since {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("  api: {}", ctx.config.api_url);
}

#[allow(clippy::too_many_arguments)]
pub async fn list_problems(
    ctx: &Context,
    search: Option<String>,
    difficulty: Option<&str>,
    tag: Option<String>,
    page: usize,
    per_page: usize,
    refresh: bool,
) -> Result<()> {
    ctx.require_login()?;

    let difficulty = match difficulty {
        Some(d) => Some(
            Difficulty::from_str(d)
                .with_context(|| format!("Unknown difficulty '{}' (easy, medium, hard)", d))?,
        ),
        None => None,
    };

    let cached = if refresh {
        None
    } else {
        ctx.cache
            .get_fresh::<Vec<ProblemSummary>>(
                PROBLEMS_CACHE_KEY,
                chrono::Duration::minutes(PROBLEMS_CACHE_MINUTES),
            )
            .unwrap_or_else(|e| {
                warn!(error = %e, "Problem cache unreadable");
                None
            })
    };

    let problems = match cached {
        Some(problems) => problems,
        None => {
            let problems = ctx
                .api()?
                .list_problems()
                .await
                .context("Failed to fetch problems")?;
            if let Err(e) = ctx.cache.put(PROBLEMS_CACHE_KEY, &problems) {
                warn!(error = %e, "Failed to cache problem list");
            }
            problems
        }
    };

    let filter = ProblemFilter {
        search,
        difficulty,
        tag,
    };
    let filtered = filter.apply(&problems);
    let page = paginate(&filtered, PageRequest { page, per_page });

    print!("{}", render::problem_page(&page));
    Ok(())
}

fn read_source(file: &Path) -> Result<String> {
    let code = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if code.trim().is_empty() {
        bail!("{} is empty", file.display());
    }
    Ok(code)
}

/// Resolve `--language`, falling back to the file extension
pub fn resolve_language(explicit: Option<&str>, file: &Path) -> Result<Language> {
    if let Some(name) = explicit {
        return Language::from_str(name).with_context(|| {
            let known: Vec<String> = Language::all().iter().map(|l| l.to_string()).collect();
            format!("Unknown language '{}'. Valid options: {}", name, known.join(", "))
        });
    }

    file.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .with_context(|| {
            format!(
                "Cannot infer language from {}; pass --language",
                file.display()
            )
        })
}

pub async fn run(ctx: &Context, problem: &str, file: &Path, timeout: Option<Duration>) -> Result<bool> {
    ctx.require_login()?;
    let code = read_source(file)?;

    let tracker = JobTracker::new(
        Arc::new(ctx.api()?),
        JobKind::Run,
        problem,
        ctx.poll_options(timeout),
    );

    println!("🚀 Running {} against {}", file.display(), problem);
    let watcher = tokio::spawn(render::follow(tracker.subscribe()));
    tracker.start_run(code).await.context("Failed to start run")?;
    finish(tracker, watcher).await
}

pub async fn submit(
    ctx: &Context,
    problem: &str,
    file: &Path,
    language: Option<&str>,
    timeout: Option<Duration>,
) -> Result<bool> {
    ctx.require_login()?;
    let language = resolve_language(language, file)?;
    let code = read_source(file)?;

    let tracker = JobTracker::new(
        Arc::new(ctx.api()?),
        JobKind::Submission,
        problem,
        ctx.poll_options(timeout),
    );

    println!("📤 Submitting {} ({}) to {}", file.display(), language, problem);
    let watcher = tokio::spawn(render::follow(tracker.subscribe()));
    tracker
        .start_submit(code, language)
        .await
        .context("Failed to submit")?;
    finish(tracker, watcher).await
}

async fn finish(
    tracker: JobTracker<HttpApi>,
    watcher: tokio::task::JoinHandle<()>,
) -> Result<bool> {
    let snapshot = tracker.wait_terminal().await;
    // Tearing down the tracker closes the channel and ends the watcher
    drop(tracker);
    if let Err(e) = watcher.await {
        warn!(error = %e, "Status watcher ended abnormally");
    }

    print!("{}", render::job_result(&snapshot));
    Ok(snapshot.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_from_flag_or_extension() {
        let file = PathBuf::from("solution.py");
        assert_eq!(resolve_language(None, &file).unwrap(), Language::Python);
        assert_eq!(resolve_language(Some("rust"), &file).unwrap(), Language::Rust);

        let unknown = resolve_language(None, &PathBuf::from("notes.txt")).unwrap_err();
        assert!(unknown.to_string().contains("pass --language"));

        let bad = resolve_language(Some("cobol"), &file).unwrap_err();
        assert!(bad.to_string().contains("Valid options"));
    }

    #[test]
    fn test_poll_options_from_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            poll_interval: Duration::from_millis(500),
            state_dir: dir.path().to_path_buf(),
            ..ClientConfig::default()
        };
        let ctx = Context::open(config).unwrap();

        assert_eq!(ctx.poll_options(None).max_polls, None);
        assert_eq!(ctx.poll_options(Some(Duration::from_secs(10))).max_polls, Some(20));
        assert_eq!(ctx.poll_options(Some(Duration::from_millis(10))).max_polls, Some(1));
    }

    #[test]
    fn test_commands_require_login() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            state_dir: dir.path().to_path_buf(),
            ..ClientConfig::default()
        };
        let mut ctx = Context::open(config).unwrap();
        assert!(ctx.require_login().is_err());

        ctx.session.login_started("tok").unwrap();
        let err = ctx.require_login().unwrap_err();
        assert!(err.to_string().contains("Run: algolab mfa --code"));

        ctx.session.complete_mfa(None).unwrap();
        assert!(ctx.require_login().is_ok());
    }
}
