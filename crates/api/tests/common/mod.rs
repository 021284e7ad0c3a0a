#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pyexec_api::config::ServerConfig;
use pyexec_api::router::build_app_router;
use pyexec_api::scripting::orchestrator::ScriptOrchestrator;
use pyexec_api::state::AppState;
use pyexec_core::scripting::executor::{RunnerError, RunnerResult, SandboxRunner};
use pyexec_core::scripting::harness::WrappedProgram;
use pyexec_core::scripting::sandbox::{SandboxConfig, DEFAULT_TIMEOUT_MARKER};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Stand-in for nsjail: drops `--config <file> --` and execs the rest.
const FAKE_NSJAIL: &str = r#"#!/bin/sh
[ "$1" = "--config" ] || exit 90
[ -f "$2" ] || exit 91
[ "$3" = "--" ] || exit 92
shift 3
exec "$@"
"#;

struct Fixtures {
    dir: tempfile::TempDir,
    runner: PathBuf,
    config: PathBuf,
}

/// Write the fake runner and its config once per test binary, before any
/// test spawns it.
fn fixtures() -> &'static Fixtures {
    static FIXTURES: OnceLock<Fixtures> = OnceLock::new();
    FIXTURES.get_or_init(|| {
        let dir = tempfile::tempdir().expect("create fixture dir");

        let runner = dir.path().join("fake-nsjail");
        std::fs::write(&runner, FAKE_NSJAIL).expect("write fake runner");
        std::fs::set_permissions(&runner, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake runner");

        let config = dir.path().join("nsjail.cfg");
        std::fs::write(&config, "mode: ONCE\n").expect("write runner config");

        Fixtures {
            dir,
            runner,
            config,
        }
    })
}

/// Whether a `python3` interpreter is available for end-to-end tests.
pub fn python_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        // Probe only after the fake runner is on disk and closed.
        fixtures();
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

/// Sandbox settings that run `python3` through the fake runner, with scratch
/// files placed in `scratch_dir`.
pub fn fake_sandbox_config(scratch_dir: &Path, timeout: Duration) -> SandboxConfig {
    let fixtures = fixtures();
    SandboxConfig {
        runner: fixtures.runner.clone(),
        config_path: fixtures.config.clone(),
        interpreter: PathBuf::from("python3"),
        scratch_dir: scratch_dir.to_path_buf(),
        timeout,
        timeout_marker: DEFAULT_TIMEOUT_MARKER.to_string(),
    }
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin and a 30-second request
/// timeout.
pub fn test_config() -> ServerConfig {
    let fixtures = fixtures();
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        sandbox: fake_sandbox_config(fixtures.dir.path(), Duration::from_secs(5)),
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Build the full application router around the given orchestrator.
///
/// Uses [`build_app_router`] so integration tests exercise the same
/// middleware stack (CORS, request ID, timeout, tracing, panic recovery)
/// that production uses.
pub fn build_app(orchestrator: ScriptOrchestrator, config: ServerConfig) -> Router {
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    build_app_router(state, &config)
}

/// App whose sandbox is the given in-process runner.
pub fn build_test_app(runner: Arc<CannedRunner>) -> Router {
    let config = test_config();
    let orchestrator = ScriptOrchestrator::new(
        runner,
        config.sandbox.timeout,
        config.sandbox.timeout_marker.clone(),
    );
    build_app(orchestrator, config)
}

/// App that runs real `python3` through the fake runner.
pub fn build_python_app(scratch_dir: &Path, timeout: Duration) -> Router {
    let mut config = test_config();
    config.sandbox = fake_sandbox_config(scratch_dir, timeout);
    let orchestrator = ScriptOrchestrator::from_config(&config.sandbox);
    build_app(orchestrator, config)
}

// ---------------------------------------------------------------------------
// Fake runner
// ---------------------------------------------------------------------------

/// In-process [`SandboxRunner`] that replies with a fixed result and
/// counts invocations.
pub struct CannedRunner {
    reply: Result<RunnerResult, fn() -> RunnerError>,
    calls: AtomicUsize,
}

impl CannedRunner {
    pub fn replying(exit_code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(RunnerResult {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                timed_out: false,
                duration_ms: 1,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(RunnerResult {
                exit_code: -1,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
                duration_ms: 5000,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(make_error: fn() -> RunnerError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(make_error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SandboxRunner for CannedRunner {
    async fn run(
        &self,
        _program: &WrappedProgram,
        _timeout: Duration,
    ) -> Result<RunnerResult, RunnerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(result) => Ok(result.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, Some("application/json"), body.to_string()).await
}

/// Send a POST request with an arbitrary body and optional content type.
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: Option<&str>,
    body: impl Into<String>,
) -> Response<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder.body(Body::from(body.into())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Submit a script to `/execute`.
pub async fn execute(app: Router, script: &str) -> Response<Body> {
    post_json(app, "/execute", serde_json::json!({ "script": script })).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
