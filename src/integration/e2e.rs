//! End-to-end integration tests

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{RelayError, ResolutionError, SupervisorError};
use crate::integration::fixtures::{wait_for_file, FakeResolver, FakeSegmenter, TestEnv};
use crate::orchestrator::{Orchestrator, RunOutcome};

const STREAM_URL: &str = "https://example.test/stream";

#[tokio::test]
async fn test_stream_lifecycle() {
    let env = TestEnv::new(FakeResolver::Url(STREAM_URL), FakeSegmenter::Live);
    let index = env.output_dir().join("live.m3u8");
    let base_url = env.base_url();

    // Stale content from an earlier run must not survive.
    std::fs::create_dir_all(env.output_dir()).unwrap();
    std::fs::write(env.output_dir().join("segment999.ts"), b"stale").unwrap();

    let orchestrator = Orchestrator::new(env.config.clone());
    let cancel = CancellationToken::new();
    let run = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run("some-live-video", cancel).await })
    };

    wait_for_file(&index, Duration::from_secs(5)).await;
    assert!(!env.output_dir().join("segment999.ts").exists());
    for i in 0..5 {
        assert!(env.output_dir().join(format!("segment00{}.ts", i)).exists());
    }

    let playlist = reqwest::get(format!("{}/live.m3u8", base_url)).await.unwrap();
    assert_eq!(playlist.status(), reqwest::StatusCode::OK);
    assert_eq!(
        playlist.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );
    let body = playlist.text().await.unwrap();
    assert!(body.starts_with("#EXTM3U"));
    assert!(!body.contains("#EXT-X-ENDLIST"));

    let segment = reqwest::get(format!("{}/segment004.ts", base_url)).await.unwrap();
    assert_eq!(segment.status(), reqwest::StatusCode::OK);
    assert_eq!(segment.headers().get("expires").unwrap(), "0");

    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, RunOutcome::Interrupted);
    assert_eq!(outcome.exit_code(), 0);

    // The server is gone once the run has returned.
    assert!(reqwest::get(format!("{}/live.m3u8", base_url)).await.is_err());

    let next_run = Orchestrator::new(env.config.clone());
    next_run.workspace().prepare().await.unwrap();
    assert_eq!(std::fs::read_dir(env.output_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_interrupt_kills_stubborn_segmenter() {
    let env = TestEnv::new(FakeResolver::Url(STREAM_URL), FakeSegmenter::Stubborn);
    let index = env.output_dir().join("live.m3u8");
    let grace = env.config.segmenter.grace_period();

    let orchestrator = Orchestrator::new(env.config.clone());
    let cancel = CancellationToken::new();
    let run = {
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run("some-live-video", cancel).await })
    };

    wait_for_file(&index, Duration::from_secs(5)).await;
    let started = Instant::now();
    cancel.cancel();
    // A second interrupt must not restart the protocol.
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(outcome, RunOutcome::Interrupted);
    assert!(started.elapsed() >= grace);
    assert!(started.elapsed() < grace + Duration::from_secs(4));
}

#[tokio::test]
async fn test_segmenter_exit_code_propagates() {
    let env = TestEnv::new(FakeResolver::Url(STREAM_URL), FakeSegmenter::Exits(7));
    let orchestrator = Orchestrator::new(env.config.clone());

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run("some-video", CancellationToken::new()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(outcome, RunOutcome::SegmenterExited(7));
    assert_eq!(outcome.exit_code(), 7);
}

#[tokio::test]
async fn test_resolver_failure_has_no_side_effects() {
    for resolver in [FakeResolver::Fails, FakeResolver::Garbage] {
        let env = TestEnv::new(resolver, FakeSegmenter::Live);
        let orchestrator = Orchestrator::new(env.config.clone());

        let err = orchestrator
            .run("missing-video", CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Resolution(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(!env.output_dir().exists());
        assert!(reqwest::get(format!("{}/live.m3u8", env.base_url()))
            .await
            .is_err());
    }
}

#[tokio::test]
async fn test_resolver_timeout_aborts_run() {
    let mut env = TestEnv::new(FakeResolver::Hangs, FakeSegmenter::Live);
    env.config.resolver.timeout_secs = 1;
    let orchestrator = Orchestrator::new(env.config.clone());

    let err = orchestrator
        .run("slow-video", CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RelayError::Resolution(ResolutionError::Timeout { .. })
    ));
    assert!(!env.output_dir().exists());
}

#[tokio::test]
async fn test_bind_failure_aborts_before_segmenter() {
    let env = TestEnv::new(FakeResolver::Url(STREAM_URL), FakeSegmenter::Live);
    let _occupied = tokio::net::TcpListener::bind(env.config.server.socket_addr())
        .await
        .unwrap();
    let orchestrator = Orchestrator::new(env.config.clone());

    let err = orchestrator
        .run("some-video", CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Server(_)));
    assert_eq!(err.exit_code(), 4);
    assert!(!env.output_dir().join("live.m3u8").exists());
}

#[tokio::test]
async fn test_segmenter_launch_failure_releases_server() {
    let mut env = TestEnv::new(FakeResolver::Url(STREAM_URL), FakeSegmenter::Live);
    env.config.segmenter.program = env
        .root
        .path()
        .join("no-such-segmenter")
        .to_string_lossy()
        .to_string();
    let orchestrator = Orchestrator::new(env.config.clone());

    let err = orchestrator
        .run("some-video", CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RelayError::Supervisor(SupervisorError::Launch { .. })
    ));
    assert_eq!(err.exit_code(), 5);
    assert!(tokio::net::TcpListener::bind(env.config.server.socket_addr())
        .await
        .is_ok());
}
