//! Test fixtures for integration tests
//!
//! Stands in for yt-dlp and ffmpeg with small shell scripts so whole runs
//! can be exercised without network access or media tooling.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::config::RelayConfig;

/// Fake resolver behaviours
#[derive(Debug, Clone)]
pub enum FakeResolver {
    /// Prints the given URL and exits 0
    Url(&'static str),
    /// Prints to stderr and exits non-zero
    Fails,
    /// Exits 0 with something that is not a URL
    Garbage,
    /// Never finishes
    Hangs,
}

impl FakeResolver {
    fn script(&self) -> String {
        match self {
            FakeResolver::Url(url) => format!("echo '{}'", url),
            FakeResolver::Fails => "echo 'ERROR: Video unavailable' >&2\nexit 1".to_string(),
            FakeResolver::Garbage => "echo 'no formats found'".to_string(),
            FakeResolver::Hangs => "sleep 30".to_string(),
        }
    }
}

/// Fake segmenter behaviours
#[derive(Debug, Clone)]
pub enum FakeSegmenter {
    /// Writes an index plus `segment000.ts..segment004.ts`, then runs until
    /// signalled
    Live,
    /// Same as `Live` but ignores SIGTERM
    Stubborn,
    /// Exits immediately with the given code
    Exits(i32),
}

impl FakeSegmenter {
    fn script(&self) -> String {
        let live = r#"for arg; do index="$arg"; done
dir=$(dirname "$index")
echo "fake segmenter started" >&2
i=0
while [ $i -lt 5 ]; do
  printf 'ts' > "$dir/segment00$i.ts"
  i=$((i + 1))
done
printf '#EXTM3U\n#EXT-X-TARGETDURATION:4\n#EXTINF:4.0,\nsegment004.ts\n' > "$index.tmp"
mv "$index.tmp" "$index"
while :; do sleep 0.1; done"#;
        match self {
            FakeSegmenter::Live => live.to_string(),
            FakeSegmenter::Stubborn => format!("trap '' TERM\n{}", live),
            FakeSegmenter::Exits(code) => {
                format!("echo 'Input/output error' >&2\nexit {}", code)
            }
        }
    }
}

/// Scratch directory holding fake tools and the output workspace
pub struct TestEnv {
    pub root: TempDir,
    pub config: RelayConfig,
}

impl TestEnv {
    pub fn new(resolver: FakeResolver, segmenter: FakeSegmenter) -> Self {
        let root = tempfile::tempdir().unwrap();
        let resolver_path = write_script(root.path(), "fake-resolver", &resolver.script());
        let segmenter_path = write_script(root.path(), "fake-segmenter", &segmenter.script());

        let mut config = RelayConfig::default();
        config.output_dir = root.path().join("out");
        config.server.host = "127.0.0.1".to_string();
        config.server.port = free_port();
        config.resolver.program = resolver_path.to_string_lossy().to_string();
        config.resolver.args = Vec::new();
        config.resolver.timeout_secs = 5;
        config.segmenter.program = segmenter_path.to_string_lossy().to_string();
        config.segmenter.grace_period_secs = 1;

        Self { root, config }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.output_dir.clone()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.config.server.socket_addr())
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A port that was free a moment ago
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub async fn wait_for_file(path: &Path, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !path.exists() {
        assert!(Instant::now() < deadline, "timed out waiting for {:?}", path);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
