//! Segmenter invocation builder

use std::ffi::OsString;

use crate::config::SegmentConfig;
use crate::resolver::ResolvedStreamUrl;
use crate::workspace::OutputWorkspace;

/// A fully built segmenter command line
#[derive(Debug, Clone)]
pub struct SegmenterCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl SegmenterCommand {
    /// Stream-copy `url` into a rolling live HLS playlist inside `workspace`.
    ///
    /// Old segments are deleted as new ones appear and the playlist never
    /// gets an `#EXT-X-ENDLIST`, so players keep treating it as live.
    pub fn hls(
        program: &str,
        url: &ResolvedStreamUrl,
        workspace: &OutputWorkspace,
        segment: &SegmentConfig,
    ) -> Self {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |s: &str| args.push(OsString::from(s));

        push("-hide_banner");
        push("-nostdin");
        push("-i");
        push(url.as_str());
        push("-c:v");
        push("copy");
        push("-c:a");
        push("copy");
        push("-f");
        push("hls");
        push("-hls_time");
        push(&segment.duration_secs.to_string());
        push("-hls_list_size");
        push(&segment.list_size.to_string());
        push("-hls_flags");
        push("delete_segments+omit_endlist");
        push("-hls_segment_filename");
        args.push(workspace.file(&segment.segment_pattern).into_os_string());
        args.push(workspace.file(&segment.index_name).into_os_string());

        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Command line as a single loggable string
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}
