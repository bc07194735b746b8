//! `replay`: stream a recorded transcript through a [`StreamSession`].
//!
//! The transcript is read in fixed-size chunks by a [`ReaderSource`], so an
//! invalid byte sequence in the file surfaces exactly like a transport
//! failure mid-response: the last good tree is printed, followed by the
//! notice, and the process exits with the stream-failure code.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use ftui_genui::{
    PacedSource, PassTrigger, ReaderSource, RenderPass, StreamOutcome, StreamSession, StreamStatus,
    paint_tree,
};
use serde::Serialize;

use crate::cli::ProfileArgs;
use crate::error::{ReplayError, Result};
use crate::settings::{OutputFormat, ReplaySettings};

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Transcript file, or `-` for stdin.
    pub transcript: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Bytes per simulated delta.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Milliseconds to wait between deltas.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Paint width in columns.
    #[arg(long)]
    pub width: Option<usize>,

    /// Print every intermediate pass.
    #[arg(long)]
    pub every_pass: bool,

    /// Stop the session after this many passes.
    #[arg(long)]
    pub abort_after: Option<usize>,

    /// Fixed epoch for generated ids.
    #[arg(long)]
    pub epoch_ms: Option<u64>,
}

impl ReplayArgs {
    /// Profile values first, then explicit flags.
    pub fn settings(&self) -> Result<ReplaySettings> {
        let mut settings = ReplaySettings::from_profile(&self.profile.load()?)?;
        if let Some(size) = self.chunk_size {
            if size == 0 {
                return Err(ReplayError::invalid("--chunk-size must be positive"));
            }
            settings.chunk_size = size;
        }
        if let Some(ms) = self.delay_ms {
            settings.delay = std::time::Duration::from_millis(ms);
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(width) = self.width {
            if width == 0 {
                return Err(ReplayError::invalid("--width must be positive"));
            }
            settings.width = width;
        }
        if self.every_pass {
            settings.every_pass = true;
        }
        if self.epoch_ms.is_some() {
            settings.epoch_ms = self.epoch_ms;
        }
        Ok(settings)
    }
}

/// Summary written after the session ends.
#[derive(Debug, Serialize)]
struct ReplayReport<'a> {
    status: StreamStatus,
    passes: usize,
    transcript_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_pass: Option<&'a RenderPass>,
}

pub fn run_replay(args: &ReplayArgs, out: &mut dyn Write) -> Result<()> {
    let settings = args.settings()?;
    let reader = open_input(&args.transcript)?;
    let source = PacedSource::new(ReaderSource::new(reader, settings.chunk_size), settings.delay);

    let session = StreamSession::new(settings.pipeline());
    let abort = session.abort_handle();

    tracing::info!(
        transcript = %args.transcript.display(),
        chunk_size = settings.chunk_size,
        format = ?settings.format,
        "replaying transcript"
    );

    let mut write_result = Ok(());
    let outcome = session.run(source, |pass| {
        if settings.every_pass && write_result.is_ok() {
            write_result = write_pass(out, pass, &settings);
        }
        if args.abort_after.is_some_and(|limit| pass.sequence + 1 >= limit) {
            abort.abort();
        }
    });
    write_result?;

    write_outcome(out, &outcome, &settings)?;
    out.flush()?;

    match outcome.status {
        StreamStatus::Failed => Err(ReplayError::StreamFailed {
            notice: outcome
                .notice
                .unwrap_or_else(|| "The response stream was interrupted".to_string()),
        }),
        StreamStatus::Completed | StreamStatus::Aborted => Ok(()),
    }
}

/// `-` is stdin; anything else must exist.
pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin()));
    }
    if !path.exists() {
        return Err(ReplayError::MissingPath {
            path: path.to_path_buf(),
        });
    }
    Ok(Box::new(BufReader::new(File::open(path)?)))
}

pub fn read_input(path: &Path) -> Result<String> {
    let mut text = String::new();
    open_input(path)?.read_to_string(&mut text)?;
    Ok(text)
}

fn trigger_label(trigger: PassTrigger) -> String {
    match trigger {
        PassTrigger::Delta(n) => format!("delta {n}"),
        PassTrigger::Final => "final".to_string(),
    }
}

fn write_pass(out: &mut dyn Write, pass: &RenderPass, settings: &ReplaySettings) -> Result<()> {
    match settings.format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, pass)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "── pass {} ({}) · {} bytes · {} nodes{}",
                pass.sequence,
                trigger_label(pass.trigger),
                pass.text_len,
                pass.pass.tree.len(),
                if pass.pass.report.pending_directive {
                    " · directive pending"
                } else {
                    ""
                }
            )?;
            for line in paint_tree(&pass.pass.tree, settings.width) {
                writeln!(out, "{line}")?;
            }
        }
    }
    Ok(())
}

fn write_outcome(
    out: &mut dyn Write,
    outcome: &StreamOutcome,
    settings: &ReplaySettings,
) -> Result<()> {
    if settings.format == OutputFormat::Json {
        let report = ReplayReport {
            status: outcome.status,
            passes: outcome.passes,
            transcript_len: outcome.transcript.len(),
            notice: outcome.notice.as_deref(),
            last_pass: outcome.last_pass.as_ref(),
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    if let Some(last) = &outcome.last_pass {
        if !settings.every_pass {
            if !last.pass.prose.is_empty() {
                writeln!(out, "{}", last.pass.prose)?;
                writeln!(out)?;
            }
            for line in paint_tree(&last.pass.tree, settings.width) {
                writeln!(out, "{line}")?;
            }
        }
        let report = &last.pass.report;
        writeln!(
            out,
            "-- {:?}: {} passes, {} records, {} placeholders, {} decode failures, {} orphans",
            outcome.status,
            outcome.passes,
            report.records,
            last.pass.tree.placeholders().len(),
            report.decode_failures,
            last.pass.orphans.len(),
        )?;
    } else {
        writeln!(out, "-- {:?}: no passes", outcome.status)?;
    }
    if let Some(notice) = &outcome.notice {
        writeln!(out, "!! {notice}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::cli::ProfileArgs;

    fn args(transcript: PathBuf) -> ReplayArgs {
        ReplayArgs {
            transcript,
            profile: ProfileArgs {
                profile: "default".to_string(),
                profile_file: None,
            },
            chunk_size: None,
            delay_ms: None,
            format: None,
            width: None,
            every_pass: false,
            abort_after: None,
            epoch_ms: Some(1),
        }
    }

    fn transcript(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    const BADGE: &str = "Here is a result:\n```json\n{\"id\":\"x\",\"type\":\"badge\",\"properties\":{\"text\":\"Done\"}}\n```\n";

    #[test]
    fn flags_override_profile_values() {
        let mut args = args(PathBuf::from("-"));
        args.chunk_size = Some(3);
        args.width = Some(40);
        args.format = Some(OutputFormat::Json);
        let settings = args.settings().unwrap();
        assert_eq!(settings.chunk_size, 3);
        assert_eq!(settings.width, 40);
        assert_eq!(settings.format, OutputFormat::Json);
        assert_eq!(settings.epoch_ms, Some(1));
    }

    #[test]
    fn zero_chunk_size_is_a_usage_error() {
        let mut args = args(PathBuf::from("-"));
        args.chunk_size = Some(0);
        assert_eq!(args.settings().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn text_replay_prints_prose_tree_and_summary() {
        let file = transcript(BADGE.as_bytes());
        let mut out = Vec::new();
        run_replay(&args(file.path().to_path_buf()), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Here is a result:\n"));
        assert!(text.contains("(Done)"));
        assert!(text.contains("-- Completed:"));
        assert!(text.contains("1 records"));
    }

    #[test]
    fn every_pass_prints_each_pass_header() {
        let file = transcript(BADGE.as_bytes());
        let mut args = args(file.path().to_path_buf());
        args.every_pass = true;
        args.chunk_size = Some(BADGE.len());
        let mut out = Vec::new();
        run_replay(&args, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("── pass 0 (delta 1)"));
        assert!(text.contains("── pass 1 (final)"));
    }

    #[test]
    fn abort_after_stops_early() {
        let file = transcript(BADGE.as_bytes());
        let mut args = args(file.path().to_path_buf());
        args.chunk_size = Some(5);
        args.abort_after = Some(2);
        args.format = Some(OutputFormat::Json);
        let mut out = Vec::new();
        run_replay(&args, &mut out).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["status"], "aborted");
        assert_eq!(report["passes"], 2);
        assert_eq!(report["transcript_len"], 10);
    }

    #[test]
    fn invalid_utf8_keeps_last_tree_and_fails() {
        let mut bytes = BADGE.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let file = transcript(&bytes);
        let mut args = args(file.path().to_path_buf());
        args.chunk_size = Some(BADGE.len());
        let mut out = Vec::new();
        let error = run_replay(&args, &mut out).unwrap_err();
        assert_eq!(error.exit_code(), 3);
        assert!(error.to_string().contains("not valid UTF-8"));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(Done)"));
        assert!(text.contains("!! The response stream was interrupted"));
    }

    #[test]
    fn missing_transcript_is_reported() {
        let error = run_replay(&args(PathBuf::from("/nonexistent/genui.txt")), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(error, ReplayError::MissingPath { .. }));
    }
}
