use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::inspect::{ExtractArgs, LayoutArgs, run_extract, run_layout};
use crate::profile::{Profile, list_profile_names, load_profile, load_profile_file};
use crate::replay::{ReplayArgs, run_replay};

#[derive(Debug, Parser)]
#[command(
    name = "ftui-genui-replay",
    about = "Replay model transcripts through the FrankenTUI generative-UI pipeline",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Stream a transcript chunk by chunk and print the rendered tree.
    Replay(ReplayArgs),

    /// Print extracted records and the extraction report as JSON.
    Extract(ExtractArgs),

    /// Print the mindmap layout of a diagram description as JSON.
    Layout(LayoutArgs),

    /// Print built-in profile names.
    #[command(name = "list-profiles")]
    ListProfiles,
}

/// Built-in profile plus an optional file overlay.
#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    /// Built-in replay profile.
    #[arg(long, default_value = "default")]
    pub profile: String,

    /// `.env`-style file whose keys override the profile.
    #[arg(long)]
    pub profile_file: Option<PathBuf>,
}

impl ProfileArgs {
    pub fn load(&self) -> Result<Profile> {
        let mut profile = load_profile(&self.profile)?;
        if let Some(path) = &self.profile_file {
            profile.overlay(load_profile_file(path)?);
        }
        tracing::debug!(profile = %profile.name, keys = profile.values.len(), "profile resolved");
        Ok(profile)
    }
}

pub fn run_from_env() -> Result<()> {
    crate::logging::init();
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Replay(args) => run_replay(&args, out),
        Commands::Extract(args) => run_extract(&args, out),
        Commands::Layout(args) => run_layout(&args, out),
        Commands::ListProfiles => {
            for name in list_profile_names() {
                writeln!(out, "{name}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::error::ReplayError;
    use crate::settings::OutputFormat;

    use super::{Cli, Commands, ProfileArgs, run};

    #[test]
    fn list_profiles_command_dispatches_successfully() {
        let mut out = Vec::new();
        run(
            Cli {
                command: Commands::ListProfiles,
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "default\ntyping\ncompact\nstrict-json\n"
        );
    }

    #[test]
    fn replay_flags_parse() {
        let cli = Cli::try_parse_from([
            "ftui-genui-replay",
            "replay",
            "reply.txt",
            "--profile",
            "typing",
            "--chunk-size",
            "8",
            "--format",
            "json",
            "--abort-after",
            "3",
        ])
        .unwrap();
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.transcript, PathBuf::from("reply.txt"));
        assert_eq!(args.profile.profile, "typing");
        assert_eq!(args.chunk_size, Some(8));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.abort_after, Some(3));
        assert!(!args.every_pass);
    }

    #[test]
    fn unknown_profile_dispatches_profile_not_found_error() {
        let profile = ProfileArgs {
            profile: "not-a-real-profile".to_string(),
            profile_file: None,
        };
        match profile.load().expect_err("missing profile should fail") {
            ReplayError::ProfileNotFound { name } => assert_eq!(name, "not-a-real-profile"),
            other => panic!("expected ProfileNotFound, got {other}"),
        }
    }

    #[test]
    fn missing_profile_file_dispatches_missing_path_error() {
        let profile = ProfileArgs {
            profile: "default".to_string(),
            profile_file: Some(PathBuf::from("/tmp/ftui-genui-replay/does-not-exist.env")),
        };
        match profile.load().expect_err("missing file should fail") {
            ReplayError::MissingPath { path } => {
                assert_eq!(path, PathBuf::from("/tmp/ftui-genui-replay/does-not-exist.env"));
            }
            other => panic!("expected MissingPath, got {other}"),
        }
    }
}
