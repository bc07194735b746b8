//! One-shot inspection commands: `extract` and `layout`.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use ftui_genui::renderers::mindmap::mindmap_tree;
use ftui_genui::{Props, layout_mindmap};
use serde_json::{Value, json};

use crate::cli::ProfileArgs;
use crate::error::{ReplayError, Result};
use crate::replay::read_input;
use crate::settings::ReplaySettings;

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Transcript file, or `-` for stdin.
    pub transcript: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Fixed epoch for generated ids.
    #[arg(long)]
    pub epoch_ms: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct LayoutArgs {
    /// JSON diagram description (`root`, nested `children`, or flat `nodes`), or `-`.
    pub diagram: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Print the records, report and prose of a transcript as JSON.
pub fn run_extract(args: &ExtractArgs, out: &mut dyn Write) -> Result<()> {
    let mut settings = ReplaySettings::from_profile(&args.profile.load()?)?;
    if args.epoch_ms.is_some() {
        settings.epoch_ms = args.epoch_ms;
    }
    let text = read_input(&args.transcript)?;
    let pipeline = settings.pipeline();
    let extraction = pipeline.extractor().extract(&text);
    let prose = extraction.prose(&text);

    let document = json!({
        "records": extraction.records,
        "report": extraction.report,
        "prose": prose,
        "pending_from": extraction.pending_from,
    });
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)?;
    Ok(())
}

/// Print the mindmap layout of a diagram description as JSON.
pub fn run_layout(args: &LayoutArgs, out: &mut dyn Write) -> Result<()> {
    let settings = ReplaySettings::from_profile(&args.profile.load()?)?;
    let text = read_input(&args.diagram)?;
    let props: Props = match serde_json::from_str::<Value>(&text)? {
        Value::Object(props) => props,
        other => {
            return Err(ReplayError::invalid(format!(
                "diagram must be a JSON object, got {}",
                kind_name(&other)
            )));
        }
    };

    let tree = mindmap_tree(&props)?;
    let layout = layout_mindmap(&tree, &settings.config.layout);
    tracing::debug!(nodes = layout.nodes.len(), depth = layout.max_depth(), "diagram laid out");

    serde_json::to_writer_pretty(&mut *out, &layout)?;
    writeln!(out)?;
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
