//! Render stage
//!
//! Reframes a fetched clip to a fixed portrait frame and burns in the
//! caption and call-to-action overlays.

pub mod overlay;

use std::path::{Path, PathBuf};

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderFailure, ToolError};
use crate::tool::{Invocation, ToolRunner};

use overlay::TextBox;

/// Output frame width
pub const FRAME_WIDTH: u32 = 1080;

/// Output frame height
pub const FRAME_HEIGHT: u32 = 1920;

/// Scale-to-fit, centered letterbox pad, then the two text boxes
pub fn filter_graph(caption: &str, cta: &str) -> String {
    [
        format!(
            "scale=w={}:h={}:force_original_aspect_ratio=decrease",
            FRAME_WIDTH, FRAME_HEIGHT
        ),
        format!(
            "pad=w={}:h={}:x=(ow-iw)/2:y=(oh-ih)/2:color=black",
            FRAME_WIDTH, FRAME_HEIGHT
        ),
        TextBox::caption(caption).filter(),
        TextBox::cta(cta).filter(),
    ]
    .join(",")
}

/// Build the transcoder invocation
pub fn build_invocation(
    config: &RenderConfig,
    input: &Path,
    output: &Path,
    caption: &str,
    cta: &str,
) -> Invocation {
    let mut inv = Invocation::new(&config.binary, config.timeout(), config.max_output_bytes);
    inv.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]);
    inv.arg("-i").arg(input.as_os_str());
    inv.arg("-vf").arg(filter_graph(caption, cta));
    inv.args(["-c:v", "libx264", "-preset", "fast", "-crf", "23"]);
    inv.args(["-c:a", "aac", "-b:a", "128k"]);
    inv.args(["-movflags", "+faststart"]);
    inv.arg(output.as_os_str());
    inv
}

/// Render `input` into `output`, replacing any file already there
pub async fn render(
    runner: &dyn ToolRunner,
    config: &RenderConfig,
    input: &Path,
    output: &Path,
    caption: &str,
    cta: &str,
) -> Result<PathBuf, RenderError> {
    let invocation = build_invocation(config, input, output, caption, cta);

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "Rendering portrait segment"
    );

    runner.run(&invocation).await.map_err(render_error)?;

    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.is_file() => Ok(output.to_path_buf()),
        _ => Err(RenderError::new(
            RenderFailure::ToolFailure,
            format!("transcoder wrote no file at {}", output.display()),
        )),
    }
}

fn render_error(err: ToolError) -> RenderError {
    match err {
        ToolError::Timeout { .. } => RenderError::new(RenderFailure::Timeout, err.to_string()),
        ToolError::Exited { stderr, status, .. } => {
            let detail = if stderr.trim().is_empty() { status } else { stderr };
            RenderError::new(RenderFailure::ToolFailure, detail)
        }
        other => RenderError::new(RenderFailure::ToolFailure, other.to_string()),
    }
}
