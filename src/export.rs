//! PDF export: pipe the print HTML through an external HTML-to-PDF
//! renderer.
//!
//! The renderer (`wkhtmltopdf`) is an external collaborator with a narrow
//! interface: HTML on stdin, PDF bytes on stdout. A missing binary or a
//! failed render is an [`DiagAssistError::Export`] reported inline — it
//! never affects the stored record, and the user can retry after fixing
//! the toolchain.

use crate::error::DiagAssistError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// The external HTML-to-PDF renderer binary.
const RENDERER_BIN: &str = "wkhtmltopdf";

/// Render an HTML document to PDF bytes.
pub async fn render_pdf(html: &str) -> Result<Vec<u8>, DiagAssistError> {
    render_pdf_with(RENDERER_BIN, html).await
}

/// Implementation with an injectable binary name, for tests.
async fn render_pdf_with(renderer: &str, html: &str) -> Result<Vec<u8>, DiagAssistError> {
    let mut child = Command::new(renderer)
        .args(["--quiet", "--encoding", "utf-8", "-", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            let detail = if e.kind() == std::io::ErrorKind::NotFound {
                format!("'{renderer}' was not found")
            } else {
                format!("could not start '{renderer}': {e}")
            };
            DiagAssistError::Export { detail }
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| DiagAssistError::Export {
        detail: "renderer stdin unavailable".into(),
    })?;
    stdin
        .write_all(html.as_bytes())
        .await
        .map_err(|e| DiagAssistError::Export {
            detail: format!("could not write to renderer: {e}"),
        })?;
    drop(stdin);

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| DiagAssistError::Export {
            detail: format!("renderer did not finish: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Renderer exited with {}: {}", output.status, stderr.trim());
        return Err(DiagAssistError::Export {
            detail: format!("renderer exited with {}: {}", output.status, stderr.trim()),
        });
    }

    if output.stdout.is_empty() {
        return Err(DiagAssistError::Export {
            detail: "renderer produced no output".into(),
        });
    }

    debug!("Rendered {} PDF bytes", output.stdout.len());
    Ok(output.stdout)
}
