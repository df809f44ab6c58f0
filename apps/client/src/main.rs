//! CLI driver for the upload client.
//!
//! Usage: client <file> [server-url]
//! The server URL defaults to CRITIQUE_SERVER_URL, then http://localhost:5000.

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use client::{HttpTransport, StagedFile, Status, UploadClient};

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Declared MIME type inferred from the file extension. The server performs
/// its own gate; unknown extensions are passed through and rejected there.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: client <file> [server-url]");
        return ExitCode::from(1);
    };
    let server_url = args
        .next()
        .or_else(|| std::env::var("CRITIQUE_SERVER_URL").ok())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let path = Path::new(&path_arg);
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", path.display());
            return ExitCode::from(1);
        }
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let mut form = UploadClient::new();
    form.stage_file(StagedFile {
        name,
        mime: mime_for(path),
        data,
    });

    let transport = HttpTransport::new(server_url);
    if let Err(e) = form.submit(&transport).await {
        eprintln!("{e}");
        return ExitCode::from(1);
    }

    match form.status() {
        Status::Done => {
            if let Some(analysis) = form.analysis() {
                println!("{}", analysis.as_str());
            }
            ExitCode::SUCCESS
        }
        // The form reverts to idle silently on failure; the CLI still has
        // to exit nonzero.
        _ => {
            eprintln!("Analysis unavailable");
            ExitCode::from(2)
        }
    }
}
