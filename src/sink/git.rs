// src/sink/git.rs
// =============================================================================
// Publishes the export by committing and pushing it with git.
//
// Steps (run in the directory that holds the CSV):
//   git add <file>
//   git commit -m <message>
//   git push
//
// This runs after the CSV is safely on disk. If any step fails we report
// it, but the export itself stays valid.
// =============================================================================

use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::crawl::CrawlError;

pub async fn publish(path: &Path, message: &str) -> Result<(), CrawlError> {
    let failure = |reason: String| CrawlError::PublishFailure {
        path: path.display().to_string(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = path
        .file_name()
        .ok_or_else(|| failure("path has no file name".to_string()))?
        .to_string_lossy()
        .to_string();

    run_git(dir, &["add", &file]).await.map_err(failure)?;
    run_git(dir, &["commit", "-m", message]).await.map_err(failure)?;
    run_git(dir, &["push"]).await.map_err(failure)?;

    info!(path = %path.display(), "Export pushed");
    Ok(())
}

// Runs one git command, turning a non-zero exit into its stderr text
async fn run_git(dir: &Path, args: &[&str]) -> Result<(), String> {
    debug!(?args, dir = %dir.display(), "running git");

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| format!("could not run git {}: {}", args[0], e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "git {} exited with {}: {}",
            args[0],
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
