use anyhow::Context;
use modelvault_core::{IncomingFile, SessionId};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Pretty-print `value` as JSON on stdout.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// File name component of `path`, used as the upload's original name.
pub fn original_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

/// Copy `source` into `spool_dir` so the pipeline can consume and remove the
/// copy while the user's file stays in place.
pub async fn spool_copy(source: &Path, spool_dir: &Path) -> anyhow::Result<IncomingFile> {
    let name = original_name(source)?;
    let spool_path: PathBuf = spool_dir.join(format!("modelvault-{}.upload", SessionId::new()));

    let size = tokio::fs::copy(source, &spool_path)
        .await
        .with_context(|| format!("Failed to spool {}", source.display()))?;

    Ok(IncomingFile::new(spool_path, name, size))
}
