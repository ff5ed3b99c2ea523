use std::path::Path;

use crate::error::Result;

/// Point the Mayhemfile's `project:` entry at `project`.
///
/// Every line containing `project:` is cut at that key and rewritten.
/// Returns `false` without touching anything when the file does not exist.
pub async fn pin_project(path: &Path, project: &str) -> Result<bool> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                path = %path.display(),
                "Mayhemfile not found, leaving project unpinned"
            );
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let rewritten = rewrite_project(&contents, project);
    if rewritten != contents {
        tokio::fs::write(path, rewritten).await?;
        tracing::debug!(path = %path.display(), project, "Pinned Mayhemfile project");
    }
    Ok(true)
}

fn rewrite_project(contents: &str, project: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    for line in contents.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        match body.find("project:") {
            Some(idx) => {
                out.push_str(&body[..idx]);
                out.push_str("project: ");
                out.push_str(project);
            }
            None => out.push_str(body),
        }
        out.push_str(newline);
    }
    out
}
