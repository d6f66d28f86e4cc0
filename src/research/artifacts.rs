//! Run artifacts on disk: raw generation snapshots for offline recovery and
//! the final markdown report.
//!
//! Raw snapshots are best-effort. A failed write is logged and ignored.

use crate::types::{AppError, ReportRecord, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: Option<PathBuf>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Store that writes nothing.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Snapshot raw model output as `raw_<stage>_<timestamp>.txt`.
    pub async fn save_raw(&self, stage: &str, content: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let filename = format!(
            "raw_{}_{}.txt",
            slug(stage, 24),
            Local::now().format("%Y%m%d_%H%M%S_%3f")
        );
        let path = dir.join(filename);

        match write_file(&path, content).await {
            Ok(()) => {
                tracing::debug!("Saved raw {} output to {}", stage, path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not save raw {} output: {}", stage, e);
                None
            }
        }
    }

    /// Write the final report. `target` overrides the generated
    /// `research_<query>_<timestamp>.md` path inside the artifact directory.
    pub async fn save_report(
        &self,
        query: &str,
        report: &ReportRecord,
        target: Option<&Path>,
    ) -> Result<PathBuf> {
        let now = Local::now();
        let path = match (target, &self.dir) {
            (Some(target), _) => target.to_path_buf(),
            (None, Some(dir)) => dir.join(format!(
                "research_{}_{}.md",
                slug(query, 40),
                now.format("%Y%m%d_%H%M%S")
            )),
            (None, None) => {
                return Err(AppError::Configuration(
                    "No output path given and artifacts are disabled".to_string(),
                ))
            }
        };

        write_file(&path, &render_markdown(query, report, now)).await?;
        tracing::info!("Research report saved to {}", path.display());
        Ok(path)
    }
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Filesystem-safe prefix of `text`.
pub fn slug(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect()
}

/// Final markdown document: the report body with a title, a generation
/// timestamp and a Key Insights section added when missing.
pub fn render_markdown(query: &str, report: &ReportRecord, generated_at: DateTime<Local>) -> String {
    let body = report.markdown_report.trim();
    let mut document = if body.starts_with("# ") {
        body.to_string()
    } else {
        format!("# {}\n\n{}", query, body)
    };

    if !document.contains("*Generated on:") {
        let stamp = format!("*Generated on: {}*", generated_at.format("%Y-%m-%d %H:%M:%S"));
        document = match document.find('\n') {
            Some(title_end) => format!(
                "{}\n\n{}{}",
                &document[..title_end],
                stamp,
                &document[title_end..]
            ),
            None => format!("{}\n\n{}\n", document, stamp),
        };
    }

    if !report.key_insights.is_empty() && !document.contains("## Key Insights") {
        let mut insights = String::from("## Key Insights\n\n");
        for insight in &report.key_insights {
            insights.push_str(&format!("- {}\n", insight));
        }
        document = match document.find("## References") {
            Some(pos) => format!("{}{}\n{}", &document[..pos], insights, &document[pos..]),
            None => format!("{}\n\n{}", document.trim_end(), insights),
        };
    }

    if !document.ends_with('\n') {
        document.push('\n');
    }
    document
}
