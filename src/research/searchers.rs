//! Concrete searchers: DuckDuckGo web search via daedra, local files, and a
//! dispatcher choosing between them by task source.

use crate::agents::prompts;
use crate::llm::{Agent, GenerationOutcome};
use crate::research::search::{SearchFindings, Searcher};
use crate::types::{AppError, Citation, Result, SearchSource, SearchTask};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Web search powered by daedra, summarized by the search agent.
pub struct WebSearcher {
    summarizer: Agent,
    summary_timeout: Duration,
    num_results: usize,
}

impl WebSearcher {
    pub fn new(summarizer: Agent, summary_timeout: Duration, num_results: usize) -> Self {
        Self {
            summarizer,
            summary_timeout,
            num_results,
        }
    }
}

/// Lay out search hits as numbered entries, recording each entry's span as
/// the citation offsets.
fn render_results(hits: &[(String, String, String)]) -> (String, Vec<Citation>) {
    let mut material = String::new();
    let mut citations = Vec::with_capacity(hits.len());

    for (idx, (title, url, description)) in hits.iter().enumerate() {
        let start_offset = material.len();
        material.push_str(&format!("{}. {}\n{}\nURL: {}\n\n", idx + 1, title, description, url));
        citations.push(Citation {
            url: url.clone(),
            title: title.clone(),
            start_offset,
            end_offset: material.len(),
        });
    }

    (material, citations)
}

#[async_trait]
impl Searcher for WebSearcher {
    async fn search(&self, task: &SearchTask) -> Result<SearchFindings> {
        let search_args = daedra::SearchArgs {
            query: task.query.clone(),
            options: Some(daedra::SearchOptions {
                num_results: self.num_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let hits: Vec<(String, String, String)> = response
            .data
            .iter()
            .map(|r| (r.title.to_string(), r.url.to_string(), r.description.to_string()))
            .collect();

        if hits.is_empty() {
            return Err(AppError::Search(format!("No results found for: {}", task.query)));
        }

        let (material, citations) = render_results(&hits);
        let input = prompts::search_input(task, &material);

        let summary = match self.summarizer.invoke(&input, self.summary_timeout).await {
            GenerationOutcome::Failed(err) => return Err(err),
            outcome => outcome.raw_text().unwrap_or_default(),
        };

        // An empty summary still leaves the raw hits usable.
        let summary = if summary.trim().is_empty() {
            material
        } else {
            summary
        };

        Ok(SearchFindings { summary, citations })
    }
}

/// Reads the beginning of a local file as search material.
pub struct FileSearcher {
    excerpt_chars: usize,
}

impl FileSearcher {
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    async fn read_excerpt(&self, path: &Path) -> Result<String> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("File not found: {}", path.display()))
            }
            _ => AppError::Io(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        Ok(content.chars().take(self.excerpt_chars).collect())
    }
}

impl Default for FileSearcher {
    fn default() -> Self {
        Self::new(2000)
    }
}

#[async_trait]
impl Searcher for FileSearcher {
    async fn search(&self, task: &SearchTask) -> Result<SearchFindings> {
        let path = match &task.source {
            SearchSource::File(path) => path,
            SearchSource::Web => {
                return Err(AppError::InvalidInput(format!(
                    "File searcher received a web task: {}",
                    task.query
                )))
            }
        };

        let excerpt = self.read_excerpt(path).await?;
        if excerpt.trim().is_empty() {
            return Err(AppError::Search(format!("File is empty: {}", path.display())));
        }

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(SearchFindings {
            citations: vec![Citation {
                url: format!("file://{}", path.display()),
                title,
                start_offset: 0,
                end_offset: excerpt.len(),
            }],
            summary: excerpt,
        })
    }
}

/// Routes each task to the web or file searcher by its source.
pub struct CompositeSearcher {
    web: Option<Arc<dyn Searcher>>,
    files: Option<Arc<dyn Searcher>>,
}

impl CompositeSearcher {
    pub fn new(web: Option<Arc<dyn Searcher>>, files: Option<Arc<dyn Searcher>>) -> Self {
        Self { web, files }
    }
}

#[async_trait]
impl Searcher for CompositeSearcher {
    async fn search(&self, task: &SearchTask) -> Result<SearchFindings> {
        let searcher = match task.source {
            SearchSource::Web => self.web.as_ref(),
            SearchSource::File(_) => self.files.as_ref(),
        };

        match searcher {
            Some(searcher) => searcher.search(task).await,
            None => Err(AppError::InvalidInput(format!(
                "No searcher configured for task '{}'",
                task.query
            ))),
        }
    }
}
