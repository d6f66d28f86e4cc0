//! Report synthesis tests
//!
//! The writer is a scripted client, so these cover how each kind of model
//! answer is normalized into a report.

mod common;

use common::mocks::{report_json, MockLLMClient};
use std::sync::Arc;
use std::time::Duration;
use vidya::agents::{AgentProfile, AgentRole};
use vidya::research::artifacts::ArtifactStore;
use vidya::research::synthesis::ReportSynthesizer;
use vidya::types::{AppError, Citation, ResearchCategory, SearchOutcome, SearchTask};
use vidya::utils::toml_config::SynthesisConfig;
use vidya::Agent;

const CATEGORY: ResearchCategory = ResearchCategory::Scientific;

fn writer(client: MockLLMClient) -> Agent {
    Agent::new(
        AgentProfile::default_for(AgentRole::Writer(CATEGORY)),
        Arc::new(client),
    )
}

fn success(query: &str, urls: &[&str]) -> SearchOutcome {
    SearchOutcome::Success {
        task: SearchTask::web("reason", query),
        summary: format!("Findings about {}", query),
        citations: urls
            .iter()
            .map(|url| Citation {
                url: url.to_string(),
                title: url.to_string(),
                start_offset: 0,
                end_offset: 0,
            })
            .collect(),
    }
}

fn synthesizer() -> ReportSynthesizer {
    ReportSynthesizer::new(SynthesisConfig::default(), ArtifactStore::disabled())
}

#[tokio::test]
async fn test_structured_report_is_normalized() {
    let body = "# Qubits\n\nSuperconducting (Reference 4) and trapped ions (Reference 2).\n\n## References\n2. Ions\n4. Superconductors\n";
    let agent = writer(MockLLMClient::new(&report_json(body)));
    let outcomes = vec![
        success("qubits", &["https://a", "https://b"]),
        success("ions", &["https://b"]),
    ];

    let (report, extracted) = synthesizer()
        .synthesize("quantum computing", CATEGORY, &outcomes, &agent)
        .await;

    assert_eq!(extracted, 2);
    assert_eq!(report.citation_count, 2);
    assert!(report
        .markdown_report
        .contains("Superconducting (Reference 2) and trapped ions (Reference 1)."));
    assert!(report.markdown_report.contains("## References\n1. Ions\n2. Superconductors\n"));
    assert_eq!(report.short_summary, "A short summary.");
    assert_eq!(report.methodological_approach, "Literature review");
}

#[tokio::test]
async fn test_writer_sees_only_successful_results() {
    let client = Arc::new(MockLLMClient::new(&report_json("# R\n\n## Body\n")));
    let agent = Agent::new(
        AgentProfile::default_for(AgentRole::Writer(CATEGORY)),
        client.clone(),
    );
    let outcomes = vec![
        success("kept", &[]),
        SearchOutcome::failure(SearchTask::web("r", "dropped"), "timed out"),
    ];

    synthesizer().synthesize("q", CATEGORY, &outcomes, &agent).await;

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Original query: q\n\nWeb search results:\n"));
    assert!(prompts[0].contains("Web search for 'kept': Findings about kept"));
    assert!(!prompts[0].contains("dropped"));
}

#[tokio::test]
async fn test_all_searches_failed_still_produces_report() {
    let agent = writer(MockLLMClient::new("# Report\n\nFrom memory.\n\n## Caveats\n\nNo sources."));
    let outcomes = vec![SearchOutcome::failure(SearchTask::web("r", "q"), "timed out")];

    let (report, extracted) = synthesizer().synthesize("q", CATEGORY, &outcomes, &agent).await;

    assert_eq!(extracted, 0);
    assert_eq!(report.citation_count, 0);
    assert!(report.markdown_report.starts_with("# Report"));
}

#[tokio::test]
async fn test_writer_timeout_yields_timeout_report() {
    let agent = writer(
        MockLLMClient::new(&report_json("never seen")).with_delay(Duration::from_millis(500)),
    );
    let outcomes = vec![success("a", &["https://a"])];

    let (report, _) = synthesizer()
        .with_timeout(Duration::from_millis(50))
        .synthesize("slow topic", CATEGORY, &outcomes, &agent)
        .await;

    assert!(report.markdown_report.starts_with("# Research Report on slow topic"));
    assert!(report.markdown_report.contains("timed out"));
    assert!(report.information_gaps.iter().any(|gap| gap.contains("timed out")));
    assert_eq!(report.citation_count, 1);
}

#[tokio::test]
async fn test_writer_error_yields_error_report() {
    let agent = writer(MockLLMClient::failing(AppError::LLM("model crashed".to_string())));

    let (report, _) = synthesizer().synthesize("q", CATEGORY, &[], &agent).await;

    assert!(report.markdown_report.contains("Report generation failed"));
    assert!(report.markdown_report.contains("model crashed"));
}

#[tokio::test]
async fn test_empty_answer_yields_no_content_report() {
    let agent = writer(MockLLMClient::new("  \n "));

    let (report, _) = synthesizer().synthesize("fusion", CATEGORY, &[], &agent).await;

    assert_eq!(
        report.markdown_report,
        "# Research Report on fusion\n\nUnable to extract full report content."
    );
    assert_eq!(
        report.information_gaps,
        vec!["Complete report could not be extracted"]
    );
}

#[tokio::test]
async fn test_truncated_json_is_recovered() {
    let text = r##"{"markdown_report": "# Partial\n\nCut off (Reference 3)", "follow_up_questions": ["##;
    let agent = writer(MockLLMClient::new(text));

    let (report, _) = synthesizer().synthesize("q", CATEGORY, &[], &agent).await;

    assert_eq!(report.markdown_report, "# Partial\n\nCut off (Reference 1)");
    assert_eq!(report.citation_count, 1);
}

#[tokio::test]
async fn test_raw_writer_output_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let agent = writer(MockLLMClient::new("plain words"));
    let synthesizer = ReportSynthesizer::new(
        SynthesisConfig::default(),
        ArtifactStore::new(dir.path()),
    );

    let (report, _) = synthesizer.synthesize("q", CATEGORY, &[], &agent).await;
    assert_eq!(report.markdown_report, "plain words");

    let saved: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("raw_writer_"));
}

#[tokio::test]
async fn test_saved_writer_output_is_the_response_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let response = format!(
        "Here is the report you asked for.\n```json\n{}\n```\nLet me know if you need more.",
        report_json("# Title\n\nBody text.")
    );
    let agent = writer(MockLLMClient::new(&response));
    let synthesizer = ReportSynthesizer::new(
        SynthesisConfig::default(),
        ArtifactStore::new(dir.path()),
    );

    let (report, _) = synthesizer.synthesize("q", CATEGORY, &[], &agent).await;
    assert_eq!(report.markdown_report, "# Title\n\nBody text.");

    let saved: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 1);
    assert_eq!(std::fs::read_to_string(&saved[0]).unwrap(), response);
}
