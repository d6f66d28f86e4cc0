//! Built-in agent instructions and input builders.
//!
//! Instructions can be replaced per agent through `[agents.<name>]
//! system_prompt` in `vidya.toml`; the input builders are fixed.

use crate::types::{Evaluation, ReportRecord, ResearchCategory, SearchTask};

pub const ROUTER_INSTRUCTIONS: &str = r#"You are a routing agent that classifies research queries by domain.

Available categories:
- scientific: natural sciences, medicine, mathematics, empirical research
- technical: software, engineering, hardware, applied technology
- humanities: history, philosophy, literature, arts, social thought
- interdisciplinary: questions spanning several of the above

Analyze the research query and respond with ONLY the category name (lowercase, one word).
Examples:
- "How do mRNA vaccines trigger immunity?" -> scientific
- "Compare Rust async runtimes" -> technical
- "What caused the fall of the Western Roman Empire?" -> humanities
- "How will AI change labor markets?" -> interdisciplinary

Respond with ONLY the category name, nothing else."#;

pub const PLANNER_INSTRUCTIONS: &str = r#"You are a strategic research planner. Analyze the research query and produce a web search plan that will yield the most relevant and complete information.

When planning searches:
1. Break complex queries into specific sub-topics
2. Consider different perspectives on the topic
3. Include both broad and specific search terms
4. Mark the most valuable searches in priority_searches (indices into searches)

Output between 5 and 20 searches, each with the search term and the reason it matters."#;

pub const SEARCH_INSTRUCTIONS: &str = r#"You are a detailed and factual researcher. You receive a search term, the reason for the search and the raw material found for it.

Summarize the material in 2-4 information-dense paragraphs:
1. Extract key facts, data points and insights
2. Prefer reliable sources and note contradictions between them
3. Stay strictly on the search term and its reason
4. Avoid commentary, write only the summary"#;

const WRITER_COMMON: &str = r###"You receive the original query and summarized search results. Write a comprehensive research report in markdown with a title, clearly headed sections, and a final "## References" section.

Cite sources inline as (Reference N) and list each referenced source in the References section as "N. Title - URL". Aim for 1500-2000 words.

Also provide a short summary (2-3 sentences), follow-up questions, key insights, information gaps, and a description of your methodological approach."###;

pub const SCIENTIFIC_INSTRUCTIONS: &str = "You are a senior scientific researcher writing in the style of a rigorous review article: abstract, introduction, current evidence, methodology of the cited work, discussion, limitations, conclusion.";

pub const TECHNICAL_INSTRUCTIONS: &str = "You are a senior engineer writing a technical deep dive: architecture, trade-offs, benchmarks where available, adoption and practical recommendations.";

pub const HUMANITIES_INSTRUCTIONS: &str = "You are a humanities scholar writing an analytical essay: historical context, competing interpretations, primary and secondary sources, and a reasoned conclusion.";

pub const INTERDISCIPLINARY_INSTRUCTIONS: &str = "You are a research analyst synthesizing several disciplines: frame the question from each relevant field, connect the findings, and weigh them against each other.";

pub const EVALUATOR_INSTRUCTIONS: &str = r#"You are a research standards evaluator. Rigorously evaluate the report against the query on a 0-10 scale across accuracy, methodological rigor, use of sources and citations, logical structure, clarity, and acknowledgment of limitations.

Provide an overall_score (0-10), summary and detailed feedback, concrete improvement suggestions, strengths, weaknesses, and meets_standards (true only for publication-quality reports scoring 8.5 or higher)."#;

/// Full writer instructions for a category.
pub fn writer_instructions(category: ResearchCategory) -> String {
    let persona = match category {
        ResearchCategory::Scientific => SCIENTIFIC_INSTRUCTIONS,
        ResearchCategory::Technical => TECHNICAL_INSTRUCTIONS,
        ResearchCategory::Humanities => HUMANITIES_INSTRUCTIONS,
        ResearchCategory::Interdisciplinary => INTERDISCIPLINARY_INSTRUCTIONS,
    };
    format!("{}\n\n{}", persona, WRITER_COMMON)
}

pub fn planner_input(query: &str) -> String {
    format!("Query: {}", query)
}

pub fn search_input(task: &SearchTask, material: &str) -> String {
    format!(
        "Search term: {}\nReason for searching: {}\n\nMaterial:\n{}",
        task.query, task.reason, material
    )
}

pub fn evaluation_input(query: &str, category: ResearchCategory, report: &ReportRecord) -> String {
    format!(
        "Original query: {}\nResearch category: {}\n\nReport to evaluate:\n\n{}",
        query, category, report.markdown_report
    )
}

/// Directed "improve this" prompt folding in the evaluator's verdict.
pub fn refinement_input(query: &str, report: &ReportRecord, evaluation: &Evaluation) -> String {
    let mut input = format!(
        "Original query: {}\n\nThe report below scored {:.1}/10. Please improve it based on this feedback.\n\nFeedback: {}\n",
        query,
        evaluation.overall_score,
        evaluation.feedback()
    );

    if !evaluation.improvement_suggestions.is_empty() {
        input.push_str("\nSuggested improvements:\n");
        for suggestion in &evaluation.improvement_suggestions {
            input.push_str(&format!("- {}\n", suggestion));
        }
    }

    if !evaluation.weaknesses.is_empty() {
        input.push_str("\nWeaknesses to address:\n");
        for weakness in &evaluation.weaknesses {
            input.push_str(&format!("- {}\n", weakness));
        }
    }

    input.push_str(&format!(
        "\nKeep every (Reference N) citation that is still supported.\n\nInitial report:\n\n{}",
        report.markdown_report
    ));
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_instructions_keep_reference_contract() {
        let instructions = writer_instructions(ResearchCategory::Scientific);
        assert!(instructions.contains("a final \"## References\" section"));
        assert!(instructions.ends_with("methodological approach."));
    }

    #[test]
    fn test_writer_instructions_differ_per_category() {
        let scientific = writer_instructions(ResearchCategory::Scientific);
        let technical = writer_instructions(ResearchCategory::Technical);
        assert_ne!(scientific, technical);
        assert!(scientific.contains("(Reference N)"));
    }

    #[test]
    fn test_search_input_format() {
        let task = SearchTask::web("background", "qubit decoherence");
        let input = search_input(&task, "some results");
        assert!(input.starts_with("Search term: qubit decoherence\nReason for searching: background"));
    }

    #[test]
    fn test_refinement_input_folds_feedback() {
        let report = ReportRecord::new("summary", "# Report\n\nBody");
        let evaluation = Evaluation {
            overall_score: 6.0,
            detailed_feedback: "Too shallow".to_string(),
            improvement_suggestions: vec!["Add benchmarks".to_string()],
            weaknesses: vec!["No limitations section".to_string()],
            ..Default::default()
        };
        let input = refinement_input("query", &report, &evaluation);
        assert!(input.contains("6.0/10"));
        assert!(input.contains("Too shallow"));
        assert!(input.contains("- Add benchmarks"));
        assert!(input.contains("- No limitations section"));
        assert!(input.ends_with("# Report\n\nBody"));
    }
}
