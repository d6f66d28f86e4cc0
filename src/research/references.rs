//! Citation renumbering.
//!
//! Reports cite sources inline as `(Reference N)`. Models number these
//! loosely, so before a report leaves the synthesizer or the refinement loop
//! the distinct numerals are mapped, ascending, onto `1..=k` and every marker
//! is rewritten in one pass. Entries of the References section are rewritten
//! with the same mapping, matched by numeral; entries never cited inline keep
//! their original numeral.

use crate::types::ReportRecord;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

static INLINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(Reference ([1-9][0-9]*)\)").unwrap());

static REFERENCES_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*)?\s*(?:references|bibliography)\s*(?:\*\*)?\s*:?\s*$")
        .unwrap()
});

static ANY_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#{1,6}\s").unwrap());

static LIST_ENUMERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([0-9]+)\.(\s)").unwrap());

/// Old numeral to new contiguous index, built from inline markers.
pub fn reference_mapping(body: &str) -> HashMap<u64, u64> {
    let distinct: BTreeSet<u64> = INLINE_MARKER
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect();

    distinct
        .into_iter()
        .zip(1u64..)
        .collect()
}

/// Count of distinct inline reference numerals.
pub fn distinct_markers(body: &str) -> usize {
    reference_mapping(body).len()
}

/// Renumber inline markers and the References section of a markdown body.
pub fn renumber(body: &str) -> String {
    let mapping = reference_mapping(body);
    if mapping.is_empty() {
        return body.to_string();
    }

    let inline_rewritten = INLINE_MARKER
        .replace_all(body, |caps: &Captures| {
            match caps[1].parse::<u64>().ok().and_then(|n| mapping.get(&n)) {
                Some(new) => format!("(Reference {})", new),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    rewrite_reference_list(&inline_rewritten, &mapping)
}

fn rewrite_reference_list(body: &str, mapping: &HashMap<u64, u64>) -> String {
    let mut output = String::with_capacity(body.len());
    let mut in_references = false;

    for line in body.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if REFERENCES_HEADING.is_match(content) {
            in_references = true;
            output.push_str(line);
            continue;
        }
        if in_references && ANY_HEADING.is_match(content) {
            in_references = false;
        }

        if in_references {
            let rewritten = LIST_ENUMERATOR.replace(line, |caps: &Captures| {
                match caps[2].parse::<u64>().ok().and_then(|n| mapping.get(&n)) {
                    Some(new) => format!("{}{}.{}", &caps[1], new, &caps[3]),
                    None => caps[0].to_string(),
                }
            });
            output.push_str(&rewritten);
        } else {
            output.push_str(line);
        }
    }

    output
}

/// Normalize a report's citation numbering. Idempotent.
pub fn normalize(mut report: ReportRecord) -> ReportRecord {
    report.markdown_report = renumber(&report.markdown_report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        LazyLock::force(&INLINE_MARKER);
        LazyLock::force(&REFERENCES_HEADING);
        LazyLock::force(&ANY_HEADING);
        LazyLock::force(&LIST_ENUMERATOR);
    }

    #[test]
    fn test_mapping_sorted_ascending() {
        let mapping = reference_mapping("(Reference 5) x (Reference 2) y (Reference 5)");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[&2], 1);
        assert_eq!(mapping[&5], 2);
    }

    #[test]
    fn test_renumber_inline_markers_consistently() {
        let body = "A (Reference 5). B (Reference 2). C (Reference 5).";
        assert_eq!(
            renumber(body),
            "A (Reference 2). B (Reference 1). C (Reference 2)."
        );
    }

    #[test]
    fn test_renumber_references_section() {
        let body = "# Report\n\nClaim (Reference 7) and (Reference 3).\n\n## References\n\n3. Paper three\n7. Paper seven\n9. Never cited\n\n## Appendix\n\n7. Not a reference\n";
        let result = renumber(body);
        assert!(result.contains("Claim (Reference 2) and (Reference 1)."));
        assert!(result.contains("## References\n\n1. Paper three\n2. Paper seven\n9. Never cited\n"));
        assert!(result.contains("## Appendix\n\n7. Not a reference\n"));
    }

    #[test]
    fn test_bold_bibliography_heading() {
        let body = "See (Reference 4).\n\n**Bibliography**\n4. Source\n";
        assert_eq!(renumber(body), "See (Reference 1).\n\n**Bibliography**\n1. Source\n");
    }

    #[test]
    fn test_no_markers_is_unchanged() {
        let body = "# Title\n\n## References\n\n5. Orphan\n";
        assert_eq!(renumber(body), body);
    }

    #[test]
    fn test_ignores_zero_and_malformed_markers() {
        let body = "(Reference 0) (Reference x) (reference 3) (Reference 8)";
        assert_eq!(
            renumber(body),
            "(Reference 0) (Reference x) (reference 3) (Reference 1)"
        );
    }

    #[test]
    fn test_swap_does_not_cascade() {
        // 3 -> 2 and 10 -> 3 are applied in a single pass
        let body = "(Reference 3) (Reference 1) (Reference 10)\n\n## References\n1. a\n3. b\n10. c\n";
        assert_eq!(
            renumber(body),
            "(Reference 2) (Reference 1) (Reference 3)\n\n## References\n1. a\n2. b\n3. c\n"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let report = ReportRecord::new(
            "summary",
            "Intro (Reference 12) (Reference 4)\n\n# References\n4. four\n12. twelve\n2. orphan\n",
        );
        let once = normalize(report);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_crlf_lines_preserved() {
        let body = "(Reference 6)\r\n## References\r\n6. six\r\n";
        assert_eq!(renumber(body), "(Reference 1)\r\n## References\r\n1. six\r\n");
    }
}
