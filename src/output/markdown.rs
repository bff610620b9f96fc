//! Markdown job digest
//!
//! This module renders the jobs collected by a run, grouped by source, along
//! with a short statistics header.

use crate::output::stats::RunStatistics;
use crate::state::JobRecord;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Characters of each description shown in the digest
const EXCERPT_CHARS: usize = 280;

/// Writes the markdown digest of a run
///
/// # Arguments
///
/// * `jobs` - The collected records
/// * `stats` - Statistics of the same run
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the digest
/// * `Err(io::Error)` - Failed to write the file
pub fn generate_markdown_digest(
    jobs: &[JobRecord],
    stats: &RunStatistics,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_digest(jobs, stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats collected jobs as markdown
pub fn format_markdown_digest(jobs: &[JobRecord], stats: &RunStatistics) -> String {
    let mut md = String::new();

    md.push_str("# Jobtrawl Digest\n\n");
    md.push_str(&format!("Generated {}\n\n", Utc::now().to_rfc3339()));

    md.push_str("## Run Statistics\n\n");
    md.push_str("| Source | Jobs | Queries | Duplicates | Placeholder descriptions |\n");
    md.push_str("|--------|------|---------|------------|--------------------------|\n");
    for source in &stats.sources {
        match &source.error {
            Some(error) => md.push_str(&format!(
                "| {} | failed: {} | - | - | - |\n",
                source.source,
                escape_cell(error)
            )),
            None => md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                source.source,
                source.collected,
                source.queries,
                source.duplicates,
                source.placeholder
            )),
        }
    }
    md.push('\n');

    if jobs.is_empty() {
        md.push_str("No jobs were collected.\n");
        return md;
    }

    let mut by_source: BTreeMap<&str, Vec<&JobRecord>> = BTreeMap::new();
    for job in jobs {
        by_source.entry(job.source.name()).or_default().push(job);
    }

    for (source, jobs) in by_source {
        md.push_str(&format!("## {} ({})\n\n", source, jobs.len()));
        for job in jobs {
            md.push_str(&format!("### [{}]({})\n\n", job.title, job.url));
            md.push_str(&format!("- **Company**: {}\n", job.company));
            md.push_str(&format!("- **Location**: {}\n", job.location));
            if let Some(date) = &job.date_posted {
                md.push_str(&format!("- **Posted**: {}\n", date));
            }
            md.push('\n');
            if !job.has_placeholder_description() && !job.is_basic() {
                md.push_str(&format!("> {}\n\n", excerpt(&job.description)));
            }
        }
    }

    md
}

fn excerpt(description: &str) -> String {
    let flat = description.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::stats::SourceStatistics;
    use crate::state::{JobSource, DESCRIPTION_NOT_FOUND};
    use std::time::Duration;
    use tempfile::TempDir;

    fn job(n: usize, source: JobSource, description: &str) -> JobRecord {
        JobRecord::basic(
            format!("Rust Engineer {}", n),
            "Ferris Inc".to_string(),
            "Jakarta".to_string(),
            format!("https://jobs.test/{}", n),
            source,
            None,
        )
        .with_description(description.to_string())
    }

    fn stats() -> RunStatistics {
        RunStatistics {
            sources: vec![SourceStatistics {
                source: "Indeed".to_string(),
                login: None,
                queries: 2,
                emitted: 2,
                duplicates: 0,
                enriched: 1,
                placeholder: 1,
                collected: 2,
                elapsed: Duration::from_secs(1),
                error: None,
            }],
            ..RunStatistics::default()
        }
    }

    #[test]
    fn test_digest_groups_by_source() {
        let jobs = vec![
            job(1, JobSource::Indeed, "Build crawlers in Rust."),
            job(2, JobSource::Glints, DESCRIPTION_NOT_FOUND),
        ];
        let markdown = format_markdown_digest(&jobs, &stats());

        assert!(markdown.contains("# Jobtrawl Digest"));
        assert!(markdown.contains("## Glints (1)"));
        assert!(markdown.contains("## Indeed (1)"));
        assert!(markdown.contains("[Rust Engineer 1](https://jobs.test/1)"));
        assert!(markdown.contains("> Build crawlers in Rust."));
        assert!(!markdown.contains(DESCRIPTION_NOT_FOUND));
        assert!(markdown.contains("| Indeed | 2 | 2 | 0 | 1 |"));
    }

    #[test]
    fn test_digest_without_jobs() {
        let markdown = format_markdown_digest(&[], &RunStatistics::default());
        assert!(markdown.contains("No jobs were collected."));
    }

    #[test]
    fn test_long_descriptions_are_cut() {
        let long = "word ".repeat(200);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_generate_markdown_digest_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs.md");

        generate_markdown_digest(&[job(1, JobSource::Indeed, "Text")], &stats(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Indeed (1)"));
    }
}
