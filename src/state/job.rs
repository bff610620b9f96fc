use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder description attached when a detail page cannot be read
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";

/// The job site a record was discovered on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    LinkedIn,
    Indeed,
    Glints,
    /// A site declared in configuration rather than shipped as a preset
    Custom(String),
}

impl JobSource {
    /// Human-readable site name, also used as the database representation
    pub fn name(&self) -> &str {
        match self {
            Self::LinkedIn => "LinkedIn",
            Self::Indeed => "Indeed",
            Self::Glints => "Glints",
            Self::Custom(name) => name,
        }
    }

    /// Parses the database representation back into a source
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "linkedin" => Self::LinkedIn,
            "indeed" => Self::Indeed,
            "glints" => Self::Glints,
            _ => Self::Custom(name.to_string()),
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One discovered job listing
///
/// A record is created in basic form by listing traversal (no description) and
/// replaced by its enriched form once a detail worker has read the listing page.
/// The `url` is canonical and acts as the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub source: JobSource,
    pub date_posted: Option<String>,
    pub description: String,
    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a basic record, before description enrichment
    pub fn basic(
        title: String,
        company: String,
        location: String,
        url: String,
        source: JobSource,
        date_posted: Option<String>,
    ) -> Self {
        Self {
            title,
            company,
            location,
            url,
            source,
            date_posted,
            description: String::new(),
            scraped_at: Utc::now(),
        }
    }

    /// Returns the enriched replacement of this record
    pub fn with_description(self, description: String) -> Self {
        Self {
            description,
            ..self
        }
    }

    /// Returns true until a description (or the placeholder) has been attached
    pub fn is_basic(&self) -> bool {
        self.description.is_empty()
    }

    /// Returns true if enrichment failed and the placeholder was attached
    pub fn has_placeholder_description(&self) -> bool {
        self.description == DESCRIPTION_NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_record() -> JobRecord {
        JobRecord::basic(
            "Rust Engineer".to_string(),
            "Ferris Inc".to_string(),
            "Remote".to_string(),
            "https://example.com/jobs/1".to_string(),
            JobSource::Indeed,
            None,
        )
    }

    #[test]
    fn test_basic_record_has_no_description() {
        let record = basic_record();
        assert!(record.is_basic());
        assert!(!record.has_placeholder_description());
    }

    #[test]
    fn test_enrichment_replaces_description_only() {
        let record = basic_record();
        let enriched = record.clone().with_description("Write Rust.".to_string());

        assert!(!enriched.is_basic());
        assert_eq!(enriched.url, record.url);
        assert_eq!(enriched.title, record.title);
        assert_eq!(enriched.description, "Write Rust.");
    }

    #[test]
    fn test_source_name_round_trip() {
        for source in [
            JobSource::LinkedIn,
            JobSource::Indeed,
            JobSource::Glints,
            JobSource::Custom("Jobstreet".to_string()),
        ] {
            assert_eq!(JobSource::from_name(source.name()), source);
        }
    }
}
