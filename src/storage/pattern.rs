//! Case-insensitive name matching for record search

use regex::{Regex, RegexBuilder};

use crate::record::BiodataRecord;

/// Compiled name query.
///
/// An empty or missing query matches every record. Anything else must be a
/// valid regular expression.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Option<Regex>,
}

impl NamePattern {
    pub fn new(query: Option<&str>) -> Result<Self, regex::Error> {
        let query = query.unwrap_or_default();
        if query.is_empty() {
            return Ok(Self::any());
        }

        let regex = RegexBuilder::new(query).case_insensitive(true).build()?;
        Ok(Self { regex: Some(regex) })
    }

    /// Pattern that matches every record
    pub fn any() -> Self {
        Self { regex: None }
    }

    pub fn matches(&self, record: &BiodataRecord) -> bool {
        match &self.regex {
            None => true,
            Some(re) => record
                .fields
                .name
                .as_deref()
                .is_some_and(|name| re.is_match(name)),
        }
    }
}
