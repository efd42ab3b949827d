use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Skip records - the audit trail for excluded soundings
// ---------------------------------------------------------------------------

/// Why a sounding was excluded from the batch. The numeric codes follow the
/// historical report format and appear verbatim in the output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    NoData,
    DuplicateLocation,
    DuplicateDepth,
    BelowThreshold,
    RepeatedDigits,
    InsufficientDepth,
    InsufficientDepthSpan,
}

impl SkipReason {
    /// Short report code, e.g. `Type 01`.
    pub fn code(self) -> &'static str {
        match self {
            SkipReason::NoData => "Type 01",
            SkipReason::DuplicateLocation => "Type 02",
            SkipReason::DuplicateDepth => "Type 03",
            SkipReason::BelowThreshold => "Type 04",
            SkipReason::RepeatedDigits => "Type 05",
            SkipReason::InsufficientDepth => "Type 06",
            SkipReason::InsufficientDepthSpan => "Type 07",
        }
    }

    /// Generic one-line description used in the summary table.
    pub fn summary(self) -> &'static str {
        match self {
            SkipReason::NoData => "No data in record",
            SkipReason::DuplicateLocation => "Sounding too close to another sounding",
            SkipReason::DuplicateDepth => "Duplicate depth detected - invalid sounding",
            SkipReason::BelowThreshold => "Data values less than threshold",
            SkipReason::RepeatedDigits => {
                "Repeated digits indicating a possible instrument problem"
            }
            SkipReason::InsufficientDepth => "Insufficient maximum depth",
            SkipReason::InsufficientDepthSpan => "Insufficient depth span",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One (sounding, failing predicate) pair. A sounding may carry several of
/// these; every predicate runs regardless of earlier failures.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipRecord {
    pub name: String,
    pub reason: SkipReason,
    pub description: String,
}

impl SkipRecord {
    pub fn new(name: impl Into<String>, reason: SkipReason, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason,
            description: description.into(),
        }
    }
}

/// Retain only the earliest-recorded reason per sounding, preserving the
/// original record order.
pub fn first_reason(records: &[SkipRecord]) -> Vec<SkipRecord> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.name.clone()))
        .cloned()
        .collect()
}

/// Per-reason counts over a skip table.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipSummary {
    pub reason: SkipReason,
    pub num_skipped: usize,
    pub num_remaining: usize,
}

/// Summarise a skip table against the initial batch size.
pub fn summarize(records: &[SkipRecord], initial_count: usize) -> Vec<SkipSummary> {
    let mut counts = std::collections::BTreeMap::new();
    for record in records {
        *counts.entry(record.reason).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .map(|(reason, num_skipped)| SkipSummary {
            reason,
            num_skipped,
            num_remaining: initial_count.saturating_sub(num_skipped),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reason_keeps_earliest_per_name() {
        let records = vec![
            SkipRecord::new("a", SkipReason::NoData, "x"),
            SkipRecord::new("b", SkipReason::DuplicateDepth, "y"),
            SkipRecord::new("a", SkipReason::InsufficientDepth, "z"),
        ];
        let first = first_reason(&records);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].reason, SkipReason::NoData);
        assert_eq!(first[1].name, "b");
    }

    #[test]
    fn summary_counts_per_reason() {
        let records = vec![
            SkipRecord::new("a", SkipReason::NoData, ""),
            SkipRecord::new("b", SkipReason::NoData, ""),
            SkipRecord::new("c", SkipReason::DuplicateDepth, ""),
        ];
        let summary = summarize(&records, 10);
        assert_eq!(summary.len(), 2);
        let no_data = summary
            .iter()
            .find(|s| s.reason == SkipReason::NoData)
            .unwrap();
        assert_eq!(no_data.num_skipped, 2);
        assert_eq!(no_data.num_remaining, 8);
    }
}
