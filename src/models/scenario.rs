use indexmap::IndexMap;
use serde::Serialize;

/// Result of analysing the transactions of a source document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioAnalysis {
    pub patterns: ScenarioPatterns,
    pub statistics: ScenarioStatistics,
    pub complexity_score: u32,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScenarioPatterns {
    pub rest_api: bool,
    pub soap_service: bool,
    pub stateful: bool,
    pub load_testing: bool,
    pub error_scenarios: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScenarioStatistics {
    pub transactions: usize,
    pub variants: usize,
    pub avg_variants_per_transaction: f64,
    /// Status code (as string) → number of variants
    pub status_codes: IndexMap<String, usize>,
    /// `high` / `medium` / `low` / `very_low` → number of variants
    pub weight_categories: IndexMap<String, usize>,
}
