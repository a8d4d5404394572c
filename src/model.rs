use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuerySyntax {
    #[serde(rename = "QUERY_SYNTAX_DATAPRIME")]
    DataPrime,
    #[serde(rename = "QUERY_SYNTAX_LUCENE")]
    Lucene,
}

/// Storage tier. No operation selects `Archive` today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryTier {
    #[serde(rename = "TIER_FREQUENT_SEARCH")]
    FrequentSearch,
    #[serde(rename = "TIER_ARCHIVE")]
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub syntax: QuerySyntax,
    pub tier: QueryTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Body of one `POST /api/v1/dataprime/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub metadata: QueryMetadata,
}

impl QueryRequest {
    pub fn lucene(query: String, range: &DateRange, limit: u32) -> Self {
        Self {
            query,
            metadata: QueryMetadata {
                syntax: QuerySyntax::Lucene,
                tier: QueryTier::FrequentSearch,
                default_source: None,
                start_date: Some(range.start_date.clone()),
                end_date: Some(range.end_date.clone()),
                limit: Some(limit),
            },
        }
    }

    /// DataPrime over the `logs` source; `range` of `None` leaves the window to the backend.
    pub fn dataprime(query: String, range: Option<&DateRange>) -> Self {
        Self {
            query,
            metadata: QueryMetadata {
                syntax: QuerySyntax::DataPrime,
                tier: QueryTier::FrequentSearch,
                default_source: Some("logs".to_string()),
                start_date: range.map(|r| r.start_date.clone()),
                end_date: range.map(|r| r.end_date.clone()),
                limit: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tool arguments
// ---------------------------------------------------------------------------

fn default_hour() -> String {
    "1h".to_string()
}

fn default_day() -> String {
    "24h".to_string()
}

fn default_search_limit() -> u32 {
    100
}

fn default_context_size() -> u32 {
    10
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_severity_floor() -> String {
    "WARNING".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogsArgs {
    pub query: String,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub subsystems: Vec<String>,
    #[serde(default)]
    pub severities: Vec<String>,
    #[serde(default = "default_hour")]
    pub time_range: String,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPrimeQueryArgs {
    pub query: String,
    #[serde(default = "default_hour")]
    pub time_range: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Sum => "sum",
            AggregationKind::Avg => "avg",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
        }
    }
}

/// Unrecognized aggregation names fall back to `count`.
impl From<String> for AggregationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sum" => AggregationKind::Sum,
            "avg" => AggregationKind::Avg,
            "min" => AggregationKind::Min,
            "max" => AggregationKind::Max,
            _ => AggregationKind::Count,
        }
    }
}

impl From<AggregationKind> for String {
    fn from(k: AggregationKind) -> Self {
        k.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    #[serde(rename = "type", default)]
    pub kind: Option<AggregationKind>,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationArgs {
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<AggregationSpec>>,
    #[serde(default)]
    pub filters: Map<String, Value>,
    #[serde(default = "default_hour")]
    pub time_range: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubsystemsArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContextArgs {
    pub log_id: String,
    #[serde(default = "default_context_size")]
    pub context_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdvancedQueryType {
    ErrorAnalysis,
    PerformanceAnalysis,
    UserJourney,
    AggregatedMetrics,
    LogParsing,
    EnrichedAnalysis,
    Basic,
}

impl AdvancedQueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvancedQueryType::ErrorAnalysis => "error_analysis",
            AdvancedQueryType::PerformanceAnalysis => "performance_analysis",
            AdvancedQueryType::UserJourney => "user_journey",
            AdvancedQueryType::AggregatedMetrics => "aggregated_metrics",
            AdvancedQueryType::LogParsing => "log_parsing",
            AdvancedQueryType::EnrichedAnalysis => "enriched_analysis",
            AdvancedQueryType::Basic => "basic",
        }
    }
}

impl From<String> for AdvancedQueryType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "error_analysis" => AdvancedQueryType::ErrorAnalysis,
            "performance_analysis" => AdvancedQueryType::PerformanceAnalysis,
            "user_journey" => AdvancedQueryType::UserJourney,
            "aggregated_metrics" => AdvancedQueryType::AggregatedMetrics,
            "log_parsing" => AdvancedQueryType::LogParsing,
            "enriched_analysis" => AdvancedQueryType::EnrichedAnalysis,
            _ => AdvancedQueryType::Basic,
        }
    }
}

impl From<AdvancedQueryType> for String {
    fn from(t: AdvancedQueryType) -> Self {
        t.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePattern {
    ApiLogs,
    UserActivity,
    DatabaseLogs,
    KeyValue,
}

impl Default for ParsePattern {
    fn default() -> Self {
        ParsePattern::ApiLogs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedQueryArgs {
    pub query_type: AdvancedQueryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default = "default_hour")]
    pub time_range: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default)]
    pub parse_pattern: ParsePattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysisArgs {
    pub application: String,
    #[serde(default = "default_day")]
    pub time_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAnalysisArgs {
    #[serde(default = "default_day")]
    pub time_range: String,
    #[serde(default = "default_severity_floor")]
    pub severity: String,
}

impl Default for SecurityAnalysisArgs {
    fn default() -> Self {
        Self {
            time_range: default_day(),
            severity: default_severity_floor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryTemplate {
    TimeSeriesAnalysis,
    TopErrorsByUser,
    ApiPerformanceMonitoring,
    Custom,
    Basic,
}

impl QueryTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryTemplate::TimeSeriesAnalysis => "time_series_analysis",
            QueryTemplate::TopErrorsByUser => "top_errors_by_user",
            QueryTemplate::ApiPerformanceMonitoring => "api_performance_monitoring",
            QueryTemplate::Custom => "custom",
            QueryTemplate::Basic => "basic",
        }
    }
}

impl From<String> for QueryTemplate {
    fn from(s: String) -> Self {
        match s.as_str() {
            "time_series_analysis" => QueryTemplate::TimeSeriesAnalysis,
            "top_errors_by_user" => QueryTemplate::TopErrorsByUser,
            "api_performance_monitoring" => QueryTemplate::ApiPerformanceMonitoring,
            "custom" => QueryTemplate::Custom,
            _ => QueryTemplate::Basic,
        }
    }
}

impl From<QueryTemplate> for String {
    fn from(t: QueryTemplate) -> Self {
        t.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQueryArgs {
    pub template: QueryTemplate,
    #[serde(default)]
    pub parameters: TemplateParameters,
}
