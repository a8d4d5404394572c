use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::CoralogixClient;
use crate::error::{CoralogixError, Result};
use crate::model::{
    AdvancedQueryArgs, AggregationArgs, CustomQueryArgs, DataPrimeQueryArgs, ListSubsystemsArgs,
    LogContextArgs, PatternAnalysisArgs, QueryRequest, SearchLogsArgs, SecurityAnalysisArgs,
};
use crate::query;
use crate::time_range;

/// Lookback used by the catalog listings; callers cannot override it.
const LISTING_RANGE: &str = "24h";

/// The ten tools exposed to agent hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    SearchLogs,
    QueryLogsDataPrime,
    GetLogAggregations,
    ListApplications,
    ListSubsystems,
    GetLogContext,
    AdvancedDataPrimeQuery,
    LogPatternAnalysis,
    SecurityAnalysis,
    CustomDataPrimeQuery,
}

impl ToolName {
    pub const ALL: [ToolName; 10] = [
        ToolName::SearchLogs,
        ToolName::QueryLogsDataPrime,
        ToolName::GetLogAggregations,
        ToolName::ListApplications,
        ToolName::ListSubsystems,
        ToolName::GetLogContext,
        ToolName::AdvancedDataPrimeQuery,
        ToolName::LogPatternAnalysis,
        ToolName::SecurityAnalysis,
        ToolName::CustomDataPrimeQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchLogs => "search_logs",
            ToolName::QueryLogsDataPrime => "query_logs_dataprime",
            ToolName::GetLogAggregations => "get_log_aggregations",
            ToolName::ListApplications => "list_applications",
            ToolName::ListSubsystems => "list_subsystems",
            ToolName::GetLogContext => "get_log_context",
            ToolName::AdvancedDataPrimeQuery => "advanced_dataprime_query",
            ToolName::LogPatternAnalysis => "log_pattern_analysis",
            ToolName::SecurityAnalysis => "security_analysis",
            ToolName::CustomDataPrimeQuery => "custom_dataprime_query",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// Tool operations: argument defaults, query building, dispatch, result envelope.
pub struct LogService {
    client: CoralogixClient,
}

impl LogService {
    pub fn new(client: CoralogixClient) -> Self {
        Self { client }
    }

    /// Dispatches a tool call by name. `arguments` of `null` counts as `{}`.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = ToolName::parse(name).ok_or_else(|| CoralogixError::UnknownTool(name.to_string()))?;
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        info!(tool = tool.as_str(), "tool call");

        match tool {
            ToolName::SearchLogs => self.search_logs(parse_args(tool, arguments)?).await,
            ToolName::QueryLogsDataPrime => self.query_logs_dataprime(parse_args(tool, arguments)?).await,
            ToolName::GetLogAggregations => self.get_log_aggregations(parse_args(tool, arguments)?).await,
            ToolName::ListApplications => self.list_applications().await,
            ToolName::ListSubsystems => self.list_subsystems(parse_args(tool, arguments)?).await,
            ToolName::GetLogContext => self.get_log_context(parse_args(tool, arguments)?).await,
            ToolName::AdvancedDataPrimeQuery => {
                self.advanced_dataprime_query(parse_args(tool, arguments.clone())?, arguments)
                    .await
            }
            ToolName::LogPatternAnalysis => self.log_pattern_analysis(parse_args(tool, arguments)?).await,
            ToolName::SecurityAnalysis => self.security_analysis(parse_args(tool, arguments)?).await,
            ToolName::CustomDataPrimeQuery => {
                self.custom_dataprime_query(parse_args(tool, arguments.clone())?, arguments)
                    .await
            }
        }
    }

    pub async fn search_logs(&self, args: SearchLogsArgs) -> Result<Value> {
        let lucene = query::search_query(&args.query, &args.applications, &args.subsystems, &args.severities);
        let range = time_range::resolve(&args.time_range)?;
        let results = self
            .client
            .send(&QueryRequest::lucene(lucene.clone(), &range, args.limit))
            .await?;

        Ok(json!({
            "query": lucene,
            "timeRange": range,
            "totalResults": results.len(),
            "results": results,
        }))
    }

    pub async fn query_logs_dataprime(&self, args: DataPrimeQueryArgs) -> Result<Value> {
        let range = time_range::resolve(&args.time_range)?;
        let results = self
            .client
            .send(&QueryRequest::dataprime(args.query.clone(), Some(&range)))
            .await?;

        Ok(json!({
            "query": args.query,
            "timeRange": range,
            "totalResults": results.len(),
            "results": results,
        }))
    }

    pub async fn get_log_aggregations(&self, args: AggregationArgs) -> Result<Value> {
        let dataprime = query::aggregation_query(&args.group_by, args.aggregations.as_deref(), &args.filters)?;
        let range = time_range::resolve(&args.time_range)?;
        let results = self
            .client
            .send(&QueryRequest::dataprime(dataprime.clone(), Some(&range)))
            .await?;

        Ok(json!({
            "query": dataprime,
            "groupBy": args.group_by,
            "aggregations": args.aggregations,
            "timeRange": range,
            "results": results,
        }))
    }

    pub async fn list_applications(&self) -> Result<Value> {
        let range = time_range::resolve(LISTING_RANGE)?;
        let results = self
            .client
            .send(&QueryRequest::dataprime(query::LIST_APPLICATIONS_QUERY.to_string(), Some(&range)))
            .await?;

        Ok(json!({
            "query": "List applications",
            "timeRange": range,
            "results": results,
        }))
    }

    pub async fn list_subsystems(&self, args: ListSubsystemsArgs) -> Result<Value> {
        let applications = args.applications.clone().unwrap_or_default();
        let dataprime = query::list_subsystems_query(&applications);
        let range = time_range::resolve(LISTING_RANGE)?;
        let results = self
            .client
            .send(&QueryRequest::dataprime(dataprime, Some(&range)))
            .await?;

        Ok(json!({
            "query": "List subsystems",
            "applications": args.applications,
            "timeRange": range,
            "results": results,
        }))
    }

    /// Looks the entry up first, then pulls a ±5 minute neighborhood around
    /// its timestamp. Without a recoverable timestamp the window is unbounded.
    pub async fn get_log_context(&self, args: LogContextArgs) -> Result<Value> {
        let lookup = QueryRequest::dataprime(query::log_lookup_query(&args.log_id), None);
        let target = self.client.send(&lookup).await?;

        let Some(first) = target.first() else {
            return Err(CoralogixError::NotFound(args.log_id));
        };

        let timestamp = query::extract_timestamp(first);
        if timestamp.is_none() {
            warn!(log_id = %args.log_id, "Could not extract timestamp from log entry");
        }

        let context = QueryRequest::dataprime(
            query::log_context_query(timestamp.as_deref(), args.context_size),
            None,
        );
        let context_logs = self.client.send(&context).await?;

        Ok(json!({
            "logId": args.log_id,
            "contextSize": args.context_size,
            "targetLog": target,
            "contextLogs": context_logs,
        }))
    }

    /// `raw` is the caller's argument object, echoed back untouched.
    pub async fn advanced_dataprime_query(&self, args: AdvancedQueryArgs, raw: Value) -> Result<Value> {
        let dataprime = query::advanced_query(&args);
        let range = time_range::resolve(&args.time_range)?;
        let results = self
            .client
            .send(&QueryRequest::dataprime(dataprime.clone(), Some(&range)))
            .await?;

        Ok(json!({
            "queryType": raw["queryType"],
            "query": dataprime,
            "parameters": raw,
            "timeRange": range,
            "results": results,
        }))
    }

    pub async fn log_pattern_analysis(&self, args: PatternAnalysisArgs) -> Result<Value> {
        let range = time_range::resolve(&args.time_range)?;
        let dataprime = query::pattern_analysis_query(&args.application);
        let results = self
            .client
            .send(&QueryRequest::dataprime(dataprime.clone(), Some(&range)))
            .await?;

        Ok(json!({
            "analysis": "Log Pattern Analysis",
            "application": args.application,
            "query": dataprime,
            "timeRange": range,
            "results": results,
        }))
    }

    /// Runs the three security queries one after another; the first failure aborts.
    pub async fn security_analysis(&self, args: SecurityAnalysisArgs) -> Result<Value> {
        let range = time_range::resolve(&args.time_range)?;

        let mut results = Vec::with_capacity(3);
        for dataprime in query::security_queries(&args.severity) {
            let result = self
                .client
                .send(&QueryRequest::dataprime(dataprime.clone(), Some(&range)))
                .await?;
            results.push(json!({ "query": dataprime, "result": result }));
        }

        Ok(json!({
            "analysis": "Security Analysis",
            "timeRange": range,
            "severity": args.severity,
            "results": results,
        }))
    }

    pub async fn custom_dataprime_query(&self, args: CustomQueryArgs, raw: Value) -> Result<Value> {
        let dataprime = query::custom_query(args.template, &args.parameters)?;
        let window = args
            .parameters
            .time_range
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("1h");
        let range = time_range::resolve(window)?;
        let results = self
            .client
            .send(&QueryRequest::dataprime(dataprime.clone(), Some(&range)))
            .await?;

        Ok(json!({
            "template": raw["template"],
            "query": dataprime,
            "parameters": raw.get("parameters").cloned().unwrap_or_else(|| json!({})),
            "timeRange": range,
            "results": results,
        }))
    }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| {
        CoralogixError::InvalidRequest(format!("invalid arguments for {}: {e}", tool.as_str()))
    })
}
