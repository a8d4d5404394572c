//! Translates tool arguments into Lucene and DataPrime query text.
//! Pure functions, no I/O.

use serde_json::{Map, Value};

use crate::error::{CoralogixError, Result};
use crate::model::{
    AdvancedQueryArgs, AdvancedQueryType, AggregationKind, AggregationSpec, ParsePattern,
    QueryTemplate, TemplateParameters,
};

const SOURCE: &str = "source logs";

const APPLICATION_FIELD: &str = "coralogix.metadata.applicationName";
const SUBSYSTEM_FIELD: &str = "coralogix.metadata.subsystemName";
const SEVERITY_FIELD: &str = "coralogix.metadata.severity";

pub const LIST_APPLICATIONS_QUERY: &str = "source logs | groupby $l.applicationname aggregate count() as log_count | sort log_count desc | limit 100";

const SUBSYSTEM_TAIL: &str =
    " | groupby $l.subsystemname aggregate count() as log_count | sort log_count desc | limit 100";

/// Escapes a value destined for the inside of a `"..."` literal.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn or_group<F>(values: &[String], clause: F) -> String
where
    F: Fn(&str) -> String,
{
    let clauses: Vec<String> = values.iter().map(|v| clause(&quote_literal(v))).collect();
    format!("({})", clauses.join(" OR "))
}

// ---------------------------------------------------------------------------
// Lucene
// ---------------------------------------------------------------------------

pub fn search_query(
    query: &str,
    applications: &[String],
    subsystems: &[String],
    severities: &[String],
) -> String {
    let groups: Vec<String> = [
        (APPLICATION_FIELD, applications),
        (SUBSYSTEM_FIELD, subsystems),
        (SEVERITY_FIELD, severities),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .map(|(field, values)| or_group(values, |v| format!("{field}:\"{v}\"")))
    .collect();

    if groups.is_empty() {
        query.to_string()
    } else {
        format!("{query} AND {}", groups.join(" AND "))
    }
}

// ---------------------------------------------------------------------------
// DataPrime
// ---------------------------------------------------------------------------

fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote_literal(s),
        other => quote_literal(&other.to_string()),
    }
}

fn aggregation_expr(spec: &AggregationSpec) -> Result<String> {
    let kind = spec.kind.unwrap_or(AggregationKind::Count);
    if kind == AggregationKind::Count {
        return Ok("count() as count".to_string());
    }
    let field = non_empty(&spec.field).ok_or_else(|| {
        CoralogixError::InvalidRequest(format!(
            "aggregation '{}' requires a field",
            kind.as_str()
        ))
    })?;
    let name = kind.as_str();
    Ok(format!("{name}($d.{field}) as {name}_{field}"))
}

pub fn aggregation_query(
    group_by: &[String],
    aggregations: Option<&[AggregationSpec]>,
    filters: &Map<String, Value>,
) -> Result<String> {
    if group_by.is_empty() {
        return Err(CoralogixError::InvalidRequest(
            "groupBy must name at least one field".to_string(),
        ));
    }

    let mut query = SOURCE.to_string();
    for (key, value) in filters {
        query.push_str(&format!(" | filter $d.{key} == \"{}\"", filter_literal(value)));
    }

    let fields: Vec<String> = group_by.iter().map(|f| format!("$d.{f}")).collect();
    query.push_str(&format!(" | groupby {}", fields.join(", ")));

    let exprs = match aggregations {
        Some(specs) if !specs.is_empty() => specs
            .iter()
            .map(aggregation_expr)
            .collect::<Result<Vec<_>>>()?,
        _ => vec!["count() as count".to_string()],
    };
    query.push_str(&format!(" aggregate {}", exprs.join(", ")));
    Ok(query)
}

pub fn list_subsystems_query(applications: &[String]) -> String {
    let mut query = SOURCE.to_string();
    if !applications.is_empty() {
        let group = or_group(applications, |v| format!("$l.applicationname == \"{v}\""));
        query.push_str(&format!(" | filter {group}"));
    }
    query.push_str(SUBSYSTEM_TAIL);
    query
}

pub fn log_lookup_query(log_id: &str) -> String {
    format!(
        "source logs | filter $m.logid == \"{}\" | limit 1",
        quote_literal(log_id)
    )
}

/// Without a timestamp the window is left open and only the row cap applies.
pub fn log_context_query(timestamp: Option<&str>, context_size: u32) -> String {
    let mut query = SOURCE.to_string();
    if let Some(ts) = timestamp {
        let ts = quote_literal(ts);
        query.push_str(&format!(
            " | filter $m.timestamp >= \"{ts}\" - 5m AND $m.timestamp <= \"{ts}\" + 5m"
        ));
    }
    let limit = u64::from(context_size) * 2;
    query.push_str(&format!(" | sort $m.timestamp | limit {limit}"));
    query
}

/// Looks for a `timestamp` key in the first matched entry: metadata first, then labels.
pub fn extract_timestamp(row: &Value) -> Option<String> {
    let entry = row.pointer("/result/results/0")?;
    ["metadata", "labels"].iter().find_map(|section| {
        entry
            .get(section)?
            .as_array()?
            .iter()
            .find(|kv| kv.get("key").and_then(Value::as_str) == Some("timestamp"))
            .and_then(|kv| match kv.get("value")? {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    })
}

fn advanced_filters(args: &AdvancedQueryArgs) -> Vec<String> {
    let mut filters = Vec::new();
    if let Some(app) = non_empty(&args.application) {
        filters.push(format!("$l.applicationname == \"{}\"", quote_literal(app)));
    }
    if let Some(sub) = non_empty(&args.subsystem) {
        filters.push(format!("$l.subsystemname == \"{}\"", quote_literal(sub)));
    }
    if let Some(sev) = non_empty(&args.severity) {
        filters.push(format!("$m.severity == \"{}\"", quote_literal(&sev.to_uppercase())));
    }
    if let Some(user) = non_empty(&args.user_id) {
        filters.push(format!("$d.user_id == \"{}\"", quote_literal(user)));
    }
    filters
}

fn error_analysis() -> &'static str {
    " | filter $m.severity == \"ERROR\" | groupby $d.error_type, $l.applicationname aggregate count() as error_count | sort error_count desc"
}

fn performance_analysis() -> &'static str {
    " | filter $d.response_time != null | groupby $l.applicationname aggregate avg($d.response_time) as avg_response_time, max($d.response_time) as max_response_time, min($d.response_time) as min_response_time"
}

fn user_journey(has_user: bool) -> &'static str {
    if has_user {
        " | sort $m.timestamp | limit 1000"
    } else {
        " | filter $d.user_id != null | groupby $d.user_id aggregate count() as event_count | sort event_count desc | limit 50"
    }
}

fn aggregated_metrics(interval: &str) -> String {
    format!(
        " | groupby bin($m.timestamp, \"{}\") aggregate count() as log_count | sort timestamp",
        quote_literal(interval)
    )
}

fn log_parsing(pattern: ParsePattern) -> &'static str {
    match pattern {
        ParsePattern::ApiLogs => r" | extract $d.log into $d.parsed using regexp(e=/(?<method>\w+)\s+(?<path>\/[^\s]*)\s+(?<status>\d+)\s+(?<response_time>\d+)ms/) | filter $d.parsed.method != null",
        ParsePattern::UserActivity => r" | extract $d.log into $d.parsed using regexp(e=/user_id=(?<user_id>\w+)\s+action=(?<action>\w+)/) | filter $d.parsed.user_id != null",
        ParsePattern::DatabaseLogs => r" | extract $d.log into $d.parsed using regexp(e=/query_time=(?<query_time>\d+\.\d+)\s+query=(?<query>[^\n]+)/) | filter $d.parsed.query_time != null",
        ParsePattern::KeyValue => r" | extract $d.log into $d.parsed using regexp(e=/(?<key>\w+)=(?<value>[^\s]+)/) | filter $d.parsed.key != null",
    }
}

fn enriched_analysis() -> &'static str {
    " | enrich $d.ip_address from ip_enrichment on ip | filter $d.country != null | groupby $d.country aggregate count() as requests_by_country | sort requests_by_country desc"
}

pub fn advanced_query(args: &AdvancedQueryArgs) -> String {
    let mut query = SOURCE.to_string();
    let filters = advanced_filters(args);
    if !filters.is_empty() {
        query.push_str(&format!(" | filter {}", filters.join(" AND ")));
    }

    match args.query_type {
        AdvancedQueryType::ErrorAnalysis => query.push_str(error_analysis()),
        AdvancedQueryType::PerformanceAnalysis => query.push_str(performance_analysis()),
        AdvancedQueryType::UserJourney => {
            query.push_str(user_journey(non_empty(&args.user_id).is_some()))
        }
        AdvancedQueryType::AggregatedMetrics => query.push_str(&aggregated_metrics(&args.interval)),
        AdvancedQueryType::LogParsing => query.push_str(log_parsing(args.parse_pattern)),
        AdvancedQueryType::EnrichedAnalysis => query.push_str(enriched_analysis()),
        AdvancedQueryType::Basic => query.push_str(" | limit 100"),
    }
    query
}

pub fn pattern_analysis_query(application: &str) -> String {
    format!(
        r#"source logs | filter $l.applicationname == "{}" | extract $d.log into $d.pattern using regexp(e=/^(?<prefix>\w+:\s*)?(?<level>\w+)?\s*(?<message>.{{0,50}})/) | groupby $d.pattern.level, $d.pattern.prefix aggregate count() as pattern_count | sort pattern_count desc | limit 50"#,
        quote_literal(application)
    )
}

/// Failed logins, errors above a severity floor, suspicious keywords; in that order.
pub fn security_queries(severity: &str) -> [String; 3] {
    [
        r#"source logs | filter $d.log contains "failed" AND $d.log contains "login" | groupby $d.ip_address aggregate count() as failed_attempts | sort failed_attempts desc | limit 20"#.to_string(),
        format!(
            "source logs | filter $m.severity >= \"{}\" | groupby $m.severity, $l.applicationname aggregate count() as error_count | sort error_count desc",
            quote_literal(severity)
        ),
        r#"source logs | filter $d.log contains "suspicious" OR $d.log contains "unauthorized" OR $d.log contains "blocked" | groupby $d.action, $d.ip_address aggregate count() as incident_count | sort incident_count desc | limit 30"#.to_string(),
    ]
}

fn template_query(template: QueryTemplate, params: &TemplateParameters) -> Result<String> {
    let query = match template {
        QueryTemplate::TimeSeriesAnalysis => {
            let interval = non_empty(&params.interval).unwrap_or("1h");
            format!(
                "source logs | groupby bin($m.timestamp, \"{}\") aggregate count() as log_count, count_distinct($l.applicationname) as unique_apps | sort timestamp",
                quote_literal(interval)
            )
        }
        QueryTemplate::TopErrorsByUser => "source logs | filter $m.severity == \"ERROR\" | filter $d.user_id != null | groupby $d.user_id aggregate count() as error_count | sort error_count desc | limit 20".to_string(),
        QueryTemplate::ApiPerformanceMonitoring => "source logs | filter $d.response_time != null | groupby $d.endpoint aggregate avg($d.response_time) as avg_response_time, count() as request_count, percentile($d.response_time, 95) as p95_response_time | sort avg_response_time desc".to_string(),
        QueryTemplate::Custom => non_empty(&params.custom_query)
            .ok_or_else(|| {
                CoralogixError::InvalidRequest(
                    "Custom query is required when using custom template".to_string(),
                )
            })?
            .to_string(),
        QueryTemplate::Basic => "source logs | limit 100".to_string(),
    };
    Ok(query)
}

pub fn custom_query(template: QueryTemplate, params: &TemplateParameters) -> Result<String> {
    let mut query = template_query(template, params)?;

    if let Some(app) = non_empty(&params.application) {
        let filtered = format!(
            "source logs | filter $l.applicationname == \"{}\"",
            quote_literal(app)
        );
        query = query.replacen(SOURCE, &filtered, 1);
    }
    if let Some(limit) = params.limit.filter(|l| *l > 0) {
        query.push_str(&format!(" | limit {limit}"));
    }
    if let Some(order_by) = non_empty(&params.order_by) {
        query.push_str(&format!(" | sort {order_by} desc"));
    }
    Ok(query)
}
