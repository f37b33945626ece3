//! Ad-hoc cube queries.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use classpulse_analytics::{Cube, QueryCompiler, QueryRequest};
use tracing::debug;

use super::{open_store, print_json};
use crate::config::ClasspulseConfig;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Measure to compute; repeat for several
    #[arg(short, long = "measure")]
    pub measures: Vec<String>,

    /// Dimension to group by; repeat for several
    #[arg(short, long = "dimension")]
    pub dimensions: Vec<String>,

    /// Filter as DIMENSION=VALUE; repeat for several
    #[arg(short, long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Start of the answer time range (RFC 3339)
    #[arg(long, requires = "to")]
    pub from: Option<DateTime<Utc>>,

    /// End of the answer time range (RFC 3339)
    #[arg(long, requires = "from")]
    pub to: Option<DateTime<Utc>>,

    /// Maximum number of rows
    #[arg(short, long)]
    pub limit: Option<i64>,

    /// Sort as FIELD or FIELD:asc|desc; repeat for several
    #[arg(short, long = "order", value_parser = parse_order)]
    pub order: Vec<(String, String)>,

    /// Print the compiled SQL and parameters instead of running it
    #[arg(long)]
    pub explain: bool,

    /// List the available measures and dimensions
    #[arg(long)]
    pub describe: bool,
}

pub async fn run(args: QueryArgs, config: ClasspulseConfig) -> Result<()> {
    if args.describe {
        return print_json(&Cube::standard().describe());
    }

    let explain = args.explain;
    let request = build_request(args);

    let store = Arc::new(open_store(&config.storage).await?);
    let compiler = QueryCompiler::new(store);

    if explain {
        return print_json(&compiler.compile(&request)?);
    }

    let rows = compiler.execute(&request).await?;
    debug!(rows = rows.len(), "Query finished");
    print_json(&rows)
}

fn build_request(args: QueryArgs) -> QueryRequest {
    let mut request = QueryRequest::default();
    for measure in args.measures {
        request = request.with_measure(measure);
    }
    for dimension in args.dimensions {
        request = request.with_dimension(dimension);
    }
    for (dimension, value) in args.filters {
        request = request.with_filter(dimension, value);
    }
    for (field, direction) in args.order {
        request = request.with_order(field, direction);
    }
    if let (Some(from), Some(to)) = (args.from, args.to) {
        request = request.with_time_range(from, to);
    }
    if let Some(limit) = args.limit {
        request = request.with_limit(limit);
    }
    request
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((dimension, value)) if !dimension.is_empty() => {
            Ok((dimension.to_string(), value.to_string()))
        }
        _ => Err(format!("expected DIMENSION=VALUE, got `{raw}`")),
    }
}

fn parse_order(raw: &str) -> Result<(String, String), String> {
    let (field, direction) = raw.split_once(':').unwrap_or((raw, "asc"));
    if field.is_empty() {
        return Err(format!("expected FIELD or FIELD:asc|desc, got `{raw}`"));
    }
    Ok((field.to_string(), direction.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: QueryArgs,
    }

    #[test]
    fn test_parse_query_flags() {
        let cli = TestCli::parse_from([
            "test",
            "-m",
            "total_answers",
            "-m",
            "accuracy_rate",
            "-d",
            "classroom_name",
            "-f",
            "performance_level=Correct",
            "-o",
            "total_answers:desc",
            "--from",
            "2025-03-01T00:00:00Z",
            "--to",
            "2025-03-02T00:00:00Z",
        ]);

        assert_eq!(cli.args.measures, vec!["total_answers", "accuracy_rate"]);
        assert_eq!(
            cli.args.filters,
            vec![("performance_level".to_string(), "Correct".to_string())]
        );
        assert_eq!(
            cli.args.order,
            vec![("total_answers".to_string(), "desc".to_string())]
        );
        assert!(cli.args.from.is_some());
    }

    #[test]
    fn test_time_range_needs_both_ends() {
        let result = TestCli::try_parse_from(["test", "--from", "2025-03-01T00:00:00Z"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_filter_and_order() {
        assert!(parse_filter("no-equals").is_err());
        assert!(parse_filter("=value").is_err());
        assert_eq!(
            parse_filter("event_date=2025-03-01").unwrap(),
            ("event_date".to_string(), "2025-03-01".to_string())
        );
        assert_eq!(
            parse_order("accuracy_rate").unwrap(),
            ("accuracy_rate".to_string(), "asc".to_string())
        );
    }

    #[test]
    fn test_build_request_compiles() {
        let cli = TestCli::parse_from([
            "test",
            "-m",
            "total_answers",
            "-d",
            "student_name",
            "-o",
            "total_answers:desc",
            "-l",
            "10",
        ]);
        let request = build_request(cli.args);

        let compiled = classpulse_analytics::compile(Cube::standard(), &request).unwrap();
        assert!(compiled.sql.contains("GROUP BY"));
        assert!(compiled.sql.contains("ORDER BY total_answers DESC"));
        assert!(compiled.sql.ends_with("LIMIT ?"));
        assert_eq!(compiled.columns, vec!["total_answers", "student_name"]);
    }
}
