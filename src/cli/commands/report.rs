//! Report command implementation
//!
//! Aggregates the audit ledger over a date range. Both dates are UTC days
//! and the end day is included in full.

use super::{load_config_or_exit, write_json};
use crate::compliance::ComplianceService;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, ValueEnum};

/// Output format for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Text,
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// First day of the reporting period (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of the reporting period, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

impl ReportArgs {
    /// Reporting period as UTC instants
    pub fn period(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .end
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
            .and_utc();
        (start, end)
    }

    /// Execute the report command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_exit(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if self.start > self.end {
            println!(
                "❌ Report start {} is after end {}",
                self.start, self.end
            );
            return Ok(2);
        }

        let service = match ComplianceService::from_config(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to the audit store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let (start, end) = self.period();
        tracing::info!(start = %start, end = %end, "Generating compliance report");

        let report = match service.generate_compliance_report(start, end).await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to read the audit ledger");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        match self.format {
            ReportFormat::Json => write_json(&report, self.output.as_deref())?,
            ReportFormat::Text => match self.output {
                Some(ref path) => std::fs::write(path, report.format_summary())?,
                None => println!("{}", report.format_summary()),
            },
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn args(start: &str, end: &str) -> ReportArgs {
        ReportArgs {
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
            format: ReportFormat::Json,
            output: None,
        }
    }

    #[test]
    fn test_period_includes_whole_end_day() {
        let (start, end) = args("2024-01-01", "2024-01-31").period();
        assert_eq!(start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-01-31T23:59:59+00:00");
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let config = NamedTempFile::new().unwrap();
        std::fs::write(config.path(), "database_target = \"memory\"\n").unwrap();

        let code = args("2024-02-01", "2024-01-01")
            .execute(config.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_empty_ledger_report() {
        let config = NamedTempFile::new().unwrap();
        std::fs::write(config.path(), "database_target = \"memory\"\n").unwrap();
        let output = NamedTempFile::new().unwrap();

        let mut report_args = args("2024-01-01", "2024-01-31");
        report_args.output = Some(output.path().to_str().unwrap().to_string());
        let code = report_args
            .execute(config.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output.path()).unwrap()).unwrap();
        assert_eq!(report["totalRequests"], 0);
        assert_eq!(report["complianceRatePercent"], 100.0);
    }
}
