use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serperf_session::{Role, StatsSnapshot};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum ReportFormat {
    Json,
    Table,
    Pretty,
}

impl ReportFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// How the run ended, as shown in the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    fn as_str(self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Interrupted => "interrupted",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Serialize)]
pub struct RunReport<'a> {
    pub device: &'a str,
    pub role: &'a str,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

impl<'a> RunReport<'a> {
    pub fn new(device: &'a str, role: Role, stats: StatsSnapshot) -> Self {
        Self {
            device,
            role: role.as_str(),
            status: RunStatus::Completed,
            error: None,
            stats,
        }
    }
}

pub fn print_report(report: &RunReport<'_>, format: ReportFormat) {
    println!("{}", render_report(report, format));
}

pub fn render_report(report: &RunReport<'_>, format: ReportFormat) -> String {
    let stats = &report.stats;
    match format {
        ReportFormat::Json => {
            serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
        }
        ReportFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "ROLE", "STATUS", "READ", "WRITTEN", "ELAPSED"])
                .add_row(vec![
                    report.device.to_string(),
                    report.role.to_string(),
                    report.status.as_str().to_string(),
                    stats.messages_read.to_string(),
                    stats.messages_written.to_string(),
                    elapsed_text(stats),
                ]);
            table.to_string()
        }
        ReportFormat::Pretty => format!(
            "\nTotal msgs READ: \t{} msgs\nTotal msgs WRITTEN: \t{} msgs\nTime elapsed: {}\n",
            stats.messages_read,
            stats.messages_written,
            elapsed_text(stats)
        ),
    }
}

/// Seconds and microseconds, `S.UUUUUU`.
fn elapsed_text(stats: &StatsSnapshot) -> String {
    format!(
        "{}.{:06}",
        stats.elapsed.as_secs(),
        stats.elapsed.subsec_micros()
    )
}
