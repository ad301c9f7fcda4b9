//! HTML rendering

use std::fmt::Write as _;

use chatload_core::{BatchStats, ErrorPattern, GroupStats, RunSummary};
use chrono::{DateTime, Utc};

use crate::severity::Severity;

/// Escape text for use in HTML element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Context printed in the report header
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Run name, usually the run directory name
    pub run_name: String,
    /// Endpoint under test
    pub endpoint: Option<String>,
    /// When the report was rendered
    pub generated_at: DateTime<Utc>,
}

impl ReportMeta {
    /// Metadata for `run_name`, stamped now
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            endpoint: None,
            generated_at: Utc::now(),
        }
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Renders a [`RunSummary`] as a standalone HTML page
///
/// Rendering is a pure function of its inputs; all user-controlled text
/// (scenario names, models, error messages, request/response bodies) is
/// escaped.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    max_error_patterns: usize,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self {
            max_error_patterns: 50,
        }
    }
}

impl ReportRenderer {
    /// Create a renderer with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the full document
    pub fn render(&self, summary: &RunSummary, meta: &ReportMeta) -> String {
        let severity = Severity::from_success_rate(summary.overall.success_rate);

        tracing::debug!(
            run = %meta.run_name,
            severity = %severity,
            patterns = summary.error_patterns.len(),
            "Rendering report"
        );

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>chatload report - {title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; color: #222; }}
        .banner {{ padding: 20px; border-radius: 5px; margin-bottom: 20px; }}
        .banner.healthy {{ background-color: #d4edda; border-left: 6px solid #28a745; }}
        .banner.warning {{ background-color: #fff3cd; border-left: 6px solid #ffc107; }}
        .banner.critical {{ background-color: #f8d7da; border-left: 6px solid #dc3545; }}
        .stats {{ display: flex; gap: 20px; margin: 20px 0; }}
        .stat-card {{ background: #fff; border: 1px solid #ddd; padding: 15px; border-radius: 5px; flex: 1; }}
        table {{ border-collapse: collapse; width: 100%; margin-bottom: 30px; }}
        th, td {{ border: 1px solid #ddd; padding: 6px 10px; text-align: right; }}
        th:first-child, td:first-child {{ text-align: left; }}
        th {{ background-color: #f4f4f4; }}
        .pattern {{ border: 1px solid #ddd; border-radius: 5px; padding: 10px 15px; margin-bottom: 15px; }}
        pre {{ background: #f8f9fa; padding: 10px; overflow-x: auto; }}
    </style>
</head>
<body>
{banner}
{totals}
    <h2>Scenarios</h2>
{scenarios}
    <h2>Batches</h2>
{batches}
    <h2>Error Patterns</h2>
{patterns}
</body>
</html>
"#,
            title = escape(&meta.run_name),
            banner = render_banner(summary, meta, severity),
            totals = render_totals(&summary.overall),
            scenarios = render_scenarios(summary),
            batches = render_batches(summary),
            patterns = self.render_patterns(&summary.error_patterns),
        )
    }

    fn render_patterns(&self, patterns: &[ErrorPattern]) -> String {
        if patterns.is_empty() {
            return "    <p>No failed exchanges.</p>".to_string();
        }

        let mut html = String::new();
        for pattern in patterns.iter().take(self.max_error_patterns) {
            let sample = &pattern.representative;
            let request = serde_json::to_string_pretty(&sample.request).unwrap_or_default();
            let response = sample
                .response
                .as_ref()
                .and_then(|r| serde_json::to_string_pretty(r).ok())
                .unwrap_or_else(|| "(no response)".to_string());

            let _ = write!(
                html,
                r#"    <div class="pattern">
        <h3>{message}</h3>
        <p>Model: <code>{model}</code> &middot; {count} {noun} &middot; first seen in {conversation} #{sequence} at {started}</p>
        <h4>Request</h4>
        <pre>{request}</pre>
        <h4>Response</h4>
        <pre>{response}</pre>
    </div>
"#,
                message = escape(&pattern.message),
                model = escape(&pattern.model),
                count = pattern.count,
                noun = if pattern.count == 1 { "occurrence" } else { "occurrences" },
                conversation = escape(&sample.conversation_id),
                sequence = sample.sequence,
                started = sample.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                request = escape(&request),
                response = escape(&response),
            );
        }

        let hidden = patterns.len().saturating_sub(self.max_error_patterns);
        if hidden > 0 {
            let _ = writeln!(html, "    <p>{} more patterns not shown.</p>", hidden);
        }
        html
    }
}

fn render_banner(summary: &RunSummary, meta: &ReportMeta, severity: Severity) -> String {
    let endpoint = meta
        .endpoint
        .as_deref()
        .map(|e| format!("\n        <p>Endpoint: <code>{}</code></p>", escape(e)))
        .unwrap_or_default();

    format!(
        r#"    <div class="banner {class}">
        <h1>{label}: {name}</h1>{endpoint}
        <p>{succeeded} of {total} exchanges succeeded ({rate})</p>
        <p>Generated at: {generated}</p>
    </div>"#,
        class = severity.css_class(),
        label = severity.label(),
        name = escape(&meta.run_name),
        endpoint = endpoint,
        succeeded = summary.overall.succeeded,
        total = summary.overall.total,
        rate = percent(summary.overall.success_rate),
        generated = meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn render_totals(overall: &GroupStats) -> String {
    format!(
        r#"    <div class="stats">
        <div class="stat-card"><h3>Exchanges</h3><p>{total}</p></div>
        <div class="stat-card"><h3>Succeeded</h3><p>{succeeded}</p></div>
        <div class="stat-card"><h3>Failed</h3><p>{failed}</p></div>
        <div class="stat-card"><h3>Duration</h3><p>{duration:.2}s</p></div>
        <div class="stat-card"><h3>Throughput</h3><p>{throughput:.2}/s</p></div>
        <div class="stat-card"><h3>Latency p50 / p95</h3><p>{p50:.3}s / {p95:.3}s</p></div>
    </div>"#,
        total = overall.total,
        succeeded = overall.succeeded,
        failed = overall.failed,
        duration = overall.duration_secs,
        throughput = overall.throughput,
        p50 = overall.latency.p50,
        p95 = overall.latency.p95,
    )
}

const GROUP_HEADER: &str = "<th>Exchanges</th><th>Succeeded</th><th>Failed</th><th>Success rate</th><th>Duration (s)</th><th>Throughput (/s)</th><th>p50 (s)</th><th>p95 (s)</th>";

fn group_cells(stats: &GroupStats) -> String {
    format!(
        "<td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.3}</td><td>{:.3}</td>",
        stats.total,
        stats.succeeded,
        stats.failed,
        percent(stats.success_rate),
        stats.duration_secs,
        stats.throughput,
        stats.latency.p50,
        stats.latency.p95,
    )
}

fn render_scenarios(summary: &RunSummary) -> String {
    let mut html = format!(
        "    <table>\n        <tr><th>Scenario</th>{}</tr>\n",
        GROUP_HEADER
    );
    for (name, stats) in &summary.scenarios {
        let _ = writeln!(
            html,
            "        <tr><td>{}</td>{}</tr>",
            escape(name),
            group_cells(stats)
        );
    }
    html.push_str("    </table>");
    html
}

fn render_batches(summary: &RunSummary) -> String {
    let mut html = format!(
        "    <table>\n        <tr><th>Batch</th><th>Scenario</th><th>Conversations</th>{}</tr>\n",
        GROUP_HEADER
    );
    for (index, batch) in &summary.batches {
        html.push_str(&batch_row(*index, batch));
    }
    html.push_str("    </table>");
    html
}

fn batch_row(index: usize, batch: &BatchStats) -> String {
    format!(
        "        <tr><td>{}</td><td>{}</td><td>{}</td>{}</tr>\n",
        index,
        escape(&batch.scenario),
        batch.conversations,
        group_cells(&batch.stats)
    )
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}
