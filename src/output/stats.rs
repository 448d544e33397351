//! Crawl report display
//!
//! This module formats crawl and collect reports for the terminal.

use crate::crawler::CrawlReport;
use crate::output::CollectReport;

/// Renders a crawl report in a human-readable layout
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    out.push_str("=== Crawl Report ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Final phase: {}\n", report.phase));
    out.push_str(&format!("  Completed requests: {}\n", report.completed));
    out.push_str(&format!("  Served from cache: {}\n", report.cache_hits));
    out.push_str(&format!("  Records written: {}\n", report.records));
    out.push('\n');

    out.push_str("Sessions:\n");
    out.push_str(&format!("  Expired-session retries: {}\n", report.retried));
    out.push_str(&format!("  Re-authentications: {}\n", report.reauthenticated));
    out.push('\n');

    out.push_str("Failures:\n");
    out.push_str(&format!("  Abandoned: {}\n", report.abandoned));
    out.push_str(&format!("  Cancelled: {}\n", report.cancelled));
    out.push_str(&format!("  Left in frontier: {}\n", report.pending));
    for url in &report.failed_urls {
        out.push_str(&format!("  - {}\n", url));
    }

    if !report.skipped_collections.is_empty() {
        out.push('\n');
        out.push_str(&format!(
            "Skipped Collections ({}):\n",
            report.skipped_collections.len()
        ));
        for name in &report.skipped_collections {
            out.push_str(&format!("  - {}\n", name));
        }
    }

    let attempted = report.completed + report.abandoned + report.cancelled;
    let success_rate = if attempted > 0 {
        (report.completed as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    out.push('\n');
    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} requests completed)\n",
        success_rate, report.completed, attempted
    ));

    out
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Prints a collect report to stdout
pub fn print_collect_report(report: &CollectReport) {
    println!("=== Collect Report ===\n");
    println!("  Cached documents: {}", report.documents);
    println!("  Service roots skipped: {}", report.service_roots);
    println!("  Pages collected: {}", report.pages);
    println!("  Records written: {}", report.records);
    println!("  Documents skipped: {}", report.skipped);
}
