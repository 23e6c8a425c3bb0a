// Terminal UI utilities

use std::time::Duration;

use colored::Colorize;

use crate::services::driver::{TargetReport, UpgradeOutcome};
use crate::services::service_upgrade::tally;

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// Whole seconds, e.g. `2m 5s`
fn elapsed(duration: Duration) -> String {
    humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}

fn describe(report: &TargetReport) -> String {
    format!(
        "{} '{}' ({}) after {}",
        report.kind,
        report.name,
        report.id,
        elapsed(report.elapsed)
    )
}

/// One line per target, then a count summary
pub fn print_reports(reports: &[TargetReport]) {
    if reports.is_empty() {
        print_warning("Nothing matched; no upgrades were issued");
        return;
    }

    for report in reports {
        match &report.result {
            Ok(UpgradeOutcome::Finalized) => {
                print_success(&format!("upgraded {}", describe(report)))
            }
            Ok(UpgradeOutcome::NotFinalized { state }) => print_warning(&format!(
                "{} settled as '{}', not finalized",
                describe(report),
                state
            )),
            Ok(UpgradeOutcome::AlreadyLatest { external_id }) => print_info(&format!(
                "{} '{}' already at {}",
                report.kind, report.name, external_id
            )),
            Err(e) => print_error(&format!("{}: {}", describe(report), e)),
        }
    }

    let (upgraded, skipped, failed) = tally(reports);
    println!();
    let summary = format!(
        "{} upgraded, {} unchanged, {} failed",
        upgraded, skipped, failed
    );
    if failed > 0 {
        println!("{}", summary.bright_red().bold());
    } else {
        println!("{}", summary.bright_green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_elapsed_drops_subsecond_noise() {
        assert_eq!(elapsed(Duration::from_millis(125_400)), "2m 5s");
    }

    #[test]
    fn test_describe_names_target() {
        let report = TargetReport::new(
            "service",
            "1s1",
            "web",
            Instant::now(),
            Ok(UpgradeOutcome::Finalized),
        );
        assert!(describe(&report).starts_with("service 'web' (1s1) after"));
    }
}
