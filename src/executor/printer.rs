use colored::{Color, Colorize};

use super::models::{Phase, RunReport, ScenarioResult, SuiteReport, Summary};

pub fn print_run_report(report: &RunReport) {
    for suite in &report.suites {
        print_suite_report(suite);
    }
    println!("{}", format_summary(&report.summary));
}

pub fn print_suite_report(suite: &SuiteReport) {
    let title = match &suite.source {
        Some(path) => format!("{} {}", suite.name.bold(), format!("({})", path.display()).dimmed()),
        None => suite.name.bold().to_string(),
    };
    println!("{}", title);
    if let Some(url) = &suite.base_url {
        println!("{} {}", "Base URL:".bold(), url.cyan());
    }

    if !suite.setup.is_empty() {
        println!("  {}", "setup".bold());
        for result in &suite.setup {
            print_result(result);
        }
    }

    for sequence in &suite.sequences {
        let color = if sequence.passed() {
            Color::Green
        } else {
            Color::Red
        };
        println!(
            "  {} {}",
            sequence.name.bold().color(color),
            format!("({:.1} ms)", sequence.duration_ms).dimmed()
        );
        for result in &sequence.results {
            print_result(result);
        }
    }
    println!();
}

fn print_result(result: &ScenarioResult) {
    println!("    {}", format_result_line(result));
    if let Some(message) = &result.message {
        println!("      {}", message.red());
    }
    if let Some(preview) = &result.body_preview {
        println!("      {}", preview.dimmed());
    }
}

fn format_result_line(result: &ScenarioResult) -> String {
    let marker = if result.passed() {
        "✓".green()
    } else {
        "✗".red()
    };
    let phase = match result.phase {
        Phase::Test => String::new(),
        other => format!("[{}] ", other.label()),
    };
    let status = match result.status {
        Some(code) => format!("{}", code).color(status_color(code)).to_string(),
        None => "---".dimmed().to_string(),
    };
    let target = result
        .url
        .as_deref()
        .map(|url| format!(" {}", url.cyan()))
        .unwrap_or_default();

    format!(
        "{} {}{} {} {}{} {}",
        marker,
        phase.dimmed(),
        result.name,
        result.method.bold(),
        status,
        target,
        format!("({:.1} ms)", result.duration_ms).dimmed()
    )
}

fn status_color(status: u16) -> Color {
    if status >= 400 {
        Color::Red
    } else if status >= 300 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn format_summary(summary: &Summary) -> String {
    let failed = format!("{} failed", summary.failed);
    format!(
        "{} {}, {}, {} total",
        "Scenarios:".bold(),
        format!("{} passed", summary.passed).green(),
        if summary.failed > 0 {
            failed.red().bold()
        } else {
            failed.dimmed()
        },
        summary.total
    )
}
