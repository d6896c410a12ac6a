use crate::types::output::ScanReport;
use colored::*;

/// Renders `report` as JSON or as colored text.
pub fn print_output(format: &str, report: &ScanReport) {
    match format {
        "json" => match serde_json::to_string_pretty(report) {
            Ok(json_output) => println!("{}", json_output),
            Err(e) => eprintln!("{} Could not serialize report: {}", "[!]".red(), e),
        },
        _ => print_text(report),
    }
}

fn print_text(report: &ScanReport) {
    println!(
        "\n{} {} (parameter '{}', alg {})",
        "[*]".blue(),
        report.target,
        report.parameter,
        report.algorithm
    );

    if !report.key_references.is_empty() {
        println!(
            "{} Header references keys: kid={} jku={}",
            "[*]".blue(),
            report.key_references.kid.as_deref().unwrap_or("-"),
            report.key_references.jku.as_deref().unwrap_or("-")
        );
    }

    if let Some(secret) = &report.discovered_secret {
        println!("{} Found matching secret: {}", "[!]".green(), secret.green());
    }

    if !report.is_vulnerable() {
        println!("{} No vulnerability confirmed", "[-]".yellow());
        return;
    }

    for finding in &report.findings {
        println!(
            "\n{} {} [risk: {}, confidence: {}]",
            "[!]".red(),
            finding.name.red().bold(),
            finding.risk,
            finding.confidence
        );
        if let Some(fuzzer) = &report.successful_fuzzer {
            println!("    Strategy: {}", fuzzer);
        }
        println!("    Evidence: {}", finding.evidence.escape_debug());
        println!("    {}", finding.description);
        println!("    Solution: {}", finding.solution);
        println!("    References: {}", finding.references);
    }
}
