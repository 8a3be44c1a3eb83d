use std::fmt::Write;

use colored::Colorize;

use crate::{
    analyzer::AnalysisResult,
    evaluation::EvaluationSummary,
    risk::RiskLevel,
    scanner::{rule_set::RuleSet, ScanReport},
};

/// Format styles supported by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Human
        }
    }
}

/// Render findings and risk without a summary.
pub fn render_scan(report: &ScanReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report, None),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

pub fn render_analysis(result: &AnalysisResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(&result.report, Some(&result.summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

pub fn render_rules(rules: &RuleSet, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => {
            let mut out = String::new();
            if rules.is_empty() {
                writeln!(out, "No rules loaded.")?;
            }
            let width = rules.iter().map(|rule| rule.id().len()).max().unwrap_or(0);
            for rule in rules.iter() {
                writeln!(out, "{:<width$}  {}", rule.id(), rule.pattern())?;
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rules)?),
    }
}

pub fn render_evaluation(
    summary: &EvaluationSummary,
    format: OutputFormat,
) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(summary)?);
    }

    let mut out = String::new();
    writeln!(out, "Cases evaluated: {}", summary.cases.len())?;
    writeln!(out, "Average Precision: {:.3}", summary.average_precision)?;
    writeln!(out, "Average Recall: {:.3}", summary.average_recall)?;
    writeln!(out, "Average F1-Score: {:.3}", summary.average_f1)?;
    writeln!(out, "Risk Level Accuracy: {:.3}", summary.risk_accuracy)?;

    writeln!(out)?;
    writeln!(
        out,
        "{:<4} {:<32} {:>9} {:>7} {:>6}  {:<8} {:<8}",
        "ID", "Case", "Precision", "Recall", "F1", "Expected", "Detected"
    )?;
    for case in &summary.cases {
        let name: String = case.name.chars().take(32).collect();
        let mark = if case.risk_accurate { "ok" } else { "MISS" };
        writeln!(
            out,
            "{:<4} {:<32} {:>9.3} {:>7.3} {:>6.3}  {:<8} {:<8} {}",
            case.id,
            name,
            case.precision,
            case.recall,
            case.f1_score,
            case.expected_risk.to_string(),
            case.detected_risk.to_string(),
            mark
        )?;
    }

    if !summary.rule_detection.is_empty() {
        writeln!(out)?;
        writeln!(out, "Detection by rule:")?;
        for rule in &summary.rule_detection {
            writeln!(
                out,
                "  - {:<28} {:.3} ({}/{})",
                rule.rule_id, rule.detection_rate, rule.detected, rule.expected
            )?;
        }
    }
    Ok(out)
}

fn render_human(report: &ScanReport, summary: Option<&str>) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Risk Level: {} (score {})",
        paint_level(report.risk),
        report.breakdown.score
    )?;

    if !report.breakdown.contributions.is_empty() {
        writeln!(out, "Score Breakdown:")?;
        for contribution in &report.breakdown.contributions {
            writeln!(
                out,
                "  - {bucket:<9} {count} finding(s), {points} point(s)",
                bucket = format!("{:?}", contribution.bucket).to_lowercase(),
                count = contribution.occurrences,
                points = contribution.points,
            )?;
        }
    }
    writeln!(out)?;

    if report.findings.is_empty() {
        writeln!(out, "No findings detected.")?;
    } else {
        writeln!(out, "Findings ({}):", report.findings.len())?;
        for (index, finding) in report.findings.iter().enumerate() {
            writeln!(
                out,
                "  {n}. {id} @ {start}..{end}: \"{text}\"",
                n = index + 1,
                id = finding.rule_id.bold(),
                start = finding.span.0,
                end = finding.span.1,
                text = sanitize_excerpt(&finding.matched_text),
            )?;
            if !finding.context.trim().is_empty() {
                writeln!(out, "     Context: \"{}\"", sanitize_excerpt(&finding.context))?;
            }
            if let Some(judgment) = &finding.judgment {
                let text = sanitize_excerpt(&judgment.display_text());
                if judgment.is_failed() {
                    writeln!(out, "     Judgment: {}", text.yellow())?;
                } else {
                    writeln!(out, "     Judgment: {text}")?;
                }
            }
        }
    }

    if let Some(summary) = summary {
        writeln!(out)?;
        writeln!(out, "Summary:")?;
        for line in summary.lines() {
            writeln!(out, "  {line}")?;
        }
    }

    Ok(out)
}

fn paint_level(level: RiskLevel) -> String {
    let label = level.to_string();
    match level {
        RiskLevel::High => label.red().bold().to_string(),
        RiskLevel::Medium => label.yellow().bold().to_string(),
        RiskLevel::Low => label.green().to_string(),
    }
}

fn sanitize_excerpt(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}
