mod config;

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compliance_guard_core::{
    build_client,
    evaluation::{evaluate, load_cases},
    llm::NoopLlmClient,
    report::{render_analysis, render_evaluation, render_rules, render_scan, OutputFormat},
    ComplianceAnalyzer, DocumentLoader, FileDocumentLoader, LlmClient, RuleSet,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "compliance-guard",
    author,
    version,
    about = "Rule-based compliance risk analysis for policy documents"
)]
struct Cli {
    /// Rule source: JSON, JSON5, YAML or `id | pattern` text [default: ./rules/rules.json]
    #[arg(long, value_name = "FILE", global = true)]
    rules: Option<PathBuf>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// LLM provider (groq, openai, anthropic, noop); overrides llm.provider
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model identifier; overrides llm.model
    #[arg(long, global = true)]
    model: Option<String>,

    /// Per-request timeout for LLM calls, e.g. `30s`, `1m` or `500ms`
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all loaded rules
    ListRules {
        /// Emit rules as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Scan a document offline and assess its risk (no LLM calls)
    Scan {
        /// Document to scan (.txt, .md, .pdf or .docx)
        document: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Scan, adjudicate and summarize a document
    Analyze {
        /// Document to analyze (.txt, .md, .pdf or .docx)
        document: PathBuf,
        /// Question for the summary
        #[arg(long)]
        query: Option<String>,
        /// Do not ask the LLM to judge individual findings
        #[arg(long)]
        skip_adjudication: bool,
        #[arg(long)]
        json: bool,
    },
    /// Score detection and risk accuracy against labelled cases
    Evaluate {
        /// JSON array of cases
        cases: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let mut app = AppConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut app, &cli);
    let rules_path = app.rules_path();

    match cli.command.unwrap_or(Commands::ListRules { json: false }) {
        Commands::ListRules { json } => list_rules(&rules_path, json)?,
        Commands::Scan { document, json } => scan(&app, &rules_path, &document, json)?,
        Commands::Analyze {
            document,
            query,
            skip_adjudication,
            json,
        } => {
            if skip_adjudication {
                app.analysis.adjudicate = false;
            }
            analyze(&app, &rules_path, &document, query.as_deref(), json).await?
        }
        Commands::Evaluate { cases, json } => run_evaluation(&app, &rules_path, &cases, json)?,
    }
    Ok(())
}

fn apply_overrides(app: &mut AppConfig, cli: &Cli) {
    if let Some(rules) = &cli.rules {
        app.rules = Some(rules.clone());
    }
    if let Some(provider) = &cli.provider {
        app.llm.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        app.llm.model = Some(model.clone());
    }
    if let Some(timeout) = cli.timeout {
        app.llm.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let timeout = humantime::parse_duration(value).map_err(|err| err.to_string())?;
    if timeout.as_millis() == 0 {
        return Err("timeout must be at least 1ms".to_string());
    }
    Ok(timeout)
}

fn load_rules(path: &Path) -> Result<RuleSet> {
    RuleSet::load(path).with_context(|| format!("failed to load rules from {}", path.display()))
}

fn offline_analyzer(app: &AppConfig, rules_path: &Path) -> Result<ComplianceAnalyzer> {
    let client: Arc<dyn LlmClient> = Arc::new(NoopLlmClient);
    Ok(ComplianceAnalyzer::new(
        load_rules(rules_path)?,
        client,
        app.analysis.clone(),
    ))
}

fn list_rules(rules_path: &Path, json: bool) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let format = OutputFormat::from_json_flag(json);
    if format == OutputFormat::Human {
        println!("{} rule(s) loaded from {}", rules.len(), rules_path.display());
    }
    emit(render_rules(&rules, format)?);
    Ok(())
}

fn scan(app: &AppConfig, rules_path: &Path, document: &Path, json: bool) -> Result<()> {
    let analyzer = offline_analyzer(app, rules_path)?;
    let text = FileDocumentLoader
        .load(document)
        .with_context(|| format!("failed to load document {}", document.display()))?;
    let report = analyzer.scan(&text);
    info!(findings = report.findings.len(), risk = %report.risk, "scan finished");
    emit(render_scan(&report, OutputFormat::from_json_flag(json))?);
    Ok(())
}

async fn analyze(
    app: &AppConfig,
    rules_path: &Path,
    document: &Path,
    query: Option<&str>,
    json: bool,
) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let client = build_client(&app.llm).context("failed to configure the LLM provider")?;
    debug!(settings = ?app.llm, "LLM client ready");
    let analyzer = ComplianceAnalyzer::new(rules, client, app.analysis.clone());
    let format = OutputFormat::from_json_flag(json);

    match analyzer.analyze_file(document, query).await {
        Ok(result) => {
            emit(render_analysis(&result, format)?);
            Ok(())
        }
        Err(err) => {
            if let Some(partial) = err.partial_report() {
                emit(render_scan(partial, format)?);
            }
            Err(err).with_context(|| format!("analysis of {} failed", document.display()))
        }
    }
}

fn run_evaluation(app: &AppConfig, rules_path: &Path, cases_path: &Path, json: bool) -> Result<()> {
    let analyzer = offline_analyzer(app, rules_path)?;
    let cases = load_cases(cases_path)?;
    let summary = evaluate(&analyzer, &cases);
    emit(render_evaluation(&summary, OutputFormat::from_json_flag(json))?);
    Ok(())
}

fn emit(rendered: String) {
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
