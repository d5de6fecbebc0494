//! CLI argument parsing and subcommand dispatch.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use buyerflow_core::{load_events, Config};
use buyerflow_rules::loader::{LoadStatus, RuleLoader};
use buyerflow_rules::scoring::tier_distribution;
use buyerflow_rules::validation::validate_yaml;
use buyerflow_rules::ScoringConfig;

/// Buyer-event automation rule engine.
#[derive(Parser, Debug)]
#[command(name = "buyerflow", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub rules: RulesArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the rules section of the environment config.
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Directory scanned recursively for rule YAML documents.
    #[arg(long, global = true)]
    pub rules_dir: Option<PathBuf>,

    /// Rule set to evaluate.
    #[arg(long, global = true)]
    pub rule_set: Option<String>,

    /// ScoringConfig document used for lead scoring.
    #[arg(long, global = true)]
    pub scoring_config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Disable hot reload of rule documents.
        #[arg(long)]
        no_watch: bool,
    },
    /// Evaluate a rule set against a JSON file of events.
    Simulate {
        #[arg(long)]
        events: PathBuf,
    },
    /// Score one lead per JSON events file.
    Score {
        #[arg(long, num_args = 1.., required = true)]
        events: Vec<PathBuf>,
    },
    /// Validate rule documents: the given files, or the whole rules directory.
    Validate {
        files: Vec<PathBuf>,
    },
}

impl Cli {
    /// Fold command-line overrides into the environment config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.rules.rules_dir {
            config.rules.dir = dir.clone();
        }
        if let Some(id) = &self.rules.rule_set {
            config.rules.default_rule_set = id.clone();
        }
        if let Some(id) = &self.rules.scoring_config {
            config.rules.scoring_config_id = id.clone();
        }
        if let Command::Serve { host, port, no_watch } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if *no_watch {
                config.rules.watch = false;
            }
        }
    }
}

fn load_rules(config: &Config) -> anyhow::Result<RuleLoader> {
    let loader = RuleLoader::new(config.rules.dir.clone());
    loader
        .load_all()
        .with_context(|| format!("failed to scan {}", config.rules.dir.display()))?;
    Ok(loader)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn simulate(config: &Config, events_path: &Path) -> anyhow::Result<()> {
    let events = load_events(events_path)
        .with_context(|| format!("failed to read events from {}", events_path.display()))?;
    let loader = load_rules(config)?;
    let rule_set = loader.rule_set(&config.rules.default_rule_set)?;

    let result = rule_set.simulate(&events)?;
    info!(
        rule_set = %rule_set.id(),
        fired = result.kpis.automations_fired,
        "simulation complete"
    );
    print_json(&result)
}

pub fn score(config: &Config, paths: &[PathBuf]) -> anyhow::Result<()> {
    let loader = load_rules(config)?;
    let scoring = match loader.scoring_config(&config.rules.scoring_config_id) {
        Ok(scoring) => scoring,
        Err(e) => {
            tracing::warn!(error = %e, "using built-in scoring weights");
            ScoringConfig::default()
        }
    };

    let mut leads = Vec::with_capacity(paths.len());
    for path in paths {
        let events = load_events(path)
            .with_context(|| format!("failed to read events from {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("lead")
            .to_string();
        leads.push((name, scoring.score(&events)));
    }

    let distribution = tier_distribution(leads.iter().map(|(_, s)| s));
    let leads: Vec<_> = leads
        .iter()
        .map(|(name, s)| {
            serde_json::json!({
                "name": name,
                "score": s.score,
                "tier": s.tier,
                "followUp": s.tier.follow_up(),
            })
        })
        .collect();
    print_json(&serde_json::json!({ "leads": leads, "distribution": distribution }))
}

pub fn validate(config: &Config, files: &[PathBuf]) -> anyhow::Result<()> {
    if files.is_empty() {
        return validate_dir(config);
    }

    let mut invalid = 0;
    for path in files {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let result = validate_yaml(&yaml);
        for e in &result.errors {
            println!("{}: error at {}: {}", path.display(), e.path, e.message);
        }
        for w in &result.warnings {
            match &w.suggestion {
                Some(s) => println!(
                    "{}: warning at {}: {} ({})",
                    path.display(),
                    w.path,
                    w.message,
                    s
                ),
                None => println!("{}: warning at {}: {}", path.display(), w.path, w.message),
            }
        }
        if result.valid {
            println!("{}: ok", path.display());
        } else {
            invalid += 1;
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} documents are invalid", files.len());
    }
    Ok(())
}

fn validate_dir(config: &Config) -> anyhow::Result<()> {
    let loader = RuleLoader::new(config.rules.dir.clone());
    let results = loader.load_all()?;

    let mut failed = 0;
    for r in &results {
        match &r.status {
            LoadStatus::Loaded { id, kind } => println!("{}: ok ({kind} '{id}')", r.path.display()),
            LoadStatus::Skipped { reason } => println!("{}: skipped ({reason})", r.path.display()),
            LoadStatus::Failed { error } => {
                failed += 1;
                println!("{}: failed: {error}", r.path.display());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} rule files failed to load from {}", loader.rules_dir().display());
    }
    Ok(())
}
