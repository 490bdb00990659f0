//! `roster` command line.
//!
//! Catalog state (enabled set, weights, active preset) persists between
//! invocations in a JSON state file. Schedules are read from
//! `<schedules>/<schedule_id>.json` as serialized [`SchedulingContext`]s.
//!
//! Exit codes: 0 success or feasible, 1 infeasible, 2 operational error.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adaptive::AdaptiveWeightController;
use crate::catalog::{ConstraintCatalog, Preset};
use crate::constraints::library::standard_catalog;
use crate::constraints::ConstraintKind;
use crate::evaluation::ValidationEngine;
use crate::models::SchedulingContext;
use crate::settings::EngineSettings;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "roster", version, about = "Residency schedule constraint engine")]
pub struct Cli {
    /// Catalog state file
    #[arg(long, global = true, default_value = "roster-state.json")]
    pub state: PathBuf,

    /// Engine settings (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding `<schedule_id>.json` files
    #[arg(long, global = true, default_value = "schedules")]
    pub schedules: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enable a constraint (its dependencies must already be enabled)
    Enable {
        /// Constraint id
        id: String,
    },

    /// Disable a constraint
    Disable {
        /// Constraint id
        id: String,
    },

    /// Apply a named preset
    Preset {
        /// Preset name
        name: String,
    },

    /// Show the active preset and the resolved constraint set
    Status,

    /// List every registered constraint
    List,

    /// Validate a stored schedule and print the report as JSON
    Validate {
        /// Schedule id (file stem under --schedules)
        schedule_id: String,
    },
}

/// Successful command result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Command succeeded, or the schedule is feasible.
    Success,
    /// The validated schedule is infeasible.
    Infeasible,
}

impl From<Outcome> for ExitCode {
    fn from(o: Outcome) -> Self {
        match o {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Infeasible => ExitCode::from(1),
        }
    }
}

/// Persisted catalog state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CliState {
    active_preset: Option<String>,
    preset: Preset,
}

fn load_state(path: &Path) -> Result<Option<CliState>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let state = serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(state))
}

fn save_state(path: &Path, catalog: &ConstraintCatalog) -> Result<()> {
    let state = CliState {
        active_preset: catalog.active_preset().map(str::to_string),
        preset: catalog.capture("state"),
    };
    let text = serde_json::to_string_pretty(&state).context("serialize state")?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "state saved");
    Ok(())
}

impl Cli {
    fn settings(&self) -> Result<EngineSettings> {
        match &self.config {
            Some(path) => Ok(EngineSettings::load(path)?),
            None => Ok(EngineSettings::default()),
        }
    }

    fn catalog(&self, settings: &EngineSettings) -> Result<ConstraintCatalog> {
        let mut catalog = standard_catalog()?;
        settings.apply_to_catalog(&mut catalog)?;
        if let Some(state) = load_state(&self.state)? {
            catalog
                .restore(&state.preset, state.active_preset)
                .with_context(|| format!("restore {}", self.state.display()))?;
        }
        Ok(catalog)
    }

    fn schedule(&self, schedule_id: &str) -> Result<SchedulingContext> {
        if schedule_id.is_empty() || schedule_id.contains(['/', '\\']) || schedule_id.starts_with('.') {
            bail!("invalid schedule id: {schedule_id:?}");
        }
        let path = self.schedules.join(format!("{schedule_id}.json"));
        if !path.exists() {
            bail!("schedule not found: {}", path.display());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }
}

/// Runs a parsed command, writing user-facing output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<Outcome> {
    let settings = cli.settings()?;
    let mut catalog = cli.catalog(&settings)?;

    match &cli.command {
        Command::Enable { id } => {
            catalog.set_enabled(id, true)?;
            save_state(&cli.state, &catalog)?;
            writeln!(out, "enabled {id}")?;
        }

        Command::Disable { id } => {
            catalog.set_enabled(id, false)?;
            save_state(&cli.state, &catalog)?;
            writeln!(out, "disabled {id}")?;
        }

        Command::Preset { name } => {
            catalog.apply_preset(name)?;
            save_state(&cli.state, &catalog)?;
            writeln!(out, "applied preset {name}")?;
        }

        Command::Status => {
            let set = catalog.resolve()?;
            writeln!(out, "preset: {}", catalog.active_preset().unwrap_or("(custom)"))?;
            writeln!(out, "generation: {}", set.generation())?;
            writeln!(out, "hard ({}):", set.hard().len())?;
            for def in set.hard() {
                writeln!(out, "  {} [{:?}]", def.id, def.priority)?;
            }
            let summary = set.summary();
            writeln!(out, "soft ({}):", summary.soft.len())?;
            for (id, weight) in &summary.soft {
                writeln!(out, "  {id} w={weight}")?;
            }
        }

        Command::List => {
            for (def, on) in catalog.constraints() {
                let kind = match def.kind {
                    ConstraintKind::Hard => format!("hard/{:?}", def.priority),
                    ConstraintKind::Soft => format!("soft/{}", def.weight),
                };
                let category = format!("{:?}", def.category);
                writeln!(
                    out,
                    "[{}] {:<24} {:<14} {:<12}{}  {}",
                    if on { 'x' } else { ' ' },
                    def.id,
                    kind,
                    category,
                    if def.locked { " locked" } else { "" },
                    def.description
                )?;
            }
        }

        Command::Validate { schedule_id } => {
            let context = cli.schedule(schedule_id)?;
            let set = catalog.resolve()?;

            if let Some(snapshot) = &context.resilience {
                let controller = AdaptiveWeightController::new(
                    Arc::clone(catalog.weights()),
                    settings.level_tables()?,
                    settings.controller_settings(),
                )?
                .with_initial_level(snapshot.defense_level);
                debug!(level = %controller.current_level(), "schedule defense level applied");
            }

            let report = ValidationEngine::new().validate(&set, &context);
            writeln!(out, "{}", report.to_json()?)?;
            if !report.is_feasible {
                return Ok(Outcome::Infeasible);
            }
        }
    }

    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::library::ids;
    use crate::models::{Assignment, Block, DefenseLevel, Person, ResilienceSnapshot, RotationTemplate, TemplateKind};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn cli(dir: &TempDir, command: Command) -> Cli {
        Cli {
            state: dir.path().join("state.json"),
            config: None,
            schedules: dir.path().to_path_buf(),
            command,
        }
    }

    fn exec(dir: &TempDir, command: Command) -> (Result<Outcome>, String) {
        let mut out = Vec::new();
        let r = run(&cli(dir, command), &mut out);
        (r, String::from_utf8(out).unwrap())
    }

    fn write_schedule(dir: &TempDir, id: &str, ctx: &SchedulingContext) {
        let path = dir.path().join(format!("{id}.json"));
        fs::write(path, serde_json::to_string(ctx).unwrap()).unwrap();
    }

    fn schedule(absent: bool) -> SchedulingContext {
        let d = |day| NaiveDate::from_ymd_opt(2025, 7, day).unwrap();
        let mut r1 = Person::resident("R1", 2);
        if absent {
            r1 = r1.with_absence(d(1), d(2));
        }
        SchedulingContext::new()
            .with_person(r1)
            .with_person(Person::faculty("F1"))
            .with_block(Block::am("A1", d(1)))
            .with_template(RotationTemplate::new("CLINIC", TemplateKind::Clinic).supervised())
            .with_assignments(vec![
                Assignment::new("R1", "A1", "CLINIC"),
                Assignment::new("F1", "A1", "CLINIC"),
            ])
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from(["roster", "--state", "s.json", "disable", "Equity"]).unwrap();
        assert_eq!(cli.state, PathBuf::from("s.json"));
        assert_eq!(cli.command, Command::Disable { id: "Equity".into() });
        assert!(Cli::try_parse_from(["roster", "frobnicate"]).is_err());
    }

    #[test]
    fn test_state_persists_between_runs() {
        let dir = TempDir::new().unwrap();
        let (r, _) = exec(&dir, Command::Disable { id: ids::EQUITY.into() });
        assert_eq!(r.unwrap(), Outcome::Success);

        let (r, out) = exec(&dir, Command::Status);
        assert_eq!(r.unwrap(), Outcome::Success);
        assert!(out.contains("preset: (custom)"));
        assert!(!out.contains("Equity w="));
    }

    #[test]
    fn test_preset_command() {
        let dir = TempDir::new().unwrap();
        exec(&dir, Command::Preset { name: "minimal".into() }).0.unwrap();
        let (_, out) = exec(&dir, Command::Status);
        assert!(out.contains("preset: minimal"));
        assert!(out.contains("soft (1):"));

        let (r, _) = exec(&dir, Command::Preset { name: "nope".into() });
        assert!(r.is_err());
    }

    #[test]
    fn test_locked_constraint_cannot_be_disabled() {
        let dir = TempDir::new().unwrap();
        let (r, _) = exec(&dir, Command::Disable { id: ids::AVAILABILITY.into() });
        assert!(r.is_err());
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn test_list_marks_locked() {
        let dir = TempDir::new().unwrap();
        let (_, out) = exec(&dir, Command::List);
        assert_eq!(out.lines().count(), 21);
        let line = out.lines().find(|l| l.contains(ids::AVAILABILITY)).unwrap();
        assert!(line.starts_with("[x]"));
        assert!(line.contains("locked"));
    }

    #[test]
    fn test_validate_exit_codes() {
        let dir = TempDir::new().unwrap();
        write_schedule(&dir, "ok", &schedule(false));
        write_schedule(&dir, "bad", &schedule(true));

        let (r, out) = exec(&dir, Command::Validate { schedule_id: "ok".into() });
        assert_eq!(r.unwrap(), Outcome::Success);
        assert!(out.contains("\"is_feasible\": true"));

        let (r, out) = exec(&dir, Command::Validate { schedule_id: "bad".into() });
        assert_eq!(r.unwrap(), Outcome::Infeasible);
        assert!(out.contains("\"severity\": \"critical\""));

        let (r, _) = exec(&dir, Command::Validate { schedule_id: "missing".into() });
        assert!(r.is_err());
        let (r, _) = exec(&dir, Command::Validate { schedule_id: "../ok".into() });
        assert!(r.is_err());
    }

    #[test]
    fn test_validate_applies_schedule_defense_level() {
        let dir = TempDir::new().unwrap();
        let ctx = schedule(false).with_resilience(ResilienceSnapshot::at_level(DefenseLevel::Red));
        write_schedule(&dir, "red", &ctx);

        let (r, out) = exec(&dir, Command::Validate { schedule_id: "red".into() });
        assert_eq!(r.unwrap(), Outcome::Success);
        assert!(out.contains("\"defense_level\": \"red\""));
    }
}
