//! Replay a scenario and print what happened.

use std::path::PathBuf;

use anyhow::{Context, Result};
use aura_content::{ConfigLoader, Scenario, ScenarioLoader, SpellCatalogLoader};
use aura_core::{AuraConfig, ObjectGuid, SpellCatalog, SpellId, SpellOracle};
use clap::Parser;
use console::style;

use crate::sim::{SimEvent, SimLine, Simulation};

/// Replay a scenario against a spell catalog
#[derive(Parser)]
pub struct Run {
    /// Spell catalog (RON)
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Scenario to replay (RON)
    #[arg(long, value_name = "FILE")]
    scenario: PathBuf,

    /// Runtime tunables (TOML with an [aura] table)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Largest simulation step in milliseconds
    #[arg(long, default_value = "100")]
    step: u32,

    /// Seed for proc and crit rolls
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Hide client sync packets
    #[arg(long)]
    quiet_sync: bool,
}

impl Run {
    pub fn execute(self) -> Result<()> {
        let catalog = SpellCatalogLoader::load(&self.catalog)?;
        let scenario = ScenarioLoader::load(&self.scenario)?;
        let config = match &self.config {
            Some(path) => ConfigLoader::load(path)?,
            None => AuraConfig::default(),
        };

        println!("{} {}", style("Scenario:").bold().cyan(), scenario.name);
        println!("{} {} spells", style("Catalog:").bold().cyan(), catalog.len());
        println!(
            "{} {}ms in steps of {}ms",
            style("Duration:").bold().cyan(),
            scenario.duration,
            self.step
        );
        println!();

        let mut sim = Simulation::new(&catalog, &scenario, config, self.seed)?;
        let lines = sim
            .run(self.step)
            .with_context(|| format!("Scenario '{}' failed", scenario.name))?;

        let names = Names {
            catalog: &catalog,
            scenario: &scenario,
        };
        for line in &lines {
            if self.quiet_sync && matches!(line.event, SimEvent::Sync { .. }) {
                continue;
            }
            print_line(line, &names);
        }

        println!();
        println!("{}", style("Final state").bold().underlined());
        for unit in sim.summary() {
            let health = format!("{}/{}", unit.health, unit.max_health);
            let status = if unit.alive {
                style(health).green()
            } else {
                style(format!("{health} dead")).red()
            };
            println!("  {} {}", style(&unit.name).bold(), status);
            for aura in unit.auras {
                let remaining = aura
                    .remaining
                    .map_or_else(|| "permanent".to_string(), |ms| format!("{ms}ms left"));
                println!(
                    "    {} {} stacks={} charges={} {}",
                    style(aura.spell).dim(),
                    aura.name,
                    aura.stacks,
                    aura.charges,
                    style(remaining).dim()
                );
            }
        }
        Ok(())
    }
}

/// Display names for guids and spell ids.
struct Names<'a> {
    catalog: &'a SpellCatalog,
    scenario: &'a Scenario,
}

impl Names<'_> {
    fn unit(&self, guid: ObjectGuid) -> String {
        self.scenario
            .name_of(guid)
            .map_or_else(|| guid.to_string(), str::to_string)
    }

    fn spell(&self, id: SpellId) -> String {
        self.catalog
            .spell(id)
            .map_or_else(|| format!("spell {id}"), |spell| spell.name.clone())
    }
}

fn print_line(line: &SimLine, names: &Names<'_>) {
    let at = style(format!("[{:>6}ms]", line.at)).dim();
    let text = match &line.event {
        SimEvent::Applied {
            spell,
            target,
            refreshed,
        } => {
            let verb = if *refreshed { "refreshed on" } else { "applied to" };
            format!("{} {} {}", style(names.spell(*spell)).cyan(), verb, names.unit(*target))
        }
        SimEvent::Skipped { reason } => format!("{} {}", style("skipped:").yellow(), reason),
        SimEvent::Removed {
            spell,
            target,
            count,
        } => format!("{} removed from {} ({count})", names.spell(*spell), names.unit(*target)),
        SimEvent::Dispelled { spell, target, gone } => {
            let outcome = if *gone { "dispelled" } else { "partly dispelled" };
            format!("{} {} from {}", names.spell(*spell), outcome, names.unit(*target))
        }
        SimEvent::Combat { actor, target } => {
            format!("{} strikes {}", names.unit(*actor), names.unit(*target))
        }
        SimEvent::Moved { unit } => format!("{} moves", names.unit(*unit)),
        SimEvent::Died { unit } => format!("{}", style(format!("{} dies", names.unit(*unit))).red().bold()),
        SimEvent::Damage {
            target,
            spell,
            amount,
            critical,
            periodic,
        } => {
            let kind = if *periodic { "ticks" } else { "hits" };
            let crit = if *critical { " (crit)" } else { "" };
            format!(
                "{} {kind} {} for {}{crit}",
                names.spell(*spell),
                names.unit(*target),
                style(amount).red()
            )
        }
        SimEvent::Heal {
            target,
            spell,
            amount,
            critical,
        } => {
            let crit = if *critical { " (crit)" } else { "" };
            format!(
                "{} heals {} for {}{crit}",
                names.spell(*spell),
                names.unit(*target),
                style(amount).green()
            )
        }
        SimEvent::Power {
            target,
            spell,
            amount,
        } => format!("{} changes power of {} by {amount}", names.spell(*spell), names.unit(*target)),
        SimEvent::Cast {
            caster,
            target,
            spell,
        } => {
            let target = target.map_or_else(|| "nobody".to_string(), |target| names.unit(target));
            format!(
                "{} triggers {} on {target}",
                names.unit(*caster),
                style(names.spell(*spell)).magenta()
            )
        }
        SimEvent::Sync {
            target,
            updates,
            bytes,
        } => format!(
            "{}",
            style(format!("sync {}: {updates} slots, {bytes} bytes", names.unit(*target))).dim()
        ),
    };
    println!("{at} {text}");
}
