//! Print the contents of a spell catalog.

use std::path::PathBuf;

use anyhow::Result;
use aura_content::SpellCatalogLoader;
use aura_core::{SpellId, SpellInfo, SpellOracle};
use clap::Parser;
use console::style;

/// List spells of a catalog
#[derive(Parser)]
pub struct Inspect {
    /// Spell catalog (RON)
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Show only this spell, with all of its effects
    #[arg(long, value_name = "ID")]
    spell: Option<u32>,
}

impl Inspect {
    pub fn execute(self) -> Result<()> {
        let catalog = SpellCatalogLoader::load(&self.catalog)?;

        if let Some(id) = self.spell {
            let spell = catalog
                .spell(SpellId(id))
                .ok_or_else(|| anyhow::anyhow!("Spell {} not found in {}", id, self.catalog.display()))?;
            print_spell_details(&spell);
            return Ok(());
        }

        println!(
            "{} {} ({} spells)",
            style("Catalog:").bold().cyan(),
            self.catalog.display(),
            catalog.len()
        );
        println!();
        for spell in catalog.spells() {
            println!(
                "  {:>7}  {:<28} {}",
                style(spell.id).dim(),
                spell.name,
                summarize(&spell)
            );
        }
        Ok(())
    }
}

fn summarize(spell: &SpellInfo) -> String {
    let mut parts = Vec::new();
    match spell.duration {
        Some(duration) if duration > 0 => parts.push(format!("{duration}ms")),
        _ if spell.is_passive() => parts.push("passive".to_string()),
        _ => {}
    }
    if spell.stack_amount > 0 {
        parts.push(format!("stacks {}", spell.stack_amount));
    }
    if spell.proc_charges > 0 {
        parts.push(format!("charges {}", spell.proc_charges));
    }
    let auras: Vec<String> = spell.effects.iter().map(|effect| effect.aura.to_string()).collect();
    if !auras.is_empty() {
        parts.push(auras.join("+"));
    }
    parts.join(", ")
}

fn print_spell_details(spell: &SpellInfo) {
    println!("{} {} ({})", style("Spell:").bold().cyan(), spell.name, spell.id);
    println!("{} {:?}", style("Duration:").bold().cyan(), spell.duration);
    println!("{} {:?}", style("Attributes:").bold().cyan(), spell.attributes);
    if spell.stack_amount > 0 {
        println!("{} {}", style("Max stacks:").bold().cyan(), spell.stack_amount);
    }
    if spell.proc_charges > 0 {
        println!("{} {}", style("Charges:").bold().cyan(), spell.proc_charges);
    }
    if let Some(entry) = &spell.proc {
        println!(
            "{} flags={:?} chance={} ppm={} cooldown={}ms",
            style("Proc:").bold().cyan(),
            entry.proc_flags,
            entry.chance,
            entry.procs_per_minute,
            entry.cooldown
        );
    }
    if !spell.groups.is_empty() {
        println!("{} {:?}", style("Groups:").bold().cyan(), spell.groups);
    }

    println!();
    for effect in &spell.effects {
        println!(
            "  #{} {} / {} points={} period={}ms radius={}",
            effect.index,
            effect.effect,
            style(effect.aura).bold(),
            effect.base_points,
            effect.amplitude,
            effect.radius
        );
        if let Some(trigger) = effect.trigger_spell {
            println!("     triggers {trigger}");
        }
    }
}
