//! Console and JSON report writers.

use anyhow::Result;
use colored::Colorize;
use loopcast_engine::Forecast;

pub fn write_console(forecast: &Forecast) {
    println!("{}", "Loopcast forecast".bold());
    println!(
        "  plan entries: {}   mana spent: {:.1}   real time: {:.2}s",
        forecast.entries.len(),
        forecast.total_mana,
        forecast.total_seconds
    );
    println!();

    for entry in &forecast.entries {
        let status = if entry.is_valid {
            "ok".green()
        } else {
            "mana!".red()
        };
        println!(
            "  {:<20} x{:<4} [{status}] ticks {:>6}  low {:>8.1}",
            entry.action.cyan(),
            entry.repetitions_done,
            entry.ticks_spent,
            entry.lowest_mana,
        );
        for (resource, value) in &entry.resources {
            println!("      {resource:<18} {value:>10.1}");
        }
        for delta in entry.stat_levels.iter().chain(entry.skill_levels.iter()) {
            let gained = if delta.gained > 0 {
                format!("(+{})", delta.gained).yellow().to_string()
            } else {
                String::new()
            };
            println!(
                "      {:<18} lv {:>3} {gained}  +{:.1} exp",
                delta.name, delta.level, delta.exp_gained
            );
        }
    }

    println!();
    if forecast.is_fully_valid() {
        println!("{}", "plan is affordable throughout".green());
    } else {
        println!("{}", "plan runs out of mana".red().bold());
    }
}

pub fn write_json(forecast: &Forecast) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(forecast)?);
    Ok(())
}
