// rules.rs — List the rules a policy file compiles to.

use std::path::Path;

use og_policy::{PolicyRule, PolicySet};

pub fn execute(policy: &Path, json: bool) -> anyhow::Result<()> {
    let set = PolicySet::from_file(policy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(set.rules())?);
        return Ok(());
    }

    if set.is_empty() {
        println!("No rules parsed from {}", policy.display());
        return Ok(());
    }

    println!("{:<4} {:<8} {:<10} CONDITION", "#", "EFFECT", "ACTION");
    println!("{}", "-".repeat(72));
    for (i, rule) in set.rules().iter().enumerate() {
        println!("{}", format_rule(i + 1, rule));
    }
    println!();
    println!("{} rule(s)", set.len());
    Ok(())
}

fn format_rule(index: usize, rule: &PolicyRule) -> String {
    format!(
        "{:<4} {:<8} {:<10} {}",
        index,
        rule.effect.as_str(),
        rule.action.as_str(),
        rule.condition()
    )
}
