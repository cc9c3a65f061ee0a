//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask before fitting the next model in the sequence
pub fn confirm_next_model(label: &str, formula: &str) -> Result<bool> {
    let message = format!("Fit {}: {}?", label, formula);
    confirm_step(&message)
}
