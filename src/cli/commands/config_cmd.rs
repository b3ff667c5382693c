//! Configuration inspection commands.

use console::style;

use crate::cli::icons::{dim_arrow, success, warn};
use crate::config::Config;

/// Print the effective configuration as TOML.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match &config.source_path {
        Some(path) => eprintln!("{} Loaded from {}", success(), path.display()),
        None => eprintln!("{} No config file found, using defaults", warn()),
    }
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// List the configured OCR profiles.
pub fn cmd_config_profiles(config: &Config) -> anyhow::Result<()> {
    for (key, profile) in &config.profiles {
        let marker = if *key == config.profile {
            style("*").green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {} {}",
            marker,
            style(key).bold(),
            style(format!("({})", profile.name)).dim()
        );
        if !profile.description.is_empty() {
            println!("    {} {}", dim_arrow(), profile.description);
        }
        println!(
            "    {} format {}, batch size {}, languages {}",
            dim_arrow(),
            profile.result_format,
            profile.batch_size,
            profile.language_hints.join(", ")
        );
    }

    if !config.profiles.contains_key(&config.profile) {
        println!(
            "\n{} Active profile '{}' is not defined",
            warn(),
            config.profile
        );
    }
    Ok(())
}
