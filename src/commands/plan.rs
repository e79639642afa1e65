//! `cai-export plan`: show the resolved export without calling the API.

use crate::Context;
use crate::cli::ScopeArgs;
use crate::config::Settings;
use crate::ui;
use anyhow::Result;
use inventory::{ContentType, InventoryConfig};

pub fn run(ctx: &Context, scope: &ScopeArgs) -> Result<()> {
    let settings = Settings::load(ctx.config.as_deref())?;
    let config = super::resolve_config(&settings, scope)?;

    ui::header("Export Plan");
    for (key, value) in plan_lines(&config) {
        ui::field(&key, value);
    }
    if !ctx.quiet {
        println!();
        ui::info("Run `cai-export export` with the same options to start the export.");
    }
    Ok(())
}

fn plan_lines(config: &InventoryConfig) -> Vec<(String, String)> {
    let mut lines = vec![
        ("Parent".to_string(), config.parent()),
        (
            "Billing project".to_string(),
            config
                .billing_project()
                .map_or_else(|| "(credentials default)".to_string(), String::from),
        ),
        ("Bucket".to_string(), config.bucket().to_string()),
    ];
    lines.extend(
        ContentType::all()
            .iter()
            .map(|ct| (ct.name().to_string(), config.destination_uri(*ct))),
    );
    lines
}
