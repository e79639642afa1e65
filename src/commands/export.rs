//! `cai-export export`: submit both inventory exports and wait for them.

use crate::Context;
use crate::cli::ExportArgs;
use crate::config::Settings;
use crate::progress::{self, SpinnerObserver};
use crate::ui;
use anyhow::Result;
use inventory::auth::{GcloudToken, StaticToken, TokenSource};
use inventory::backend::asset_api::AssetApiBackend;
use inventory::{
    CancellationToken, Client, Error, ExecutionMode, ExportFailures, ExportReport, WaitOptions,
};
use std::sync::Arc;

const SPINNER_MESSAGE: &str = "Exporting Cloud Asset Inventory to GCS bucket...";

pub fn run(ctx: &Context, args: ExportArgs) -> Result<()> {
    let settings = Settings::load(ctx.config.as_deref())?;
    let config = super::resolve_config(&settings, &args.scope)?;

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| settings.api.endpoint.clone());
    let backend = AssetApiBackend::new(token_source(args.access_token.as_deref()))
        .endpoint(endpoint)
        .billing_project(config.billing_project().map(String::from));

    let mode = if args.concurrent || settings.api.concurrent {
        ExecutionMode::Concurrent
    } else {
        ExecutionMode::Sequential
    };

    let quiet = ctx.quiet || args.json;
    let pb = progress::spinner(SPINNER_MESSAGE, quiet);
    let client = Client::new(Box::new(backend))
        .with_observer(Arc::new(SpinnerObserver::new(pb.clone(), SPINNER_MESSAGE)))
        .wait_options(wait_options(&settings, &args))
        .execution_mode(mode);

    match client.export(&config, &CancellationToken::new()) {
        Ok(report) => {
            if quiet {
                pb.finish_and_clear();
            } else {
                progress::finish_success(
                    &pb,
                    &format!("Exported inventory of {} to gs://{}", config.parent(), config.bucket()),
                );
            }
            print_report(&report, args.json, quiet)?;
            Ok(())
        }
        Err(Error::Export(failures)) => {
            if quiet {
                pb.finish_and_clear();
            } else {
                progress::finish_error(&pb, "Inventory export failed");
            }
            print_report(&failures.report, args.json, quiet)?;
            if !quiet {
                print_advice(&failures);
            }
            Err(Error::Export(failures).into())
        }
        Err(e) => {
            pb.finish_and_clear();
            Err(e.into())
        }
    }
}

/// Use the explicit token when given, otherwise ask gcloud.
fn token_source(access_token: Option<&str>) -> Box<dyn TokenSource> {
    match access_token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Box::new(StaticToken::new(token)),
        None => {
            log::debug!("No access token given, using gcloud");
            Box::new(GcloudToken::new())
        }
    }
}

/// Wait settings from the file, with flags on top.
fn wait_options(settings: &Settings, args: &ExportArgs) -> WaitOptions {
    let mut wait = settings.wait.clone();
    if let Some(timeout) = args.timeout {
        wait.timeout_secs = Some(timeout);
    }
    if let Some(interval) = args.poll_interval {
        wait.poll_interval_secs = interval;
    }
    wait.to_options()
}

fn print_report(report: &ExportReport, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    ui::header("Export Summary");
    for job in &report.jobs {
        ui::job(job);
    }
    Ok(())
}

fn print_advice(failures: &ExportFailures) {
    println!();
    let mut seen = Vec::new();
    for failure in &failures.failures {
        let category = failure.error.category();
        if seen.contains(&category) {
            continue;
        }
        seen.push(category);
        ui::warn(format!("{}: {}", category, category.advice()));
    }
}
