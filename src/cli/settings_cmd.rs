use anyhow::{Context, Result};

use crate::cli::context::AppContext;
use crate::cli::output::{print_json, OutputFormat, OutputOptions};
use crate::core::models::settings::AppSettings;
use crate::core::store::{self, StoreKey};

fn print_settings(settings: &AppSettings, opts: &OutputOptions) -> Result<()> {
    match opts.format {
        OutputFormat::Json => print_json(settings, opts)?,
        OutputFormat::Text => {
            println!("refresh_interval_secs  {}", settings.refresh_interval_secs);
            println!("paused_poll_secs       {}", settings.paused_poll_secs);
            println!("analytics_days         {}", settings.analytics_days);
            println!("usage_history_limit    {}", settings.usage_history_limit);
        }
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, opts: &OutputOptions) -> Result<()> {
    print_settings(&ctx.settings().await, opts)
}

pub async fn set(ctx: &AppContext, key: &str, value: &str, opts: &OutputOptions) -> Result<()> {
    let mut settings = ctx.settings().await;
    if let Err(msg) = settings.set(key, value) {
        anyhow::bail!(msg);
    }
    store::save_typed(ctx.store.as_ref(), StoreKey::Settings, &settings)
        .await
        .context("Failed to save settings")?;
    print_settings(&settings, opts)
}
