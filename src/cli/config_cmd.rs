use anyhow::Result;

use crate::cli::output::{print_json, OutputFormat, OutputOptions};
use crate::core::config::AppConfig;
use crate::core::store::FileStore;

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn path(opts: &OutputOptions) -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    let config_path = AppConfig::config_path();
    let store = FileStore::new(config.data_dir());
    let records = store.record_paths();
    match opts.format {
        OutputFormat::Json => print_json(
            &serde_json::json!({
                "config": config_path,
                "dataDir": store.dir(),
                "records": records,
            }),
            opts,
        )?,
        OutputFormat::Text => {
            println!("config   {}", config_path.display());
            println!("data     {}", store.dir().display());
            for (name, path) in &records {
                println!("  {:<12} {}", name, path.display());
            }
        }
    }
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `vv config init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        println!("Config is valid: {}", path.display());
        println!("  API      {}", config.api.base_url);
        println!("  Data dir {}", config.data_dir().display());
    } else {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}
