use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::context::AppContext;
use crate::cli::output::{print_json, OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::models::snapshot::DashboardSnapshot;
use crate::core::refresh::{RefreshOrchestrator, RefreshOutcome, RefreshSettings};

async fn orchestrator(ctx: &AppContext) -> RefreshOrchestrator {
    let settings = RefreshSettings::from(&ctx.settings().await);
    RefreshOrchestrator::new(
        ctx.api.clone(),
        ctx.store.clone(),
        ctx.session.clone(),
        settings,
    )
}

fn print_snapshot(snapshot: &DashboardSnapshot, opts: &OutputOptions) -> Result<()> {
    match opts.format {
        OutputFormat::Json => print_json(snapshot, opts)?,
        OutputFormat::Text => println!("{}", renderer::render_snapshot(snapshot, opts.use_color)),
    }
    Ok(())
}

/// Print the last persisted snapshot without touching the network.
pub fn show(ctx: &AppContext, opts: &OutputOptions) -> Result<()> {
    match ctx.session.snapshot() {
        Some(snapshot) => print_snapshot(&snapshot, opts),
        None => {
            eprintln!("No data yet. Run `vv refresh` or `vv watch`.");
            Ok(())
        }
    }
}

pub async fn refresh(ctx: &AppContext, opts: &OutputOptions) -> Result<()> {
    ctx.require_login()?;
    let orchestrator = orchestrator(ctx).await;

    let show_spinner = matches!(opts.format, OutputFormat::Text);
    let spinner = if show_spinner {
        Some(tokio::spawn(async move {
            let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
            let mut i = 0usize;
            loop {
                eprint!("\r {} Fetching usage data...", frames[i % frames.len()]);
                i = i.wrapping_add(1);
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
        }))
    } else {
        None
    };

    let result = orchestrator.refresh_interactive().await;

    if let Some(s) = spinner {
        s.abort();
        eprint!("\r\x1b[2K");
    }

    match result {
        Ok(RefreshOutcome::Published) => {}
        Ok(RefreshOutcome::NotLoggedIn) => anyhow::bail!("Not logged in."),
        Ok(RefreshOutcome::Skipped) => eprintln!("A refresh is already running."),
        Err(e) if e.is_session_expired() => {
            anyhow::bail!("Session expired. Run `vv login` again.")
        }
        Err(e) => return Err(e.into()),
    }
    show(ctx, opts)
}

/// Keep refreshing in the background and redraw on every new snapshot.
/// Reads single-letter commands from stdin. Returns once the session is
/// logged out, on `q`, or on ctrl-c.
pub async fn watch(ctx: &AppContext, opts: &OutputOptions) -> Result<()> {
    ctx.require_login()?;
    let orchestrator = Arc::new(orchestrator(ctx).await);
    let mut snapshots = orchestrator.session().subscribe();
    orchestrator.start().await;

    let redraw = |orchestrator: &RefreshOrchestrator| -> Result<()> {
        let Some(snapshot) = orchestrator.session().snapshot() else {
            return Ok(());
        };
        if opts.format == OutputFormat::Text {
            print!("\x1b[2J\x1b[H");
        }
        print_snapshot(&snapshot, opts)?;
        if opts.format == OutputFormat::Text {
            let status = renderer::render_status(&orchestrator.status(), opts.use_color);
            println!("\n{}", status);
        }
        Ok(())
    };

    redraw(&orchestrator)?;

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !orchestrator.session().is_logged_in() {
            eprintln!("Logged out. Run `vv login` to continue.");
            break;
        }
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                redraw(&orchestrator)?;
            }
            line = commands.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "p" => orchestrator.pause(),
                    "r" => {
                        let orchestrator = Arc::clone(&orchestrator);
                        tokio::spawn(async move { orchestrator.resume().await });
                    }
                    "n" => {
                        let orchestrator = Arc::clone(&orchestrator);
                        tokio::spawn(async move { orchestrator.refresh_now().await });
                    }
                    "f" => {
                        let orchestrator = Arc::clone(&orchestrator);
                        tokio::spawn(async move {
                            if let Err(e) = orchestrator.refresh_interactive().await {
                                eprintln!("Refresh failed: {:#}", anyhow::Error::from(e));
                            }
                        });
                    }
                    "q" => break,
                    "" => {}
                    other => eprintln!("Unknown command '{}' (p, r, n, f, q)", other),
                }
                if opts.format == OutputFormat::Text {
                    let status = renderer::render_status(&orchestrator.status(), opts.use_color);
                    eprintln!("{}", status);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    orchestrator.stop();
    Ok(())
}
