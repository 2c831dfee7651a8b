use anyhow::Result;

use crate::cli::context::AppContext;
use crate::cli::output::{print_json, OutputFormat, OutputOptions};
use crate::core::auth;

pub async fn login(ctx: &AppContext, cookie: Option<String>, opts: &OutputOptions) -> Result<()> {
    let cookie = match cookie {
        Some(cookie) => cookie,
        None => {
            eprintln!("Paste the Cookie header from a logged-in cursor.com tab, then press Enter:");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line
        }
    };

    let credentials = auth::login(ctx.api.as_ref(), ctx.store.as_ref(), &ctx.session, &cookie)
        .await?;
    match opts.format {
        OutputFormat::Json => print_json(
            &serde_json::json!({ "email": credentials.email, "userId": credentials.user_id }),
            opts,
        )?,
        OutputFormat::Text => println!("Logged in as {}", credentials.email),
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    auth::logout(ctx.store.as_ref(), &ctx.session).await?;
    println!("Logged out.");
    Ok(())
}
