//! Configuration status command.

use std::path::Path;

use anyhow::Result;
use console::style;
use secrecy::SecretString;

use squidai_infra::config::Secrets;
use squidai_infra::mongo::check_status;
use squidai_types::config::AppConfig;

fn is_set(secret: &Option<SecretString>) -> bool {
    secret.is_some()
}

/// Print which credentials are configured and whether MongoDB answers.
pub async fn status(config: &AppConfig, secrets: &Secrets, data_dir: &Path, json: bool) -> Result<()> {
    let store = check_status(secrets.mongodb_uri.as_ref(), &config.store.database_name).await;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": data_dir.display().to_string(),
            "model": config.upstream.model,
            "image_model": config.upstream.image_model,
            "credentials": {
                "gemini_api_key": is_set(&secrets.gemini_api_key),
                "mongodb_uri": is_set(&secrets.mongodb_uri),
                "identity_provider": secrets.has_identity_provider(),
                "session_secret": is_set(&secrets.session_secret),
            },
            "mongodb": store,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let check_mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!("  {} SquidAI v{}", style("🦑").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Credentials ──").dim());
    println!("  {} GEMINI_API_KEY", check_mark(is_set(&secrets.gemini_api_key)));
    println!("  {} MONGODB_URI", check_mark(is_set(&secrets.mongodb_uri)));
    println!(
        "  {} GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET",
        check_mark(secrets.has_identity_provider())
    );
    println!("  {} SESSION_SECRET", check_mark(is_set(&secrets.session_secret)));
    println!();

    println!("  {}", style("── MongoDB ──").dim());
    if store.ok {
        println!(
            "  {} {}",
            check_mark(true),
            store.message.as_deref().unwrap_or("Connected")
        );
    } else {
        println!(
            "  {} {}",
            check_mark(false),
            store.error.as_deref().unwrap_or("Unavailable")
        );
        if let Some(fix) = &store.fix {
            println!("    {}", style(fix).yellow());
        }
        println!(
            "    {}",
            style("Sessions fall back to the local store.").dim()
        );
    }
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Model:    {}", style(&config.upstream.model).cyan());
    println!("  Data dir: {}", style(data_dir.display()).dim());
    println!();

    Ok(())
}
