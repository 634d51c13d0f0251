//! `pak detect` command implementation.

use super::{fail_with, Context};
use miette::Result;

/// Report which package manager is in charge and where its root is.
pub async fn run(ctx: &Context) -> Result<()> {
    let manager = match ctx.manager(true).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "manager": manager.kind().as_str(),
                "root": manager.cwd().to_string_lossy(),
            })
        );
    } else {
        println!("{} ({})", manager.kind(), manager.cwd().display());
    }
    Ok(())
}
