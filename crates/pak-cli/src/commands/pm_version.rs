//! `pak pm-version` command implementation.

use super::{fail_with, Context};
use miette::Result;

pub async fn run(ctx: &Context) -> Result<()> {
    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };

    match manager.version().await {
        Ok(version) if ctx.json => println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "manager": manager.kind().as_str(),
                "version": version,
            })
        ),
        Ok(version) => println!("{} {version}", manager.kind().program()),
        Err(e) => fail_with(ctx.json, &e),
    }
    Ok(())
}
