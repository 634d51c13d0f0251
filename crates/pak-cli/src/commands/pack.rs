//! `pak pack` command implementation.

use super::{fail_with, finish, Context};
use miette::Result;
use pak_core::pkg::PackOptions;

/// Pack a workspace. The tarball path ends up in `result.stdout`.
pub async fn run(ctx: &Context, options: &PackOptions) -> Result<()> {
    // Workspace and target dir are relative to where pak was invoked
    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };
    let result = manager.pack(options).await;

    if !ctx.json && result.success {
        println!("Tarball: {}", result.stdout);
    }
    finish(ctx, manager.as_ref(), &result)
}
