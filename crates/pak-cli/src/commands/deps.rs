//! `pak install`, `uninstall`, `update` and `rebuild`.
//!
//! Thin wrappers: resolve the adapter, run the operation, report the result.

use super::{fail_with, finish, Context};
use miette::Result;
use pak_core::pkg::{InstallOptions, UninstallOptions, UpdateOptions};
use tracing::info;

pub async fn install(ctx: &Context, packages: &[String], options: &InstallOptions) -> Result<()> {
    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };
    info!(manager = %manager.kind(), ?packages, "install");
    let result = manager.install(packages, options).await;
    finish(ctx, manager.as_ref(), &result)
}

pub async fn uninstall(
    ctx: &Context,
    packages: &[String],
    options: &UninstallOptions,
) -> Result<()> {
    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };
    info!(manager = %manager.kind(), ?packages, "uninstall");
    let result = manager.uninstall(packages, options).await;
    finish(ctx, manager.as_ref(), &result)
}

pub async fn update(ctx: &Context, packages: &[String], options: &UpdateOptions) -> Result<()> {
    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };
    info!(manager = %manager.kind(), ?packages, "update");
    let result = manager.update(packages, options).await;
    finish(ctx, manager.as_ref(), &result)
}

pub async fn rebuild(ctx: &Context, packages: &[String]) -> Result<()> {
    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };
    info!(manager = %manager.kind(), ?packages, "rebuild");
    let result = manager.rebuild(packages).await;
    finish(ctx, manager.as_ref(), &result)
}
