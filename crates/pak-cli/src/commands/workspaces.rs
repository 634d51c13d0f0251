//! `pak workspaces` command implementation.
//!
//! Lists the workspace package directories declared in the package.json of the
//! working directory.

use super::{fail, Context};
use miette::Result;
use pak_core::pkg::workspaces;

/// Run the workspaces command.
pub fn run(ctx: &Context) -> Result<()> {
    let dirs = match workspaces(&ctx.config.cwd) {
        Ok(dirs) => dirs,
        Err(e) => fail(ctx.json, e.code(), e.message()),
    };

    if ctx.json {
        let paths: Vec<_> = dirs.iter().map(|dir| dir.to_string_lossy()).collect();
        println!(
            "{}",
            serde_json::json!({ "ok": true, "workspaces": paths })
        );
    } else if dirs.is_empty() {
        println!("No workspaces configured.");
        println!("hint: Add a \"workspaces\" field to package.json");
    } else {
        for dir in &dirs {
            println!("{}", dir.display());
        }
    }
    Ok(())
}
