//! `pak root` command implementation.

use super::{fail_with, Context};
use miette::Result;
use pak_core::pkg::find_root;

/// Print the nearest directory holding a package.json (and `lockfile`, if given).
pub fn run(ctx: &Context, lockfile: Option<&str>) -> Result<()> {
    let root = match find_root(&ctx.config.cwd, lockfile) {
        Ok(root) => root,
        Err(e) => fail_with(ctx.json, &e),
    };

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({ "ok": true, "root": root.to_string_lossy() })
        );
    } else {
        println!("{}", root.display());
    }
    Ok(())
}
