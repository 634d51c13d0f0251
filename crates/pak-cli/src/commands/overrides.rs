//! `pak override` command implementation.

use super::{codes, fail, fail_with, finish, Context};
use miette::Result;
use std::collections::BTreeMap;
use tracing::info;

/// Force each `name@version` everywhere in the tree and reinstall.
pub async fn run(ctx: &Context, specs: &[String]) -> Result<()> {
    let dependencies = match parse_specs(specs) {
        Ok(dependencies) => dependencies,
        Err(message) => fail(ctx.json, codes::INVALID_ARGUMENT, &message),
    };

    let manager = match ctx.manager(false).await {
        Ok(manager) => manager,
        Err(e) => fail_with(ctx.json, &e),
    };
    info!(manager = %manager.kind(), count = dependencies.len(), "overriding dependencies");
    let result = manager.override_dependencies(&dependencies).await;
    finish(ctx, manager.as_ref(), &result)
}

/// Split `name@version` pairs. The leading `@` of a scope is part of the name.
fn parse_specs(specs: &[String]) -> Result<BTreeMap<String, String>, String> {
    let mut dependencies = BTreeMap::new();
    for spec in specs {
        let split = spec
            .rfind('@')
            .filter(|&at| at > 0)
            .map(|at| (&spec[..at], &spec[at + 1..]));
        match split {
            Some((name, version)) if !version.is_empty() => {
                dependencies.insert(name.to_string(), version.to_string());
            }
            _ => return Err(format!("invalid override '{spec}', expected NAME@VERSION")),
        }
    }
    Ok(dependencies)
}
