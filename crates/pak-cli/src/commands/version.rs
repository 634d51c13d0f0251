use miette::Result;
use pak_core::version::{version_string, VERSION};

pub fn run(json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({ "ok": true, "version": VERSION, "display": version_string() })
        );
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
