use crate::commands::{open_engine, report_errors};
use crate::core::{
    error::{AssetStateError, Result},
    output::{print_json, print_success},
};

pub fn execute_fetch(json: bool) -> Result<()> {
    let engine = open_engine()?;
    let mut errors = Vec::new();
    let output = engine.fetch_remote(&mut errors);

    if json {
        return print_json(&output);
    }

    report_errors(&errors);
    if !output.success {
        return Err(AssetStateError::command_failed("fetch", &output.errors));
    }
    print_success("Fetched");
    println!();
    Ok(())
}
