use crate::commands::{open_engine, report_errors};
use crate::core::{
    error::{AssetStateError, Result},
    output::{print_info, print_json, print_section_header},
};

/// Resolve which of `patterns` (`*.uasset`) carry the `lockable` attribute
pub fn execute_lockable(patterns: Vec<String>, json: bool) -> Result<()> {
    let engine = open_engine()?;
    let extensions = engine
        .check_lfs_lockable(&patterns)
        .map_err(|errors| {
            report_errors(&errors);
            AssetStateError::command_failed("check-attr", &errors)
        })?;

    if json {
        return print_json(&extensions);
    }

    if extensions.is_empty() {
        print_info("None of the patterns are lockable");
        return Ok(());
    }

    print_section_header("Lockable types");
    for extension in &extensions {
        println!("  {extension}");
    }
    println!();

    Ok(())
}
