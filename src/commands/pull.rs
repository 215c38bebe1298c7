use crate::commands::{display_path, open_engine, report_errors};
use crate::core::{
    error::{AssetStateError, Result},
    output::{print_json, print_section_header, print_success},
};
use std::collections::HashMap;

/// Rebase the current branch onto its upstream.
///
/// The remote check runs first so new editor binaries on the upstream refuse the pull.
pub fn execute_pull(json: bool) -> Result<()> {
    let engine = open_engine()?;
    let mut errors = Vec::new();
    engine.check_remote(&mut HashMap::new(), &mut errors);
    report_errors(&errors);

    let outcome = engine.pull_origin(&[])?;

    if json {
        return print_json(&outcome.output);
    }

    if !outcome.output.success {
        return Err(AssetStateError::command_failed("pull", &outcome.output.errors));
    }
    if outcome.updated_files.is_empty() {
        print_success("Already up to date");
        println!();
        return Ok(());
    }

    print_section_header("Updated");
    for file in &outcome.updated_files {
        println!("  {}", display_path(&engine, file));
    }
    print_success(&format!("Pulled {} file(s)", outcome.updated_files.len()));
    println!();
    Ok(())
}
