use crate::commands::{display_path, open_engine, report_errors};
use crate::core::{
    colors::get_remote_label,
    error::Result,
    output::{print_info, print_json, print_section_header, print_warning},
};
use std::collections::HashMap;

/// List lockable files that are newer on a watched branch
pub fn execute_remote(json: bool) -> Result<()> {
    let engine = open_engine()?;
    let mut errors = Vec::new();
    let report = engine.check_remote(&mut HashMap::new(), &mut errors);

    if json {
        return print_json(&report);
    }

    report_errors(&errors);
    if report.pending_restart {
        print_warning("Editor binaries changed upstream, restart required after the next pull");
    }
    if report.newer_files.is_empty() {
        print_info("All files are up to date with the watched branches");
        return Ok(());
    }

    let mut files: Vec<_> = report.newer_files.iter().collect();
    files.sort_by(|a, b| a.0.cmp(b.0));

    print_section_header("Newer on remote");
    for (path, remote) in files {
        println!("{}  {}", display_path(&engine, path), get_remote_label(remote));
    }
    println!();

    Ok(())
}
