use crate::commands::{open_engine, report_errors, resolve_paths};
use crate::core::{
    error::Result,
    history::Revision,
    output::{print_info, print_json, print_section_header},
};
use colored::*;
use std::path::PathBuf;

/// Print the revisions touching `file`, newest first
pub fn execute_history(file: PathBuf, merge_conflict: bool, json: bool) -> Result<()> {
    let engine = open_engine()?;
    let file = resolve_paths(std::slice::from_ref(&file))?
        .into_iter()
        .next()
        .unwrap_or(file);

    let mut errors = Vec::new();
    let (success, revisions) = engine.run_get_history(&file, merge_conflict, &mut errors)?;
    if !success {
        log::warn!("History of {} is incomplete", file.display());
    }

    if json {
        return print_json(&revisions);
    }

    report_errors(&errors);
    if revisions.is_empty() {
        print_info("No history for this file");
        return Ok(());
    }

    print_section_header("History");
    for revision in &revisions {
        println!("{}", format_revision(revision));
    }
    println!();

    Ok(())
}

fn format_revision(revision: &Revision) -> String {
    let date = revision
        .date
        .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let action = revision
        .action
        .map(|action| action.to_string())
        .unwrap_or_default();
    let size = revision
        .file_size
        .map(|size| format!(" {size} B"))
        .unwrap_or_default();

    format!(
        "{} {} {} {} {}{}\n      {}",
        format!("#{:<4}", revision.revision_number).bright_black(),
        revision.short_commit_id.yellow(),
        date.bright_black(),
        revision.user_name.blue(),
        action,
        size.bright_black(),
        revision.description.white()
    )
}
