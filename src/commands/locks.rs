use crate::commands::{display_path, open_engine, report_errors};
use crate::core::{
    error::Result,
    output::{print_info, print_json, print_section_header},
};
use colored::*;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct LockEntry {
    path: PathBuf,
    owner: String,
    mine: bool,
}

/// List every lock known to the server, from the cache unless `force`
pub fn execute_locks(force: bool, json: bool) -> Result<()> {
    let engine = open_engine()?;
    let mut errors = Vec::new();
    let locks = engine.get_all_locks(force, &mut errors);

    let mut entries: Vec<LockEntry> = locks
        .into_iter()
        .map(|(path, owner)| LockEntry {
            mine: owner == engine.operator(),
            path,
            owner,
        })
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    if json {
        return print_json(&entries);
    }

    report_errors(&errors);
    if entries.is_empty() {
        print_info("No locked files");
        return Ok(());
    }

    print_section_header("Locks");
    for entry in &entries {
        let owner = if entry.mine {
            format!("{} (you)", entry.owner).green()
        } else {
            entry.owner.red()
        };
        println!("{}  {}", display_path(&engine, &entry.path).white(), owner);
    }
    println!();

    Ok(())
}
