use crate::commands::{display_path, open_engine, report_errors, resolve_paths};
use crate::core::{
    colors::format_record,
    engine::Engine,
    error::Result,
    git,
    output::{print_field, print_info, print_json, print_section_header, print_warning},
    state::{FileState, FileStateRecord, RemoteStatus, TreeState},
};

/// Refresh and print the state of `paths`, or of the whole repository when empty
pub fn execute_status(paths: Vec<std::path::PathBuf>, json: bool) -> Result<()> {
    let engine = open_engine()?;
    let files = if paths.is_empty() {
        vec![engine.repo_root().to_path_buf()]
    } else {
        resolve_paths(&paths)?
    };

    let mut errors = Vec::new();
    engine.begin_pass();
    let records = engine.refresh(&files, false, &mut errors);

    if json {
        return print_json(&records);
    }

    print_header(&engine);
    report_errors(&errors);
    if engine.pending_restart() {
        print_warning("Editor binaries changed upstream, restart required after the next pull");
    }

    let shown: Vec<&FileStateRecord> = records
        .iter()
        .filter(|record| is_interesting(record) || !paths.is_empty())
        .collect();
    if shown.is_empty() {
        print_info("Nothing to report, working tree clean");
        return Ok(());
    }

    print_section_header("Files");
    for record in shown {
        println!("{}", format_record(record, &display_path(&engine, &record.path)));
    }
    println!();

    Ok(())
}

/// Clean, unlocked, up to date files are left out of the repository-wide listing
fn is_interesting(record: &FileStateRecord) -> bool {
    let clean = record.file_state == FileState::Unknown
        && matches!(record.tree_state, TreeState::Unmodified | TreeState::NotInRepo);
    !clean || record.lock.user().is_some() || record.remote != RemoteStatus::UpToDate
}

fn print_header(engine: &Engine) {
    let branch = git::get_branch_name(engine.runner()).unwrap_or_else(|_| "-none-".to_string());
    let upstream = git::get_remote_branch_name(engine.runner()).ok();
    let branch_line = match upstream {
        Some(upstream) => format!("{branch} -> {upstream}"),
        None => branch,
    };

    println!();
    print_field("Branch", &branch_line);
    match git::get_commit_info(engine.runner()) {
        Ok((hash, subject)) if !hash.is_empty() => {
            let short: String = hash.chars().take(8).collect();
            print_field("Parent", &format!("{short} {subject}"));
        }
        _ => print_field("Parent", "- no commits yet -"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::LockStatus;

    #[test]
    fn test_clean_files_are_hidden() {
        let mut record = FileStateRecord::new("/project/Content/A.uasset");
        record.tree_state = TreeState::Unmodified;
        assert!(!is_interesting(&record));

        record.lock = LockStatus::LockedOther("bob".to_string());
        assert!(is_interesting(&record));
    }

    #[test]
    fn test_changed_and_divergent_files_are_shown() {
        let mut record = FileStateRecord::new("/project/Content/A.uasset");
        record.file_state = FileState::Modified;
        record.tree_state = TreeState::Working;
        assert!(is_interesting(&record));

        let mut record = FileStateRecord::new("/project/Content/B.uasset");
        record.tree_state = TreeState::Unmodified;
        record.remote = RemoteStatus::NotAtHead("origin/main".to_string());
        assert!(is_interesting(&record));
    }
}
