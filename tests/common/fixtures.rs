//! Predefined repository scenarios

#![allow(dead_code)]

use super::repository::*;
use git_asset_state::core::error::Result;

/// Committed assets, then one modified, one deleted, one new
pub fn create_changed_asset_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;

    create_file(&repo.path, "Content/Hero.uasset", "hero v1\n")?;
    create_file(&repo.path, "Content/Maps/Main.umap", "map v1\n")?;
    create_file(&repo.path, "Content/Old.uasset", "old\n")?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Add assets")?;

    create_file(&repo.path, "Content/Hero.uasset", "hero v2\n")?;
    remove_file(&repo.path, "Content/Old.uasset")?;
    create_file(&repo.path, "Content/New.uasset", "new\n")?;

    Ok(repo)
}

/// An asset with two revisions
pub fn create_asset_history_repo() -> Result<TestRepo> {
    let repo = setup_test_repo_with_asset()?;
    create_file(&repo.path, "Content/Hero.uasset", "hero v2\n")?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Rework hero")?;
    Ok(repo)
}

/// The teammate pushes a new revision of the hero; `repo` has fetched but not pulled
pub fn create_behind_upstream_repo() -> Result<TestRepo> {
    let repo = setup_test_repo_with_asset()?;
    let teammate = setup_remote_and_teammate(&repo)?;

    create_file(&teammate, "Content/Hero.uasset", "hero from teammate\n")?;
    git_add(&teammate, ".")?;
    git_commit(&teammate, "Teammate hero")?;
    git(&teammate, &["push", "--quiet"])?;

    git(&repo.path, &["fetch", "--quiet"])?;
    Ok(repo)
}

/// The teammate pushes new editor binaries
pub fn create_binaries_behind_repo() -> Result<TestRepo> {
    let repo = setup_test_repo_with_asset()?;
    let teammate = setup_remote_and_teammate(&repo)?;

    create_file(&teammate, "Binaries/Win64/Game.dll", "binary\n")?;
    git_add(&teammate, ".")?;
    git_commit(&teammate, "Update binaries")?;
    git(&teammate, &["push", "--quiet"])?;

    git(&repo.path, &["fetch", "--quiet"])?;
    Ok(repo)
}
