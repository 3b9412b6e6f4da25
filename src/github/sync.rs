//! Full snapshot sync of a working directory to a GitHub branch.

use super::client::GitHubClient;
use super::models::TreeEntry;
use super::snapshot::{collect_files, read_file_content};
use super::GitHubError;
use std::path::PathBuf;
use tracing::{debug, info};

/// What to sync and where to push it.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub commit_message: String,
    pub workspace_dir: PathBuf,
}

/// Result of one completed sync run. Transient, never persisted.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub commit_sha: String,
    pub files_synced: usize,
    pub seeded_readme: bool,
}

struct BaseCommit {
    commit_sha: String,
    tree_sha: String,
}

/// Push the entire workspace as a single new commit on the target branch.
///
/// Sequence: ensure the repository exists, resolve the branch tip (seeding an
/// empty repository with a README, or falling back to `master` when the branch
/// ref is missing), upload one blob per file, build a tree layered on the base
/// tree, commit, and move the branch ref. The first unrecoverable error aborts
/// the whole run; there are no retries.
pub async fn sync_repository(
    client: &GitHubClient,
    options: &SyncOptions,
) -> Result<SyncReport, GitHubError> {
    ensure_repository(client, options).await?;

    let (base, seeded_readme) = resolve_base(client, options).await?;

    let files = collect_files(&options.workspace_dir)?;
    info!(
        "Syncing {} files from {:?} to {}/{}@{}",
        files.len(),
        options.workspace_dir,
        options.owner,
        options.repo,
        options.branch
    );

    let mut entries = Vec::with_capacity(files.len());
    for rel_path in &files {
        let abs_path = options.workspace_dir.join(rel_path);
        let file = read_file_content(&abs_path, rel_path)?;
        let blob_sha = client
            .create_blob(&options.owner, &options.repo, file.content, file.encoding)
            .await?;
        debug!("Uploaded blob {} for {}", blob_sha, rel_path);
        entries.push(TreeEntry::blob(rel_path.clone(), blob_sha));
    }

    let tree_sha = client
        .create_tree(
            &options.owner,
            &options.repo,
            entries,
            base.as_ref().map(|b| b.tree_sha.clone()),
        )
        .await?;

    let parents = base.as_ref().map(|b| vec![b.commit_sha.clone()]).unwrap_or_default();
    let commit_sha = client
        .create_commit(
            &options.owner,
            &options.repo,
            &options.commit_message,
            &tree_sha,
            parents,
        )
        .await?;

    move_branch(client, options, &commit_sha).await?;

    info!("Synced to {}/{}: {}", options.owner, options.repo, commit_sha);
    Ok(SyncReport {
        commit_sha,
        files_synced: files.len(),
        seeded_readme,
    })
}

/// Confirm the target repository exists, creating it when the lookup 404s.
async fn ensure_repository(
    client: &GitHubClient,
    options: &SyncOptions,
) -> Result<(), GitHubError> {
    match client.get_repo(&options.owner, &options.repo).await {
        Ok(_) => {
            debug!("Repository {}/{} exists", options.owner, options.repo);
            Ok(())
        }
        Err(GitHubError::NotFound(_)) => {
            info!(
                "Repository {}/{} not found, creating it",
                options.owner, options.repo
            );
            client
                .create_user_repo(&options.repo, "Coming soon landing page")
                .await
                .map(|_| ())
        }
        Err(err) => Err(err),
    }
}

/// Resolve the commit the snapshot builds on.
///
/// Recovery is limited to two conditions: an empty repository is seeded with
/// a README initial commit, and a missing branch ref falls back to `master`
/// before seeding. Anything else is re-raised.
async fn resolve_base(
    client: &GitHubClient,
    options: &SyncOptions,
) -> Result<(Option<BaseCommit>, bool), GitHubError> {
    let branch_ref = format!("heads/{}", options.branch);

    match resolve_tip(client, options, &branch_ref).await {
        Ok(base) => Ok((Some(base), false)),
        Err(GitHubError::EmptyRepository) => {
            let base = seed_empty_repository(client, options).await?;
            Ok((Some(base), true))
        }
        Err(GitHubError::RefNotFound(_)) => {
            debug!("Ref {} missing, checking heads/master", branch_ref);
            match resolve_tip(client, options, "heads/master").await {
                Ok(base) => Ok((Some(base), false)),
                Err(GitHubError::EmptyRepository) | Err(GitHubError::RefNotFound(_)) => {
                    let base = seed_empty_repository(client, options).await?;
                    Ok((Some(base), true))
                }
                Err(err) => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

async fn resolve_tip(
    client: &GitHubClient,
    options: &SyncOptions,
    git_ref: &str,
) -> Result<BaseCommit, GitHubError> {
    let commit_sha = client
        .get_ref(&options.owner, &options.repo, git_ref)
        .await?;
    let commit = client
        .get_commit(&options.owner, &options.repo, &commit_sha)
        .await?;
    Ok(BaseCommit {
        commit_sha,
        tree_sha: commit.tree.sha,
    })
}

/// Seed an empty repository with an initial README commit.
///
/// The Contents API is the only write path that works before the first
/// commit exists; it also creates the target branch.
async fn seed_empty_repository(
    client: &GitHubClient,
    options: &SyncOptions,
) -> Result<BaseCommit, GitHubError> {
    info!("Repository is empty, initializing with a README");

    let readme = format!("# {}\n\nComing soon.\n", options.repo);
    let commit_sha = client
        .create_file(
            &options.owner,
            &options.repo,
            "README.md",
            "Initial commit: Add README",
            readme.as_bytes(),
            &options.branch,
        )
        .await?;

    let commit = client
        .get_commit(&options.owner, &options.repo, &commit_sha)
        .await?;
    Ok(BaseCommit {
        commit_sha,
        tree_sha: commit.tree.sha,
    })
}

/// Move the branch ref to the new commit, creating the ref when the branch
/// did not exist yet (the master-fallback path lands here).
async fn move_branch(
    client: &GitHubClient,
    options: &SyncOptions,
    commit_sha: &str,
) -> Result<(), GitHubError> {
    let branch_ref = format!("heads/{}", options.branch);
    match client
        .update_ref(&options.owner, &options.repo, &branch_ref, commit_sha)
        .await
    {
        Ok(()) => Ok(()),
        Err(GitHubError::RefNotFound(_)) => {
            debug!("Ref {} does not exist yet, creating it", branch_ref);
            client
                .create_ref(&options.owner, &options.repo, &branch_ref, commit_sha)
                .await
        }
        Err(err) => Err(err),
    }
}
