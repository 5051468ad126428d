//! Local branch checkouts of one remote repository.
//!
//! The store drives the `git` binary directly: checkouts are shallow,
//! single-branch clones under `{root}/{label}`, refreshed with
//! `git pull --rebase`. Reads are plain filesystem reads against the
//! working tree, so a pull in flight never exposes a half-written tree
//! beyond what git's own ref update allows.

use crate::errors::StoreError;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use url::Url;

/// Directory used when the default branch is cloned without an explicit
/// label.
const DEFAULT_CHECKOUT_DIR: &str = "origin";

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Clone `label` if no checkout exists yet. Idempotent: an existing
    /// checkout is returned as-is.
    async fn ensure_branch(&self, label: &str) -> Result<PathBuf, StoreError>;

    /// List all remote branches and ensure a checkout for each. Fails fast
    /// on the first branch that cannot be cloned.
    async fn init_all_branches(&self) -> Result<(), StoreError>;

    /// Fast-forward the checkout for `label` to the remote tip. A no-op
    /// when already up to date; a failed pull leaves the checkout intact.
    async fn pull(&self, label: &str) -> Result<(), StoreError>;

    /// Current HEAD commit of the checkout for `label`.
    async fn commit_hash(&self, label: &str) -> Result<String, StoreError>;

    /// Read a file from the working tree of `label`. A missing path is
    /// `StoreError::FileNotFound`, distinguished from other I/O errors.
    async fn read_file(&self, label: &str, relative_path: &str) -> Result<Vec<u8>, StoreError>;
}

pub struct GitStore {
    root: PathBuf,
    url: String,
    // url with userinfo stripped, safe for logs and error details
    safe_url: String,
}

impl GitStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        GitStore {
            root: root.into(),
            url: url.to_string(),
            safe_url: redact_userinfo(url),
        }
    }

    fn checkout_dir(&self, label: &str) -> Result<PathBuf, StoreError> {
        if !is_clean_relative(label) {
            return Err(StoreError::NotFound(label.to_string()));
        }
        Ok(self.root.join(label))
    }

    /// Replace any occurrence of the credentialed URL in git output before
    /// it lands in an error value.
    fn scrub(&self, detail: &str) -> String {
        if self.url == self.safe_url {
            detail.to_string()
        } else {
            detail.replace(&self.url, &self.safe_url)
        }
    }

    async fn list_remote_branches(&self) -> Result<Vec<String>, StoreError> {
        let output = Command::new("git")
            .args(["-c", "credential.helper=", "ls-remote", "--heads"])
            .arg(&self.url)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        if !output.status.success() {
            return Err(StoreError::ListRemote(self.scrub(&stderr_of(&output))));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut branches = Vec::new();
        for line in stdout.lines() {
            let Some((_, reference)) = line.split_once('\t') else {
                continue;
            };
            if let Some(branch) = reference.strip_prefix("refs/heads/") {
                branches.push(branch.to_string());
            }
        }
        Ok(branches)
    }
}

#[async_trait]
impl RepositoryStore for GitStore {
    async fn ensure_branch(&self, label: &str) -> Result<PathBuf, StoreError> {
        let dir = if label.is_empty() {
            DEFAULT_CHECKOUT_DIR
        } else {
            label
        };
        let target = self.checkout_dir(dir).map_err(|_| StoreError::Clone {
            branch: label.to_string(),
            detail: "invalid branch name".to_string(),
        })?;

        if path_exists(&target).await {
            return Ok(target);
        }
        tokio::fs::create_dir_all(&self.root).await?;

        let mut cmd = Command::new("git");
        cmd.arg("clone");
        if !label.is_empty() {
            cmd.args(["--branch", label]);
        }
        cmd.args(["--single-branch", "--depth=1"])
            .arg(&self.url)
            .arg(&target)
            .env("GIT_TERMINAL_PROMPT", "0");

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(StoreError::Clone {
                branch: label.to_string(),
                detail: self.scrub(&stderr_of(&output)),
            });
        }

        tracing::info!(branch = label, path = %target.display(), "cloned branch");
        Ok(target)
    }

    async fn init_all_branches(&self) -> Result<(), StoreError> {
        let branches = self.list_remote_branches().await?;
        tracing::info!(
            url = %self.safe_url,
            count = branches.len(),
            "initializing branch checkouts"
        );

        for branch in &branches {
            self.ensure_branch(branch).await?;
        }
        Ok(())
    }

    async fn pull(&self, label: &str) -> Result<(), StoreError> {
        let checkout = self.checkout_dir(label)?;
        if !path_exists(&checkout).await {
            return Err(StoreError::NotFound(label.to_string()));
        }

        let output = Command::new("git")
            .args(["pull", "--rebase"])
            .current_dir(&checkout)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        if !output.status.success() {
            return Err(StoreError::Sync {
                branch: label.to_string(),
                detail: self.scrub(&stderr_of(&output)),
            });
        }
        Ok(())
    }

    async fn commit_hash(&self, label: &str) -> Result<String, StoreError> {
        let checkout = self.checkout_dir(label)?;
        if !path_exists(&checkout).await {
            return Err(StoreError::NotFound(label.to_string()));
        }

        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&checkout)
            .output()
            .await?;

        if !output.status.success() {
            tracing::warn!(branch = label, detail = %stderr_of(&output), "rev-parse failed");
            return Err(StoreError::NotFound(label.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn read_file(&self, label: &str, relative_path: &str) -> Result<Vec<u8>, StoreError> {
        let checkout = self.checkout_dir(label)?;
        if !path_exists(&checkout).await {
            return Err(StoreError::NotFound(label.to_string()));
        }
        if !is_clean_relative(relative_path) {
            return Err(StoreError::FileNotFound(relative_path.to_string()));
        }

        match tokio::fs::read(checkout.join(relative_path)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::FileNotFound(relative_path.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Request paths and branch names must stay inside the checkout root:
/// every component has to be a normal path segment.
fn is_clean_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn redact_userinfo(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_in(dir: &Path, args: &[&str]) {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .expect("run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// Create a local origin repository with a `dev/` config directory on
    /// `main` and an extra `staging` branch; returns its file:// URL.
    fn init_origin(root: &Path) -> String {
        let origin = root.join("origin");
        std::fs::create_dir_all(origin.join("dev")).expect("create origin dirs");
        git_in(&origin, &["init", "-b", "main"]);
        git_in(&origin, &["config", "user.email", "dev@example.com"]);
        git_in(&origin, &["config", "user.name", "Dev"]);
        std::fs::write(origin.join("dev/myapp-dev.yaml"), "server:\n  port: 8080\n")
            .expect("write fixture");
        git_in(&origin, &["add", "."]);
        git_in(&origin, &["commit", "-m", "initial"]);
        git_in(&origin, &["branch", "staging"]);
        format!("file://{}", origin.display())
    }

    #[tokio::test]
    async fn ensure_branch_clones_once() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let store = GitStore::new(tmp.path().join("checkouts"), &url);

        let first = store.ensure_branch("main").await.expect("clone");
        assert!(first.join("dev/myapp-dev.yaml").exists());

        // A marker in the working tree survives the second call, so no
        // re-clone happened.
        std::fs::write(first.join("marker"), b"x").expect("write marker");
        let second = store.ensure_branch("main").await.expect("no-op");
        assert_eq!(first, second);
        assert!(second.join("marker").exists());
    }

    #[tokio::test]
    async fn ensure_branch_rejects_unknown_branch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let store = GitStore::new(tmp.path().join("checkouts"), &url);

        let err = store.ensure_branch("no-such-branch").await.unwrap_err();
        assert!(matches!(err, StoreError::Clone { .. }));
    }

    #[tokio::test]
    async fn init_all_branches_creates_every_checkout() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let checkouts = tmp.path().join("checkouts");
        let store = GitStore::new(&checkouts, &url);

        store.init_all_branches().await.expect("init");
        assert!(checkouts.join("main").exists());
        assert!(checkouts.join("staging").exists());
    }

    #[tokio::test]
    async fn pull_picks_up_new_commits() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let origin = tmp.path().join("origin");
        let store = GitStore::new(tmp.path().join("checkouts"), &url);
        store.ensure_branch("main").await.expect("clone");

        // Pull with nothing new is a no-op success.
        store.pull("main").await.expect("up-to-date pull");

        std::fs::write(origin.join("dev/application-dev.yaml"), "a: 1\n").expect("write");
        git_in(&origin, &["add", "."]);
        git_in(&origin, &["commit", "-m", "add application config"]);

        store.pull("main").await.expect("pull");
        let bytes = store
            .read_file("main", "dev/application-dev.yaml")
            .await
            .expect("read pulled file");
        assert_eq!(bytes, b"a: 1\n");
    }

    #[tokio::test]
    async fn pull_without_checkout_is_not_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let store = GitStore::new(tmp.path().join("checkouts"), &url);

        let err = store.pull("main").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn commit_hash_matches_origin_head() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let store = GitStore::new(tmp.path().join("checkouts"), &url);
        store.ensure_branch("main").await.expect("clone");

        let hash = store.commit_hash("main").await.expect("hash");
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn read_file_distinguishes_missing_file_from_missing_checkout() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let store = GitStore::new(tmp.path().join("checkouts"), &url);

        let err = store.read_file("main", "dev/myapp-dev.yaml").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.ensure_branch("main").await.expect("clone");
        let bytes = store
            .read_file("main", "dev/myapp-dev.yaml")
            .await
            .expect("read");
        assert!(!bytes.is_empty());

        let err = store.read_file("main", "dev/absent.yaml").await.unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn read_file_rejects_escaping_paths() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let url = init_origin(tmp.path());
        let store = GitStore::new(tmp.path().join("checkouts"), &url);
        store.ensure_branch("main").await.expect("clone");

        let err = store
            .read_file("main", "../origin/dev/myapp-dev.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));

        let err = store.read_file("..", "dev/myapp-dev.yaml").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn redacts_embedded_credentials() {
        let redacted = redact_userinfo("https://token-123@github.com/org/repo.git");
        assert_eq!(redacted, "https://github.com/org/repo.git");
        assert_eq!(redact_userinfo("not a url"), "not a url");
    }
}
