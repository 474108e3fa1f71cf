use std::{fs, path::Path, process::Command as StdCommand};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ORIGIN: &str = "git@github.com:acme/widgets.git";

struct Sandbox {
    home: TempDir,
    repo: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let home = TempDir::new().expect("create home dir");
        let repo = TempDir::new().expect("create repo dir");
        git(repo.path(), &["init", "--quiet"]);
        git(repo.path(), &["remote", "add", "origin", ORIGIN]);
        Self { home, repo }
    }

    fn ssh_config(&self) -> std::path::PathBuf {
        self.home.path().join(".ssh").join("config")
    }

    fn gitx(&self, dir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("gitx").expect("gitx binary");
        cmd.current_dir(dir)
            .env("HOME", self.home.path())
            .env("GITX_HOME", self.home.path().join("gitx"))
            .env("GITX_SSH_CONFIG", self.ssh_config())
            .env("GITX_BACKUP_KEEP", "2")
            .env("GITX_SSH_CHECK", "0")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn in_repo(&self) -> Command {
        self.gitx(self.repo.path())
    }

    fn add_work(&self) {
        self.in_repo()
            .args(["add", "work", "Work Dev", "work@example.com", "work-dev"])
            .assert()
            .success()
            .stdout(predicate::str::contains("identity added: work"));
    }

    fn remote(&self) -> String {
        let output = StdCommand::new("git")
            .arg("-C")
            .arg(self.repo.path())
            .args(["remote", "get-url", "origin"])
            .output()
            .expect("run git");
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }
}

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn add_then_list_shows_identity() {
    let sandbox = Sandbox::new();
    sandbox.add_work();

    sandbox
        .in_repo()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("work").and(predicate::str::contains("work@example.com")));
}

#[test]
fn warnings_go_to_stderr() {
    let sandbox = Sandbox::new();

    sandbox
        .in_repo()
        .args(["add", "work", "Work Dev", "work@example.com", "work-dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("identity added: work"))
        .stdout(predicate::str::contains("warning").not())
        .stderr(predicate::str::contains("warning: no private key at"));
}

#[test]
fn duplicate_alias_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.add_work();

    sandbox
        .in_repo()
        .args(["add", "work", "Other", "other@example.com", "other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn bind_rewrites_remote_and_ssh_config() {
    let sandbox = Sandbox::new();
    sandbox.add_work();

    sandbox
        .in_repo()
        .args(["bind", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repository bound to identity: work"));

    assert_eq!(sandbox.remote(), "git@github.com-work:acme/widgets.git");

    let config = fs::read_to_string(sandbox.ssh_config()).unwrap();
    assert!(config.contains("# BEGIN gitx managed"));
    assert!(config.contains("Host github.com-work"));
    assert!(config.contains("# END gitx managed"));

    sandbox
        .in_repo()
        .arg("status")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("bound to: work")
                .and(predicate::str::contains("work@example.com")),
        );
}

#[test]
fn bind_twice_leaves_ssh_config_untouched() {
    let sandbox = Sandbox::new();
    sandbox.add_work();

    sandbox.in_repo().args(["bind", "work"]).assert().success();
    let first = fs::read_to_string(sandbox.ssh_config()).unwrap();

    sandbox
        .in_repo()
        .args(["bind", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ssh config updated").not());

    assert_eq!(fs::read_to_string(sandbox.ssh_config()).unwrap(), first);
}

#[test]
fn bind_dry_run_changes_nothing() {
    let sandbox = Sandbox::new();
    sandbox.add_work();

    sandbox
        .in_repo()
        .args(["bind", "work", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry run]"));

    assert_eq!(sandbox.remote(), ORIGIN);
    assert!(!sandbox.ssh_config().exists());
}

#[test]
fn unbind_restores_remote() {
    let sandbox = Sandbox::new();
    sandbox.add_work();
    sandbox.in_repo().args(["bind", "work"]).assert().success();

    sandbox
        .in_repo()
        .arg("unbind")
        .assert()
        .success()
        .stdout(predicate::str::contains("repository unbound"));

    assert_eq!(sandbox.remote(), ORIGIN);
    sandbox
        .in_repo()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not bound to any identity"));
}

#[test]
fn remove_last_identity_drops_managed_block() {
    let sandbox = Sandbox::new();
    sandbox.add_work();
    sandbox.in_repo().args(["bind", "work"]).assert().success();

    sandbox
        .in_repo()
        .args(["remove", "work", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("identity removed: work"));

    let config = fs::read_to_string(sandbox.ssh_config()).unwrap();
    assert!(!config.contains("gitx managed"));

    sandbox
        .in_repo()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no identities configured"));
}

#[test]
fn remove_keeps_foreign_ssh_config() {
    let sandbox = Sandbox::new();
    let foreign = "Host bitbucket.org\n  User git\n";
    fs::create_dir_all(sandbox.ssh_config().parent().unwrap()).unwrap();
    fs::write(sandbox.ssh_config(), foreign).unwrap();

    sandbox.add_work();
    sandbox.in_repo().args(["bind", "work"]).assert().success();
    sandbox
        .in_repo()
        .args(["remove", "work", "--force"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(sandbox.ssh_config()).unwrap(), foreign);
}

#[test]
fn status_outside_repository_fails() {
    let sandbox = Sandbox::new();
    let outside = TempDir::new().unwrap();

    sandbox
        .gitx(outside.path())
        .env("GIT_CEILING_DIRECTORIES", outside.path().parent().unwrap())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn bind_unknown_identity_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .in_repo()
        .args(["bind", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("identity not found: 'ghost'"));

    assert_eq!(sandbox.remote(), ORIGIN);
}
