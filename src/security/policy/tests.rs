use std::path::{Path, PathBuf};

use super::{SecurityPolicy, Verdict};
use crate::security::default_allowed_commands;

fn policy(roots: &[&str]) -> SecurityPolicy {
    SecurityPolicy::new(
        default_allowed_commands(),
        roots.iter().map(PathBuf::from).collect(),
    )
    .expect("non-empty roots")
}

#[test]
fn construction_refuses_empty_roots() {
    assert!(SecurityPolicy::new(default_allowed_commands(), vec![]).is_err());
}

#[test]
fn plain_whitelisted_command_is_permitted() {
    let policy = policy(&["/data"]);
    assert_eq!(policy.validate_command("ls -la /data", None), Verdict::Permitted);
    assert_eq!(policy.validate_command("free -m", None), Verdict::Permitted);
    assert_eq!(policy.validate_command("top -bn1", None), Verdict::Permitted);
}

#[test]
fn unlisted_command_is_denied_regardless_of_arguments() {
    let policy = policy(&["/data"]);
    assert!(!policy.validate_command("rm /data/file", None).is_permitted());
    assert!(!policy.validate_command("curl https://example.com", None).is_permitted());
}

#[test]
fn whitelisted_leaf_with_injection_is_denied() {
    let policy = policy(&["/data"]);
    assert!(!policy.validate_command("ls; rm -rf /", None).is_permitted());
    assert!(!policy.validate_command("cat /data/f | sh", None).is_permitted());
    assert!(!policy.validate_command("ls $(whoami)", None).is_permitted());
}

#[test]
fn out_of_sandbox_cwd_is_denied() {
    let policy = policy(&["/data"]);
    let verdict = policy.validate_command("ls", Some(Path::new("/etc")));
    assert!(!verdict.is_permitted());
    assert!(verdict.reason().unwrap().contains("/etc"));
}

#[test]
fn in_sandbox_cwd_is_permitted() {
    let policy = policy(&["/data"]);
    assert!(
        policy
            .validate_command("ls", Some(Path::new("/data/runs")))
            .is_permitted()
    );
}

#[test]
fn path_arguments_are_confined() {
    let policy = policy(&["/data"]);
    assert!(policy.validate_command("cat /data/logs/out.log", None).is_permitted());
    assert!(!policy.validate_command("cat /etc/passwd", None).is_permitted());
}

#[test]
fn relative_path_arguments_resolve_against_cwd() {
    let policy = policy(&["/data"]);
    assert!(
        policy
            .validate_command("cat ./out.log", Some(Path::new("/data/runs")))
            .is_permitted()
    );
    assert!(
        !policy
            .validate_command("cat ../../etc/passwd", Some(Path::new("/data/runs")))
            .is_permitted()
    );
}

#[test]
fn flags_are_not_treated_as_paths() {
    let policy = policy(&["/data"]);
    // `-h` and `--total` must not be confined even though policy roots
    // exclude the working directory.
    assert!(policy.validate_command("df -h --total", None).is_permitted());
}

#[test]
fn first_offending_argument_wins() {
    let policy = policy(&["/data"]);
    let verdict = policy.validate_command("du /etc/cron.d /root/.ssh", None);
    assert!(verdict.reason().unwrap().contains("/etc/cron.d"));
}

#[test]
fn smuggled_traversal_is_caught_after_normalization() {
    // `cat` is whitelisted and no dangerous character appears; only
    // lexical normalization of the argument exposes the escape.
    let policy = policy(&["/data"]);
    let verdict = policy.validate_command("cat /data/secrets/../../etc/passwd", None);
    assert!(!verdict.is_permitted());
    assert!(verdict.reason().unwrap().contains("/etc/passwd"));
}

#[test]
fn validation_order_reports_whitelist_before_injection() {
    let policy = policy(&["/data"]);
    let verdict = policy.validate_command("evil; ls", None);
    assert!(verdict.reason().unwrap().contains("not whitelisted"));
}
