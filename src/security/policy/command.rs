use super::SecurityPolicy;
use super::types::Verdict;

/// Shell metacharacter patterns that would let a whitelisted command smuggle
/// a second, arbitrary one. Scanned against the raw, unsplit command string
/// in this order; the first match denies. Whitelisting the leaf command never
/// exempts its arguments from this scan.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    ("|", "pipe"),
    (">", "output redirection"),
    ("<", "input redirection"),
    ("&&", "command chaining"),
    ("||", "command chaining"),
    (";", "command separator"),
    ("$(", "command substitution"),
    ("`", "command substitution"),
    ("${", "variable expansion"),
];

/// The final path segment of a command's first token, so `/usr/bin/ls` and
/// `ls` are judged identically. The filter judges what runs, not how it was
/// spelled.
fn leaf_executable(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

impl SecurityPolicy {
    /// Check the leaf executable name against the whitelist.
    pub fn check_whitelist(&self, command: &str) -> Verdict {
        let tokens: Vec<&str> = command.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return Verdict::deny("empty command");
        };

        let leaf = leaf_executable(first);
        if !self.allowed_commands.iter().any(|allowed| allowed == leaf) {
            return Verdict::deny(format!(
                "command '{leaf}' is not whitelisted (permitted commands: {})",
                self.allowed_commands.join(", ")
            ));
        }

        // Interactive top would hang a request thread indefinitely. Only the
        // literal single-iteration batch form is accepted.
        if leaf == "top" && tokens[1..] != ["-bn1"] {
            return Verdict::deny("top is only permitted as exactly 'top -bn1'");
        }

        Verdict::Permitted
    }

    /// Scan the raw command string for shell metacharacters.
    pub fn check_injection(command: &str) -> Verdict {
        for (pattern, class) in DANGEROUS_PATTERNS {
            if command.contains(pattern) {
                return Verdict::deny(format!(
                    "dangerous pattern '{pattern}' detected ({class})"
                ));
            }
        }
        Verdict::Permitted
    }
}

#[cfg(test)]
mod tests {
    use super::super::SecurityPolicy;
    use super::*;

    fn policy() -> SecurityPolicy {
        SecurityPolicy::new(
            crate::security::default_allowed_commands(),
            vec!["/data".into()],
        )
        .expect("non-empty roots")
    }

    #[test]
    fn leaf_executable_strips_directory_prefix() {
        assert_eq!(leaf_executable("/usr/bin/ls"), "ls");
        assert_eq!(leaf_executable("./ls"), "ls");
        assert_eq!(leaf_executable("ls"), "ls");
    }

    #[test]
    fn whitelisted_commands_pass() {
        let policy = policy();
        assert!(policy.check_whitelist("ls -la").is_permitted());
        assert!(policy.check_whitelist("df -h").is_permitted());
        assert!(policy.check_whitelist("nvidia-smi").is_permitted());
    }

    #[test]
    fn absolute_spelling_is_judged_by_leaf_name() {
        let policy = policy();
        assert!(policy.check_whitelist("/usr/bin/ls -la").is_permitted());
        assert!(!policy.check_whitelist("/usr/bin/rm -rf /").is_permitted());
    }

    #[test]
    fn empty_command_is_denied() {
        let policy = policy();
        let verdict = policy.check_whitelist("");
        assert_eq!(verdict.reason(), Some("empty command"));
        assert!(!policy.check_whitelist("   \t ").is_permitted());
    }

    #[test]
    fn unlisted_command_denial_names_the_permitted_set() {
        let policy = policy();
        let verdict = policy.check_whitelist("rm -rf /");
        let reason = verdict.reason().unwrap();
        assert!(reason.contains("'rm'"));
        assert!(reason.contains("ls"));
        assert!(reason.contains("nvidia-smi"));
    }

    #[test]
    fn top_requires_exact_batch_form() {
        let policy = policy();
        assert!(policy.check_whitelist("top -bn1").is_permitted());
        assert!(!policy.check_whitelist("top").is_permitted());
        assert!(!policy.check_whitelist("top -b -n1").is_permitted());
        assert!(!policy.check_whitelist("top -bn1 -o %CPU").is_permitted());
    }

    #[test]
    fn injection_patterns_are_denied() {
        let cases = [
            "ls | grep x",
            "cat f > /tmp/out",
            "wc -l < f",
            "ls && rm -rf /",
            "ls ; rm -rf /",
            "cat $(find /)",
            "cat `whoami`",
            "cat ${HOME}/x",
        ];
        for command in cases {
            assert!(
                !SecurityPolicy::check_injection(command).is_permitted(),
                "should deny: {command}"
            );
        }
        // `||` contains `|`, so first-match order reports it as a pipe.
        let verdict = SecurityPolicy::check_injection("ls || true");
        assert!(verdict.reason().unwrap().contains("pipe"));
    }

    #[test]
    fn clean_commands_pass_injection_scan() {
        assert!(SecurityPolicy::check_injection("ls -la /data").is_permitted());
        assert!(SecurityPolicy::check_injection("du -sh /data/logs").is_permitted());
    }
}
