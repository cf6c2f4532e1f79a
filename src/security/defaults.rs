/// Read-only diagnostic commands a remote caller may run. Fixed at process
/// start, never mutated at runtime. `top` carries an extra restriction: only
/// the non-interactive `top -bn1` form is permitted (see `policy::command`).
#[must_use]
pub fn default_allowed_commands() -> Vec<String> {
    vec![
        "ls".into(),
        "pwd".into(),
        "tree".into(),
        "cat".into(),
        "head".into(),
        "tail".into(),
        "df".into(),
        "free".into(),
        "nvidia-smi".into(),
        "ps".into(),
        "du".into(),
        "wc".into(),
        "top".into(),
    ]
}
