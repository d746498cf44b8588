//! Common DNS suffix computation , used by the Loader to derive
//! display aliases.

/// The longest string that begins with `.` and is a suffix of every name in
/// `names`. Returns `""` when no such suffix exists (e.g. fewer than two /// distinct labels share one, or the input is empty).
pub fn common_dns_suffix<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut names = names.into_iter();
    let first = match names.next() {
        Some(n) => n,
        None => return String::new(),
    };

    // Candidate suffixes of `first` that start with '.', longest first.
    let dot_positions: Vec<usize> = first
.char_indices()
.filter(|(_, c)| *c == '.')
.map(|(i, _)| i)
.collect();

    let rest: Vec<&str> = names.collect();

    for &pos in dot_positions.iter() {
        let candidate = &first[pos..];
        if rest.iter().all(|n| n.ends_with(candidate)) {
            return candidate.to_string();
        }
    }
    String::new()
}

/// Strip `suffix` from `name` if present; otherwise return `name` unchanged.
pub fn strip_suffix<'a>(name: &'a str, suffix: &str) -> &'a str {
    if !suffix.is_empty() {
        name.strip_suffix(suffix).unwrap_or(name)
    } else {
        name
    }
}
