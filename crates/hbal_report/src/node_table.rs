//! Node table renderer (`--print-nodes[=FIELDS]` / `-p`).
//!
//! The default column set mirrors the fields balancing actually cares about:
//! identity, memory/disk/cpu capacity and headroom, the N+1 flag, and the
//! instance counts that drive it. A leading `+` on the field list extends
//! this default set rather than replacing it, matching the CLI flag's
//! documented behaviour.

use hbal_core::Node;

pub const DEFAULT_FIELDS: &[&str] =
    &["name", "t_mem", "f_mem", "r_mem", "p_mem", "t_dsk", "f_dsk", "p_dsk", "t_cpu", "p_cpu", "pcnt", "scnt", "flags"];

/// Parse a `--print-nodes` argument: a bare list replaces the defaults, a
/// `+`-prefixed list appends to them.
pub fn parse_fields(spec: &str) -> Vec<String> {
    if let Some(rest) = spec.strip_prefix('+') {
        let mut fields: Vec<String> = DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect();
        fields.extend(rest.split(',').map(|s| s.to_string()));
        fields
    } else {
        spec.split(',').map(|s| s.to_string()).collect()
    }
}

fn field_value(n: &Node, field: &str) -> String {
    match field {
        "name" => n.alias.clone(),
        "fqdn" => n.name.clone(),
        "group" => n.group.to_string(),
        "t_mem" => n.t_mem.to_string(),
        "f_mem" => n.f_mem.to_string(),
        "r_mem" => n.r_mem.to_string(),
        "x_mem" => n.x_mem.to_string(),
        "p_mem" => percent(n.p_mem, n.t_mem),
        "t_dsk" => n.t_dsk.to_string(),
        "f_dsk" => n.f_dsk.to_string(),
        "p_dsk" => percent(n.p_dsk, n.t_dsk),
        "t_cpu" => n.t_cpu.to_string(),
        "p_cpu" => ratio(n.p_cpu as u64, n.t_cpu as u64),
        "t_spindles" => n.t_spindles.to_string(),
        "f_spindles" => n.f_spindles.to_string(),
        "pcnt" => n.p_list.len().to_string(),
        "scnt" => n.s_list.len().to_string(),
        "tags" => n.tags.iter().cloned().collect::<Vec<_>>().join(","),
        "flags" => {
            let mut f = String::new();
            f.push(if n.offline { 'O' } else { '-' });
            f.push(if n.drained { 'D' } else { '-' });
            f.push(if n.fail_n1 { 'N' } else { '-' });
            f
        }
        other => format!("?{other}"),
    }
}

fn percent(part: u64, total: u64) -> String {
    if total == 0 {
        "0%".to_string()
    } else {
        format!("{}%", part.saturating_mul(100) / total)
    }
}

fn ratio(part: u64, total: u64) -> String {
    if total == 0 {
        "0.00".to_string()
    } else {
        format!("{}.{:02}", part * 100 / total / 100, part * 100 / total % 100)
    }
}

/// Render the node table over `nodes` (already in display order) with the
/// given field list.
pub fn render<'a>(nodes: impl Iterator<Item = &'a Node>, fields: &[String]) -> String {
    let headers: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
    let rows: Vec<Vec<String>> =
        nodes.map(|n| fields.iter().map(|f| field_value(n, f)).collect()).collect();
    crate::table::render(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn node() -> Node {
        let mut n =
            Node::create("n1.example.com".into(), 32762, 1024, 16381, 1861, 1861, 4, false, 0, 8, BTreeSet::new(), 8);
        n.idx = 0;
        n.alias = "n1".into();
        n
    }

    #[test]
    fn plus_prefixed_fields_extend_the_defaults() {
        let fields = parse_fields("+tags");
        assert_eq!(fields.len(), DEFAULT_FIELDS.len() + 1);
        assert_eq!(fields.last().unwrap(), "tags");
    }

    #[test]
    fn bare_fields_replace_the_defaults() {
        let fields = parse_fields("name,t_mem");
        assert_eq!(fields, vec!["name".to_string(), "t_mem".to_string()]);
    }

    #[test]
    fn render_includes_the_node_alias() {
        let n = node();
        let fields: Vec<String> = vec!["name".into(), "t_mem".into()];
        let out = render(std::iter::once(&n), &fields);
        assert!(out.contains("n1"));
        assert!(out.contains("32762"));
    }
}
