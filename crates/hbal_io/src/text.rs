//! Textual cluster-state format: pipe-separated fields, blank-line-delimited
//! sections, in the fixed order groups / nodes / instances / cluster tags /
//! ipolicies.

use crate::errors::IoError;

const OWNER: &str = "--text-data";

fn split_pipe(line: &str) -> Vec<String> {
    line.split('|').map(|f| f.trim().to_string()).collect()
}

fn split_csv(field: &str) -> Vec<String> {
    if field.is_empty() {
        Vec::new()
    } else {
        field.split(',').map(|s| s.trim().to_string()).collect()
    }
}

fn join_csv(items: &[String]) -> String {
    items.join(",")
}

fn err(detail: impl Into<String>) -> IoError {
    IoError::Parse { owner: OWNER, detail: detail.into() }
}

fn field<'a>(fields: &'a [String], i: usize, line: &str) -> Result<&'a str, IoError> {
    fields
.get(i)
.map(String::as_str)
.ok_or_else(|| err(format!("line {line:?}: expected field {i}")))
}

fn parse_u64(s: &str, line: &str) -> Result<u64, IoError> {
    s.parse().map_err(|_| err(format!("line {line:?}: expected integer, got {s:?}")))
}

fn parse_i64(s: &str, line: &str) -> Result<i64, IoError> {
    s.parse().map_err(|_| err(format!("line {line:?}: expected integer, got {s:?}")))
}

fn parse_u32(s: &str, line: &str) -> Result<u32, IoError> {
    s.parse().map_err(|_| err(format!("line {line:?}: expected integer, got {s:?}")))
}

fn parse_f64(s: &str, line: &str) -> Result<f64, IoError> {
    s.parse().map_err(|_| err(format!("line {line:?}: expected number, got {s:?}")))
}

fn parse_bool_yn(s: &str, line: &str) -> Result<bool, IoError> {
    match s {
        "Y" | "y" => Ok(true),
        "N" | "n" => Ok(false),
        _ => Err(err(format!("line {line:?}: expected Y/N, got {s:?}"))),
    }
}

#[derive(Clone, Debug, Default)]
pub struct RawGroup {
    pub name: String,
    pub uuid: String,
    pub alloc_policy: String,
    pub tags: Vec<String>,
    pub networks: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RawNode {
    pub name: String,
    pub t_mem: u64,
    pub mem_node: u64,
    pub f_mem: i64,
    pub t_dsk: u64,
    pub f_dsk: i64,
    pub t_cpu: u32,
    pub offline_role: char,
    pub group_uuid: String,
    pub t_spindles: u32,
    pub tags: Vec<String>,
    pub excl_storage: bool,
    pub f_spindles: i64,
    pub n_vcpus: u32,
    pub cpu_speed: f64,
}

#[derive(Clone, Debug, Default)]
pub struct RawInstance {
    pub name: String,
    pub mem: u64,
    pub disk: u64,
    pub vcpus: u32,
    pub status: String,
    pub auto_balance: bool,
    pub pnode: String,
    pub snode: Option<String>,
    pub disk_template: String,
    pub tags: Vec<String>,
    pub spindle_use: u32,
    pub actual_spindles: u32,
}

#[derive(Clone, Debug, Default)]
pub struct RawISpec {
    pub cpu: u32,
    pub mem_mib: u64,
    pub disk_mib: u64,
    pub disk_count: u32,
    pub nic_count: u32,
    pub spindle_use: u32,
}

#[derive(Clone, Debug, Default)]
pub struct RawIPolicy {
    /// `"cluster"` for the cluster-wide default, a group name/uuid otherwise.
    pub owner: String,
    pub min: RawISpec,
    pub std: RawISpec,
    pub max: RawISpec,
    pub disk_templates: Vec<String>,
    pub vcpu_ratio: f64,
    pub spindle_ratio: f64,
}

#[derive(Clone, Debug, Default)]
pub struct RawCluster {
    pub groups: Vec<RawGroup>,
    pub nodes: Vec<RawNode>,
    pub instances: Vec<RawInstance>,
    pub cluster_tags: Vec<String>,
    pub ipolicies: Vec<RawIPolicy>,
}

fn parse_ispec(field: &str, line: &str) -> Result<RawISpec, IoError> {
    let parts: Vec<&str> = field.split(':').collect();
    if parts.len() != 6 {
        return Err(err(format!("line {line:?}: expected 6 colon-separated spec fields")));
    }
    Ok(RawISpec {
        cpu: parse_u32(parts[0], line)?,
        mem_mib: parse_u64(parts[1], line)?,
        disk_mib: parse_u64(parts[2], line)?,
        disk_count: parse_u32(parts[3], line)?,
        nic_count: parse_u32(parts[4], line)?,
        spindle_use: parse_u32(parts[5], line)?,
    })
}

fn format_ispec(s: &RawISpec) -> String {
    format!("{}:{}:{}:{}:{}:{}", s.cpu, s.mem_mib, s.disk_mib, s.disk_count, s.nic_count, s.spindle_use)
}

fn parse_group_line(line: &str) -> Result<RawGroup, IoError> {
    let f = split_pipe(line);
    Ok(RawGroup {
        name: field(&f, 0, line)?.to_string(),
        uuid: field(&f, 1, line)?.to_string(),
        alloc_policy: field(&f, 2, line)?.to_string(),
        tags: split_csv(field(&f, 3, line)?),
        networks: split_csv(field(&f, 4, line)?),
    })
}

fn format_group_line(g: &RawGroup) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        g.name, g.uuid, g.alloc_policy, join_csv(&g.tags), join_csv(&g.networks)
    )
}

fn parse_node_line(line: &str) -> Result<RawNode, IoError> {
    let f = split_pipe(line);
    let role = field(&f, 7, line)?;
    let role = role
.chars()
.next()
.ok_or_else(|| err(format!("line {line:?}: empty offline_role")))?;
    if !matches!(role, 'Y' | 'N' | 'M') {
        return Err(err(format!("line {line:?}: offline_role must be Y/N/M, got {role:?}")));
    }
    Ok(RawNode {
        name: field(&f, 0, line)?.to_string(),
        t_mem: parse_u64(field(&f, 1, line)?, line)?,
        mem_node: parse_u64(field(&f, 2, line)?, line)?,
        f_mem: parse_i64(field(&f, 3, line)?, line)?,
        t_dsk: parse_u64(field(&f, 4, line)?, line)?,
        f_dsk: parse_i64(field(&f, 5, line)?, line)?,
        t_cpu: parse_u32(field(&f, 6, line)?, line)?,
        offline_role: role,
        group_uuid: field(&f, 8, line)?.to_string(),
        t_spindles: parse_u32(field(&f, 9, line)?, line)?,
        tags: split_csv(field(&f, 10, line)?),
        excl_storage: parse_bool_yn(field(&f, 11, line)?, line)?,
        f_spindles: parse_i64(field(&f, 12, line)?, line)?,
        n_vcpus: parse_u32(field(&f, 13, line)?, line)?,
        cpu_speed: parse_f64(field(&f, 14, line)?, line)?,
    })
}

fn format_node_line(n: &RawNode) -> String {
    format!(
        "{} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {}",
        n.name,
        n.t_mem,
        n.mem_node,
        n.f_mem,
        n.t_dsk,
        n.f_dsk,
        n.t_cpu,
        n.offline_role,
        n.group_uuid,
        n.t_spindles,
        join_csv(&n.tags),
        if n.excl_storage { "Y" } else { "N" },
        n.f_spindles,
        n.n_vcpus,
        n.cpu_speed,
    )
}

fn parse_instance_line(line: &str) -> Result<RawInstance, IoError> {
    let f = split_pipe(line);
    let snode = field(&f, 7, line)?;
    Ok(RawInstance {
        name: field(&f, 0, line)?.to_string(),
        mem: parse_u64(field(&f, 1, line)?, line)?,
        disk: parse_u64(field(&f, 2, line)?, line)?,
        vcpus: parse_u32(field(&f, 3, line)?, line)?,
        status: field(&f, 4, line)?.to_string(),
        auto_balance: parse_bool_yn(field(&f, 5, line)?, line)?,
        pnode: field(&f, 6, line)?.to_string(),
        snode: if snode.is_empty() || snode == "-" { None } else { Some(snode.to_string()) },
        disk_template: field(&f, 8, line)?.to_string(),
        tags: split_csv(field(&f, 9, line)?),
        spindle_use: parse_u32(field(&f, 10, line)?, line)?,
        actual_spindles: parse_u32(field(&f, 11, line)?, line)?,
    })
}

fn format_instance_line(i: &RawInstance) -> String {
    format!(
        "{} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {}",
        i.name,
        i.mem,
        i.disk,
        i.vcpus,
        i.status,
        if i.auto_balance { "Y" } else { "N" },
        i.pnode,
        i.snode.as_deref().unwrap_or("-"),
        i.disk_template,
        join_csv(&i.tags),
        i.spindle_use,
        i.actual_spindles,
    )
}

fn parse_ipolicy_line(line: &str) -> Result<RawIPolicy, IoError> {
    let f = split_pipe(line);
    Ok(RawIPolicy {
        owner: field(&f, 0, line)?.to_string(),
        min: parse_ispec(field(&f, 1, line)?, line)?,
        std: parse_ispec(field(&f, 2, line)?, line)?,
        max: parse_ispec(field(&f, 3, line)?, line)?,
        disk_templates: split_csv(field(&f, 4, line)?),
        vcpu_ratio: parse_f64(field(&f, 5, line)?, line)?,
        spindle_ratio: parse_f64(field(&f, 6, line)?, line)?,
    })
}

fn format_ipolicy_line(p: &RawIPolicy) -> String {
    format!(
        "{} | {} | {} | {} | {} | {} | {}",
        p.owner,
        format_ispec(&p.min),
        format_ispec(&p.std),
        format_ispec(&p.max),
        join_csv(&p.disk_templates),
        p.vcpu_ratio,
        p.spindle_ratio,
    )
}

/// Split `input` into sections, opening a new section on every blank line
/// (so an empty section between two others is represented by two /// consecutive blank lines, not one).
fn split_sections(input: &str) -> Vec<Vec<&str>> {
    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
    for line in input.lines() {
        if line.trim().is_empty() {
            sections.push(Vec::new());
        } else {
            sections.last_mut().expect("always at least one section").push(line);
        }
    }
    sections
}

/// Parse the five-section textual cluster-state format.
pub fn parse_text(input: &str) -> Result<RawCluster, IoError> {
    let sections = split_sections(input.trim_end_matches('\n'));
    if sections.len() != 5 {
        return Err(err(format!(
            "expected 5 blank-line-delimited sections (groups/nodes/instances/tags/ipolicies), got {}",
            sections.len()
        )));
    }

    let groups = sections[0]
.iter()
.map(|l| parse_group_line(l))
.collect::<Result<Vec<_>, _>>()?;
    let nodes = sections[1]
.iter()
.map(|l| parse_node_line(l))
.collect::<Result<Vec<_>, _>>()?;
    let instances = sections[2]
.iter()
.map(|l| parse_instance_line(l))
.collect::<Result<Vec<_>, _>>()?;
    let cluster_tags = sections[3].iter().map(|l| l.to_string()).collect();
    let ipolicies = sections[4]
.iter()
.map(|l| parse_ipolicy_line(l))
.collect::<Result<Vec<_>, _>>()?;

    Ok(RawCluster { groups, nodes, instances, cluster_tags, ipolicies })
}

/// Serialize a `RawCluster` back to the textual format ("Persisted /// state"; round-trip, up to field ordering within a line).
pub fn serialize_text(c: &RawCluster) -> String {
    let groups: Vec<String> = c.groups.iter().map(format_group_line).collect();
    let nodes: Vec<String> = c.nodes.iter().map(format_node_line).collect();
    let instances: Vec<String> = c.instances.iter().map(format_instance_line).collect();
    let tags = c.cluster_tags.clone();
    let ipolicies: Vec<String> = c.ipolicies.iter().map(format_ipolicy_line).collect();

    [groups.join("\n"), nodes.join("\n"), instances.join("\n"), tags.join("\n"), ipolicies.join("\n")]
.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        [
            "default | uuid-g1 | preferred |  | ",
            "",
            "node1.example.com | 32762 | 1024 | 7280 | 1861 | 1026 | 4 | N | uuid-g1 | 8 |  | Y | 8 | 4 | 1.0",
            "node2.example.com | 32762 | 1024 | 7280 | 1861 | 1026 | 4 | N | uuid-g1 | 8 |  | Y | 8 | 4 | 1.0",
            "",
            "inst1 | 1024 | 100 | 1 | running | Y | node1.example.com | node2.example.com | drbd |  | 1 | 1",
            "inst2 | 1024 | 100 | 1 | running | Y | node2.example.com | node1.example.com | drbd |  | 1 | 1",
            "",
            "",
            "cluster | 1:128:1024:1:1:1 | 1:1024:10240:1:1:1 | 8:16384:102400:4:4:8 | drbd,plain | 4.0 | 1.0",
        ]
.join("\n")
    }

    #[test]
    fn parses_all_five_sections() {
        let raw = parse_text(&sample()).unwrap();
        assert_eq!(raw.groups.len(), 1);
        assert_eq!(raw.nodes.len(), 2);
        assert_eq!(raw.instances.len(), 2);
        assert_eq!(raw.cluster_tags.len(), 0);
        assert_eq!(raw.ipolicies.len(), 1);
        assert_eq!(raw.instances[0].snode.as_deref(), Some("node2.example.com"));
    }

    #[test]
    fn round_trips_through_serialize() {
        let raw = parse_text(&sample()).unwrap();
        let text = serialize_text(&raw);
        let raw2 = parse_text(&text).unwrap();
        assert_eq!(raw2.nodes.len(), raw.nodes.len());
        assert_eq!(raw2.instances[0].pnode, raw.instances[0].pnode);
    }

    #[test]
    fn rejects_bad_offline_role() {
        let bad = sample().replace(" N | uuid-g1", " X | uuid-g1");
        assert!(parse_text(&bad).is_err());
    }
}
