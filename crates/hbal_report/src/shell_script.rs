//! Machine-readable shell-script renderer (`--print-commands[=FILE]` / //! `-C`): one `gnt-instance` command per move, jobsets separated by a
//! literal `echo step <n>` line. This crate only generates text — running
//! the script is left entirely to the operator.

use hbal_core::{ClusterData, Idx, Move, Placement};
use hbal_pipeline::jobsets::group_into_jobsets;

fn node_name(cluster: &ClusterData, idx: Idx) -> String {
    cluster.nodes.find(idx).map(|n| n.name.clone()).unwrap_or_else(|| format!("#{idx}"))
}

fn commands_for(cluster: &ClusterData, p: &Placement) -> Vec<String> {
    let inst = cluster
.instances
.find(p.instance_idx)
.map(|i| i.name.clone())
.unwrap_or_else(|| format!("#{}", p.instance_idx));

    match p.mv {
        Move::Failover => vec![format!("gnt-instance failover -f {inst}")],
        Move::FailoverToAny(n) => {
            vec![format!("gnt-instance failover -f --target-node={} {inst}", node_name(cluster, n))]
        }
        Move::ReplaceSecondary(n) => {
            vec![format!("gnt-instance replace-disks -n {} {inst}", node_name(cluster, n))]
        }
        Move::ReplacePrimary(n) => vec![
            format!("gnt-instance failover -f {inst}"),
            format!("gnt-instance replace-disks -n {} {inst}", node_name(cluster, n)),
            format!("gnt-instance failover -f {inst}"),
        ],
        Move::ReplaceAndFailover(n) => vec![
            format!("gnt-instance replace-disks -n {} {inst}", node_name(cluster, n)),
            format!("gnt-instance failover -f {inst}"),
        ],
        Move::FailoverAndReplace(n) => vec![
            format!("gnt-instance failover -f {inst}"),
            format!("gnt-instance replace-disks -n {} {inst}", node_name(cluster, n)),
        ],
    }
}

/// Render `placements` as a shell script, grouping node-disjoint prefixes
/// into jobsets  separated by an `echo step <n>` line so a human
/// watching the script run can tell which moves could have run in parallel.
pub fn render(cluster: &ClusterData, placements: &[Placement]) -> String {
    let jobsets = group_into_jobsets(placements);
    let mut out = String::from("#!/bin/sh\nset -e\n");
    for (step, jobset) in jobsets.iter().enumerate() {
        out.push_str(&format!("echo step {step}\n"));
        for placement in jobset {
            for cmd in commands_for(cluster, placement) {
                out.push_str(&cmd);
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::container::Container;
    use hbal_core::instance::RunStatus;
    use hbal_core::units::{DiskTemplate, DynUtil, IPolicy, ISpec, RSpec};
    use hbal_core::{Instance, Node};
    use std::collections::BTreeSet;

    fn cluster() -> ClusterData {
        let mut nodes = Container::empty();
        for i in 0..3 {
            let mut n =
                Node::create(format!("n{i}"), 32762, 1024, 32762, 1861, 1861, 4, false, 0, 8, BTreeSet::new(), 8);
            n.idx = i;
            nodes.add(n);
        }
        let mut instances = Container::empty();
        for i in 0..2 {
            let mut inst = Instance::create(
                format!("i{i}"), 1024, 100, 1, 1, Some(0), None, DiskTemplate::Plain,
                RunStatus::Running, true, BTreeSet::new(), DynUtil::zero(),
            );
            inst.idx = i;
            instances.add(inst);
        }
        let spec = ISpec::new(RSpec::new(1, 128, 1024), 1, 1, 1);
        let max = ISpec::new(RSpec::new(8, 16384, 102400), 4, 4, 8);
        let policy = IPolicy::new(spec, spec, max, vec![DiskTemplate::Plain], 4.0, 1.0).unwrap();
        ClusterData::new(Container::empty(), nodes, instances, vec![], policy)
    }

    #[test]
    fn disjoint_placements_land_in_one_step() {
        let cluster = cluster();
        let placements = vec![
            Placement::new(0, 1, None, Move::Failover, 0.5),
            Placement::new(1, 2, None, Move::Failover, 0.3),
        ];
        let out = render(&cluster, &placements);
        assert_eq!(out.matches("echo step").count(), 1);
        assert!(out.contains("i0"));
        assert!(out.contains("i1"));
    }

    #[test]
    fn overlapping_placements_split_into_two_steps() {
        let cluster = cluster();
        let placements = vec![
            Placement::new(0, 1, None, Move::Failover, 0.5),
            Placement::new(1, 1, None, Move::Failover, 0.3),
        ];
        let out = render(&cluster, &placements);
        assert_eq!(out.matches("echo step").count(), 2);
    }

    #[test]
    fn replace_primary_expands_to_the_failover_replace_failover_sequence() {
        let cluster = cluster();
        let placements = vec![Placement::new(0, 0, Some(1), Move::ReplacePrimary(2), 0.1)];
        let out = render(&cluster, &placements);
        assert_eq!(out.matches("gnt-instance failover").count(), 2);
        assert_eq!(out.matches("gnt-instance replace-disks").count(), 1);
    }
}
