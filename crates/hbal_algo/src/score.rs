//! Cluster score : a weighted sum of standard deviations and penalty
//! counts over the node list. Pure function `Cluster -> f64`.

use hbal_core::ClusterData;

/// Population standard deviation of `xs` (sample size in the denominator, /// matching the reference tool's `stddev`).
fn sigma(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n == 0 {
        return 0.0;
    }
    let mean = xs.iter().sum::<f64>() / n as f64;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    var.sqrt()
}

/// The cluster score. Lower is better; a balanced, N+1-safe cluster
/// with no offline instances scores close to zero.
pub fn compute_score(cluster: &ClusterData) -> f64 {
    let nodes = cluster.scoring_nodes();

    let free_mem_ratio: Vec<f64> = nodes
.iter()
.map(|n| if n.t_mem == 0 { 0.0 } else { n.f_mem as f64 / n.t_mem as f64 })
.collect();
    let reserved_mem_ratio: Vec<f64> = nodes
.iter()
.map(|n| if n.t_mem == 0 { 0.0 } else { n.r_mem as f64 / n.t_mem as f64 })
.collect();
    let free_disk_ratio: Vec<f64> = nodes
.iter()
.map(|n| if n.t_dsk == 0 { 0.0 } else { n.f_dsk as f64 / n.t_dsk as f64 })
.collect();
    let vcpu_ratio: Vec<f64> = nodes
.iter()
.map(|n| if n.t_cpu == 0 { 0.0 } else { n.p_cpu as f64 / n.t_cpu as f64 })
.collect();
    let spindle_ratio: Vec<f64> = nodes
.iter()
.map(|n| if n.t_spindles == 0 { 0.0 } else { n.p_spindles as f64 / n.t_spindles as f64 })
.collect();
    let cpu_load: Vec<f64> = nodes.iter().map(|n| n.u_load.cpu).collect();
    let mem_load: Vec<f64> = nodes.iter().map(|n| n.u_load.mem).collect();
    let disk_load: Vec<f64> = nodes.iter().map(|n| n.u_load.disk).collect();
    let net_load: Vec<f64> = nodes.iter().map(|n| n.u_load.net).collect();

    let n1_failures = nodes.iter().filter(|n| n.fail_n1).count() as f64;

    let offline_node_idx: std::collections::BTreeSet<i64> = cluster
.nodes
.elems()
.filter(|n| n.offline)
.map(|n| n.idx)
.collect();

    let offline_instance_count = cluster
.instances
.elems()
.filter(|i| {
            i.primary.is_some_and(|p| offline_node_idx.contains(&p))
                || i.secondary.is_some_and(|s| offline_node_idx.contains(&s))
        })
.count() as f64;

    let offline_primary_count = cluster
.instances
.elems()
.filter(|i| i.primary.is_some_and(|p| offline_node_idx.contains(&p)))
.count() as f64;

    sigma(&free_mem_ratio)
        + sigma(&reserved_mem_ratio)
        + sigma(&free_disk_ratio)
        + n1_failures
        + offline_instance_count
        + offline_primary_count
        + sigma(&vcpu_ratio)
        + sigma(&spindle_ratio)
        + sigma(&cpu_load)
        + sigma(&mem_load)
        + sigma(&disk_load)
        + sigma(&net_load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::container::Container;
    use hbal_core::units::{DiskTemplate, DynUtil, IPolicy, ISpec, RSpec};
    use hbal_core::{ClusterData, Instance, Node};
    use std::collections::BTreeSet;

    fn policy() -> IPolicy {
        let spec = ISpec::new(RSpec::new(1, 128, 1024), 1, 1, 1);
        let max = ISpec::new(RSpec::new(8, 16384, 102400), 4, 4, 8);
        IPolicy::new(spec, spec, max, vec![DiskTemplate::Drbd], 4.0, 1.0).unwrap()
    }

    fn balanced_cluster() -> ClusterData {
        let mut nodes = Container::empty();
        let mut n0 = Node::create(
            "n0".into(), 32762, 1024, 7280, 1861, 1026, 4, false, 0, 8, BTreeSet::new(), 8,
        );
        let mut n1 = Node::create(
            "n1".into(), 32762, 1024, 7280, 1861, 1026, 4, false, 0, 8, BTreeSet::new(), 8,
        );
        n0.idx = 0;
        n1.idx = 1;

        let mut instances = Container::empty();
        let mut i0 = Instance::create(
            "i0".into(), 1024, 100, 1, 1, Some(0), Some(1), DiskTemplate::Drbd,
            hbal_core::instance::RunStatus::Running, true, BTreeSet::new(), DynUtil::zero(),
        );
        i0.idx = 0;
        let mut i1 = Instance::create(
            "i1".into(), 1024, 100, 1, 1, Some(1), Some(0), DiskTemplate::Drbd,
            hbal_core::instance::RunStatus::Running, true, BTreeSet::new(), DynUtil::zero(),
        );
        i1.idx = 1;

        let n0 = n0.set_pri(&i0).unwrap();
        let n0 = n0.set_sec(&i1, 1).unwrap();
        let n1 = n1.set_pri(&i1).unwrap();
        let n1 = n1.set_sec(&i0, 0).unwrap();

        nodes.add(n0);
        nodes.add(n1);
        instances.add(i0);
        instances.add(i1);

        ClusterData::new(Container::empty(), nodes, instances, vec![], policy())
    }

    #[test]
    fn symmetric_cluster_scores_near_zero() {
        let cluster = balanced_cluster();
        let s = compute_score(&cluster);
        assert!(s < 1e-9, "expected ~0, got {s}");
    }

    #[test]
    fn offline_node_penalizes_score() {
        let cluster = balanced_cluster();
        let offline_cluster = {
            let mut c = cluster.clone();
            c.nodes.update(0, |n| n.set_offline(true));
            c
        };
        assert!(compute_score(&offline_cluster) > compute_score(&cluster));
    }
}
