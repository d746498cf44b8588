//! `ClusterData` → `RawCluster` ("Persisted state", `--save-cluster`):
//! the inverse of `merge::load_cluster`, so a balanced cluster can be
//! written back out in the textual format and re-loaded later.

use hbal_core::units::{ISpec, RSpec};
use hbal_core::{ClusterData, Group, Node};

use crate::text::{RawCluster, RawGroup, RawIPolicy, RawISpec, RawInstance, RawNode};

fn from_ispec(s: &ISpec) -> RawISpec {
    RawISpec {
        cpu: s.rspec.cpu,
        mem_mib: s.rspec.mem_mib,
        disk_mib: s.rspec.disk_mib,
        disk_count: s.disk_count,
        nic_count: s.nic_count,
        spindle_use: s.spindle_use,
    }
}

fn offline_role(n: &Node) -> char {
    if n.offline {
        'Y'
    } else if !n.master_capable {
        'M'
    } else {
        'N'
    }
}

fn raw_group(g: &Group) -> RawGroup {
    RawGroup {
        name: g.name.clone(),
        uuid: g.uuid.clone(),
        alloc_policy: g.alloc_policy.as_str().to_string(),
        tags: g.tags.clone(),
        networks: g.networks.clone(),
    }
}

fn raw_node(cluster: &ClusterData, n: &Node) -> RawNode {
    let group_uuid = cluster.groups.find(n.group).map(|g| g.uuid.clone()).unwrap_or_default();
    RawNode {
        name: n.name.clone(),
        t_mem: n.t_mem,
        mem_node: n.t_mem_node,
        f_mem: n.f_mem,
        t_dsk: n.t_dsk,
        f_dsk: n.f_dsk,
        t_cpu: n.t_cpu,
        offline_role: offline_role(n),
        group_uuid,
        t_spindles: n.t_spindles,
        tags: n.tags.iter().cloned().collect(),
        excl_storage: false,
        f_spindles: n.f_spindles,
        n_vcpus: n.t_cpu,
        cpu_speed: 1.0,
    }
}

fn raw_instance(cluster: &ClusterData, i: &hbal_core::Instance) -> RawInstance {
    let pnode = i.primary.and_then(|p| cluster.nodes.find(p)).map(|n| n.name.clone()).unwrap_or_default();
    let snode = i.secondary.and_then(|s| cluster.nodes.find(s)).map(|n| n.name.clone());
    RawInstance {
        name: i.name.clone(),
        mem: i.mem_mib,
        disk: i.disk_mib,
        vcpus: i.vcpus,
        status: i.run_status.as_str().to_string(),
        auto_balance: i.auto_balance,
        pnode,
        snode,
        disk_template: i.disk_template.as_str().to_string(),
        tags: i.tags.iter().cloned().collect(),
        spindle_use: i.spindle_use,
        actual_spindles: i.spindle_use,
    }
}

/// Build the `RawCluster` that `serialize_text` expects.
pub fn to_raw_cluster(cluster: &ClusterData) -> RawCluster {
    let groups: Vec<RawGroup> = cluster.groups.elems().map(raw_group).collect();
    let nodes: Vec<RawNode> = cluster.nodes.elems().map(|n| raw_node(cluster, n)).collect();
    let instances: Vec<RawInstance> = cluster.instances.elems().map(|i| raw_instance(cluster, i)).collect();

    let mut ipolicies = vec![RawIPolicy {
        owner: "cluster".to_string(),
        min: from_ispec(&cluster.ipolicy.min),
        std: from_ispec(&cluster.ipolicy.std),
        max: from_ispec(&cluster.ipolicy.max),
        disk_templates: cluster.ipolicy.disk_templates.iter().map(|t| t.as_str().to_string()).collect(),
        vcpu_ratio: cluster.ipolicy.vcpu_ratio,
        spindle_ratio: cluster.ipolicy.spindle_ratio,
    }];
    for g in cluster.groups.elems() {
        ipolicies.push(RawIPolicy {
            owner: g.uuid.clone(),
            min: from_ispec(&g.ipolicy.min),
            std: from_ispec(&g.ipolicy.std),
            max: from_ispec(&g.ipolicy.max),
            disk_templates: g.ipolicy.disk_templates.iter().map(|t| t.as_str().to_string()).collect(),
            vcpu_ratio: g.ipolicy.vcpu_ratio,
            spindle_ratio: g.ipolicy.spindle_ratio,
        });
    }

    RawCluster { groups, nodes, instances, cluster_tags: cluster.cluster_tags.clone(), ipolicies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{load_cluster, MergeInput};
    use crate::text::{parse_text, serialize_text};

    fn sample_text() -> String {
        [
            "g1 | uuid-g1 | preferred |  | ",
            "",
            "n1.example.com | 32762 | 1024 | 32762 | 1861 | 1861 | 4 | N | uuid-g1 | 8 |  | Y | 8 | 4 | 1.0",
            "",
            "",
            "",
            "cluster | 1:128:1024:1:1:1 | 1:128:1024:1:1:1 | 8:16384:102400:4:4:8 | drbd,plain | 4.0 | 1.0",
        ]
.join("\n")
    }

    #[test]
    fn load_then_save_round_trips_node_identity() {
        let raw = parse_text(&sample_text()).unwrap();
        let cluster = load_cluster(MergeInput { raw,..Default::default() }).unwrap();
        let raw_back = to_raw_cluster(&cluster);
        let text_back = serialize_text(&raw_back);
        let raw_again = parse_text(&text_back).unwrap();
        assert_eq!(raw_again.nodes.len(), 1);
        assert_eq!(raw_again.nodes[0].name, "n1.example.com");
        assert_eq!(raw_again.groups[0].uuid, "uuid-g1");
    }
}
