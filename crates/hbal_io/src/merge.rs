//! Loader / Merger : turns a [`RawCluster`] plus administrator
//! overlays into a consistent [`ClusterData`].
//!
//! Runs the eight steps in order: utilisation overlay, exclusion-tag
//! extension, select/exclude resolution, common-suffix aliasing, tag
//! filtering, movability, node registration, and policy/peers/split-group
//! finalisation.

use std::collections::{BTreeMap, BTreeSet};

use hbal_core::container::Container;
use hbal_core::group::{AllocPolicy, Group};
use hbal_core::instance::{Instance, RunStatus};
use hbal_core::node::Node;
use hbal_core::units::{DiskTemplate, DynUtil, IPolicy, ISpec, RSpec};
use hbal_core::{ClusterData, Idx};

use crate::dns::{common_dns_suffix, strip_suffix};
use crate::errors::IoError;
use crate::text::{RawCluster, RawISpec, RawIPolicy};

const IEXTAGS_PREFIX: &str = "htools:iextags:";

/// Administrator-supplied overlays consumed by the loader.
#[derive(Clone, Debug, Default)]
pub struct MergeInput {
    pub raw: RawCluster,
    /// Per-instance dynamic-utilisation overlay, keyed by instance name.
    pub util_overlay: BTreeMap<String, DynUtil>,
    /// Administrator-supplied exclusion tag prefixes.
    pub extags: Vec<String>,
    /// Instance selection list (by name); when non-empty, everything else
    /// becomes immovable.
    pub selinsts: Vec<String>,
    /// Instance exclusion list (by name); always made immovable.
    pub exinsts: Vec<String>,
}

const OWNER: &str = "loader";

fn err(detail: impl Into<String>) -> IoError {
    IoError::Loader { owner: OWNER, detail: detail.into() }
}

fn to_ispec(r: &RawISpec) -> ISpec {
    ISpec::new(RSpec::new(r.cpu, r.mem_mib, r.disk_mib), r.disk_count, r.nic_count, r.spindle_use)
}

fn to_ipolicy(r: &RawIPolicy) -> Result<IPolicy, IoError> {
    let disk_templates = r
.disk_templates
.iter()
.map(|s| DiskTemplate::parse(s))
.collect::<Result<Vec<_>, _>>()
.map_err(|e| err(e.to_string()))?;
    IPolicy::new(
        to_ispec(&r.min),
        to_ispec(&r.std),
        to_ispec(&r.max),
        disk_templates,
        r.vcpu_ratio,
        r.spindle_ratio,
    )
.map_err(|e| err(e.to_string()))
}

fn find_ipolicy<'a>(ipolicies: &'a [RawIPolicy], owner: &str) -> Option<&'a RawIPolicy> {
    ipolicies.iter().find(|p| p.owner == owner)
}

/// Run the full loader/merge pipeline.
pub fn load_cluster(input: MergeInput) -> Result<ClusterData, IoError> {
    let MergeInput { raw, util_overlay, mut extags, selinsts, exinsts } = input;

    // Step 2: extend extags from cluster tags beginning with the fixed
    // htools:iextags: prefix.
    for tag in &raw.cluster_tags {
        if let Some(suffix) = tag.strip_prefix(IEXTAGS_PREFIX) {
            extags.push(suffix.to_string());
        }
    }

    // Cluster-wide default ipolicy (owner == "cluster").
    let cluster_raw_policy = find_ipolicy(&raw.ipolicies, "cluster")
.ok_or_else(|| err("no cluster-wide ipolicy (owner \"cluster\") present"))?;
    let cluster_ipolicy = to_ipolicy(cluster_raw_policy)?;

    // Groups, with their own ipolicy falling back to the cluster default.
    let mut groups: Container<Group> = Container::empty();
    let mut group_uuid_to_idx: BTreeMap<String, Idx> = BTreeMap::new();
    for rg in &raw.groups {
        let alloc_policy = AllocPolicy::parse(&rg.alloc_policy)
.ok_or_else(|| err(format!("unknown alloc_policy {:?}", rg.alloc_policy)))?;
        let group_ipolicy = match find_ipolicy(&raw.ipolicies, &rg.name)
.or_else(|| find_ipolicy(&raw.ipolicies, &rg.uuid))
        {
            Some(p) => to_ipolicy(p)?,
            None => cluster_ipolicy.clone(),
        };
        let group = Group::new(
            rg.name.clone(),
            rg.uuid.clone(),
            alloc_policy,
            group_ipolicy,
            rg.tags.clone(),
            rg.networks.clone(),
        );
        let idx = groups.add_new(group);
        group_uuid_to_idx.insert(rg.uuid.clone(), idx);
    }

    // Nodes.
    let mut nodes: Container<Node> = Container::empty();
    for rn in &raw.nodes {
        let group_idx = *group_uuid_to_idx
.get(&rn.group_uuid)
.ok_or_else(|| err(format!("node {:?}: unknown group uuid {:?}", rn.name, rn.group_uuid)))?;
        let tags: BTreeSet<String> = rn.tags.iter().cloned().collect();
        let offline = rn.offline_role == 'Y';
        let mut node = Node::create(
            rn.name.clone(),
            rn.t_mem,
            rn.mem_node,
            rn.f_mem,
            rn.t_dsk,
            rn.f_dsk,
            rn.t_cpu,
            offline,
            group_idx,
            rn.t_spindles,
            tags,
            rn.f_spindles,
        );
        node.master_capable = rn.offline_role == 'M';
        nodes.add_new(node);
    }

    // Instances, resolving primary/secondary node names and applying the
    // utilisation overlay (step 1).
    let mut instances: Container<Instance> = Container::empty();
    for ri in &raw.instances {
        let primary = nodes
.find_by_name(&ri.pnode)
.map_err(|e| err(format!("instance {:?}: primary node: {e}", ri.name)))?
.idx;
        let secondary = match &ri.snode {
            Some(n) => Some(
                nodes
.find_by_name(n)
.map_err(|e| err(format!("instance {:?}: secondary node: {e}", ri.name)))?
.idx,
            ),
            None => None,
        };
        let disk_template = DiskTemplate::parse(&ri.disk_template).map_err(|e| err(e.to_string()))?;
        let run_status = RunStatus::parse(&ri.status)
.ok_or_else(|| err(format!("instance {:?}: unknown status {:?}", ri.name, ri.status)))?;
        let tags: BTreeSet<String> = ri.tags.iter().cloned().collect();
        // Step 1: overlay util onto any instance found by name; unknown
        // names in the overlay are skipped silently (the overlay is keyed // by name, not the other way round, so nothing to skip here).
        let util = util_overlay.get(&ri.name).copied().unwrap_or_default();

        let instance = Instance::create(
            ri.name.clone(),
            ri.mem,
            ri.disk,
            ri.vcpus,
            ri.spindle_use,
            Some(primary),
            secondary,
            disk_template,
            run_status,
            ri.auto_balance,
            tags,
            util,
        );
        instances.add_new(instance);
    }

    // Step 3: resolve selinsts/exinsts to indices; collect every failure
    // before bailing so the error lists all offending names at once.
    let resolve_names = |names: &[String]| -> (Vec<Idx>, Vec<String>) {
        let mut idxs = Vec::new();
        let mut bad = Vec::new();
        for name in names {
            match instances.find_by_name(name) {
                Ok(i) => idxs.push(i.idx),
                Err(_) => bad.push(name.clone()),
            }
        }
        (idxs, bad)
    };
    let (sel_idxs, mut bad_names) = resolve_names(&selinsts);
    let (ex_idxs, bad_ex) = resolve_names(&exinsts);
    bad_names.extend(bad_ex);
    if !bad_names.is_empty() {
        return Err(err(format!(
            "cannot resolve selected/excluded instance name(s): {}",
            bad_names.join(", ")
        )));
    }
    let sel_set: BTreeSet<Idx> = sel_idxs.into_iter().collect();
    let ex_set: BTreeSet<Idx> = ex_idxs.into_iter().collect();

    // Step 4: common DNS suffix over every node and instance name, used for
    // display aliases.
    let all_names: Vec<&str> = nodes
.elems()
.map(|n| n.name.as_str())
.chain(instances.elems().map(|i| i.name.as_str()))
.collect();
    let suffix = common_dns_suffix(all_names);
    let node_idxs: Vec<Idx> = nodes.keys().collect();
    for idx in node_idxs {
        nodes.update(idx, |n| {
            let alias = strip_suffix(&n.name, &suffix).to_string();
            n.set_alias(alias)
        });
    }
    let inst_idxs: Vec<Idx> = instances.keys().collect();
    for idx in &inst_idxs {
        instances.update(*idx, |i| {
            let alias = strip_suffix(&i.name, &suffix).to_string();
            i.set_alias(alias)
        });
    }

    // Step 5 (tags filter) + step 6 (movable): done together per instance.
    for idx in &inst_idxs {
        instances.update(*idx, |i| {
            let filtered_tags: BTreeSet<String> = i
.tags
.iter()
.filter(|t| extags.iter().any(|p| t.starts_with(p.as_str())))
.cloned()
.collect();
            let movable = !ex_set.contains(&i.idx) && (sel_set.is_empty() || sel_set.contains(&i.idx));
            let mut next = i.set_movable(movable);
            next.tags = filtered_tags;
            next
        });
    }

    // Step 7: register every instance with its primary and secondary node.
    for idx in &inst_idxs {
        let inst = instances.find(*idx).expect("idx came from this container").clone();
        let primary = inst.primary.expect("instance always has a primary after construction");
        nodes
.update(primary, |n| n.set_pri(&inst).expect("loader input must already satisfy capacity"))
.ok_or_else(|| err(format!("instance {:?}: primary node vanished", inst.name)))?;
        if let Some(secondary) = inst.secondary {
            nodes
.update(secondary, |n| {
                    n.set_sec(&inst, primary).expect("loader input must already satisfy capacity")
                })
.ok_or_else(|| err(format!("instance {:?}: secondary node vanished", inst.name)))?;
        }
    }

    // Step 8a: node policy from its group (vcpu-overcommit ratio).
    let node_idxs: Vec<Idx> = nodes.keys().collect();
    for idx in &node_idxs {
        let group_idx = nodes.find(*idx).expect("idx came from this container").group;
        let vcpu_ratio = groups
.find(group_idx)
.map(|g| g.ipolicy.vcpu_ratio)
.unwrap_or(cluster_ipolicy.vcpu_ratio);
        nodes.update(*idx, |n| n.set_mcpu(vcpu_ratio));
    }

    // Step 8b: rebuild peers from scratch now that every node carries its
    // final p_list/s_list.
    let all_instances: Vec<&Instance> = instances.elems().collect();
    for idx in &node_idxs {
        nodes.update(*idx, |n| n.build_peers(&all_instances));
    }

    // Step 8c: mark split-group instances immovable.
    for idx in &inst_idxs {
        let inst = instances.find(*idx).expect("idx came from this container").clone();
        if let (Some(p), Some(s)) = (inst.primary, inst.secondary) {
            let p_group = nodes.find(p).map(|n| n.group);
            let s_group = nodes.find(s).map(|n| n.group);
            if p_group != s_group {
                instances.update(*idx, |i| i.set_movable(false));
            }
        }
    }

    Ok(ClusterData::new(groups, nodes, instances, raw.cluster_tags, cluster_ipolicy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse_text;

    fn sample() -> RawCluster {
        let text = [
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
.join("\n");
        parse_text(&text).unwrap()
    }

    #[test]
    fn loads_a_consistent_cluster() {
        let cluster = load_cluster(MergeInput { raw: sample(),..Default::default() }).unwrap();
        assert_eq!(cluster.nodes.size(), 2);
        assert_eq!(cluster.instances.size(), 2);
        let n0 = cluster.nodes.find(0).unwrap();
        assert_eq!(n0.p_list.len(), 1);
        assert_eq!(n0.s_list.len(), 1);
        assert_eq!(cluster.instances.find(0).unwrap().alias, "inst1");
    }

    #[test]
    fn select_instances_marks_everything_else_immovable() {
        let input = MergeInput {
            raw: sample(),
            selinsts: vec!["inst1".to_string()],
..Default::default()
        };
        let cluster = load_cluster(input).unwrap();
        let i0 = cluster.instances.find_by_name("inst1").unwrap();
        let i1 = cluster.instances.find_by_name("inst2").unwrap();
        assert!(i0.movable);
        assert!(!i1.movable);
    }

    #[test]
    fn unresolvable_selected_instance_fails_whole_merge() {
        let input = MergeInput {
            raw: sample(),
            selinsts: vec!["ghost".to_string()],
..Default::default()
        };
        assert!(load_cluster(input).is_err());
    }

    #[test]
    fn iextags_cluster_tag_extends_exclusion_prefixes() {
        let mut raw = sample();
        raw.cluster_tags.push("htools:iextags:svc".to_string());
        raw.instances[0].tags = vec!["svc:web".to_string(), "other".to_string()];
        let cluster = load_cluster(MergeInput { raw,..Default::default() }).unwrap();
        let i0 = cluster.instances.find_by_name("inst1").unwrap();
        assert!(i0.tags.contains("svc:web"));
        assert!(!i0.tags.contains("other"));
    }
}
