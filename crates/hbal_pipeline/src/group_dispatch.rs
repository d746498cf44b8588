//! Group dispatcher : selects the node group to balance, and
//! builds the intra-group sub-cluster the balancer actually runs over.
//! Allocation dispatch across multiple groups prefers `preferred` groups
//! over `last_resort` ones and never considers `unallocable` groups.

use hbal_core::container::Container;
use hbal_core::group::AllocPolicy;
use hbal_core::{ClusterData, Idx};

use crate::errors::{PipelineError, PipelineResult};

/// Resolve the group to balance: the explicitly named one, or the sole
/// group when there is exactly one. More than one group with no
/// `--group` selection is an ambiguity error, not a silent default.
pub fn select_group(cluster: &ClusterData, requested: Option<&str>) -> PipelineResult<Idx> {
    match requested {
        Some(name) => cluster
.groups
.elems()
.find(|g| g.name == name || g.uuid == name || g.alias == name)
.map(|g| g.idx)
.ok_or_else(|| PipelineError::GroupNotFound(name.to_string())),
        None => match cluster.groups.size() {
            0 => Err(PipelineError::NoGroups),
            1 => Ok(cluster.groups.elems().next().expect("size checked above").idx),
            _ => Err(PipelineError::AmbiguousGroup),
        },
    }
}

/// The instances whose primary lies in `group_idx`, restricted to that
/// group for balancing purposes ("balancing is strictly intra-group").
/// Node eligibility (online/vm-capable/drained) is already enforced by
/// `hbal_algo::candidate_moves`'s own target filter, so this just narrows
/// the instance set; the full node list is kept so cross-group secondaries
/// of split instances (already marked immovable by the loader) still
/// resolve.
pub fn sub_cluster_for_group(cluster: &ClusterData, group_idx: Idx) -> ClusterData {
    let instances: Container<_> = cluster
.instances
.elems()
.filter(|i| i.primary.is_some_and(|p| cluster.nodes.find(p).is_some_and(|n| n.group == group_idx)))
.cloned()
.collect();

    ClusterData::new(
        cluster.groups.clone(),
        cluster.nodes.clone(),
        instances,
        cluster.cluster_tags.clone(),
        cluster.ipolicy.clone(),
    )
}

/// Groups eligible to receive new allocations, `preferred` ones first, then
/// `last_resort` ones, each tier in ascending index order; `unallocable`
/// groups never appear.
pub fn allocation_order(cluster: &ClusterData) -> Vec<Idx> {
    let mut preferred: Vec<Idx> = Vec::new();
    let mut last_resort: Vec<Idx> = Vec::new();
    for g in cluster.groups.elems() {
        match g.alloc_policy {
            AllocPolicy::Preferred => preferred.push(g.idx),
            AllocPolicy::LastResort => last_resort.push(g.idx),
            AllocPolicy::Unallocable => {}
        }
    }
    preferred.extend(last_resort);
    preferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::group::Group;
    use hbal_core::units::{DiskTemplate, IPolicy, ISpec, RSpec};

    fn policy() -> IPolicy {
        let spec = ISpec::new(RSpec::new(1, 128, 1024), 1, 1, 1);
        let max = ISpec::new(RSpec::new(8, 16384, 102400), 4, 4, 8);
        IPolicy::new(spec, spec, max, vec![DiskTemplate::Drbd], 4.0, 1.0).unwrap()
    }

    fn cluster_with_groups(policies: &[AllocPolicy]) -> ClusterData {
        let mut groups = Container::empty();
        for (i, p) in policies.iter().enumerate() {
            let g = Group::new(format!("g{i}"), format!("uuid-g{i}"), *p, policy(), vec![], vec![]);
            groups.add_new(g);
        }
        ClusterData::new(groups, Container::empty(), Container::empty(), vec![], policy())
    }

    #[test]
    fn single_group_is_selected_without_a_name() {
        let cluster = cluster_with_groups(&[AllocPolicy::Preferred]);
        assert_eq!(select_group(&cluster, None).unwrap(), 0);
    }

    #[test]
    fn multiple_groups_require_explicit_selection() {
        let cluster = cluster_with_groups(&[AllocPolicy::Preferred, AllocPolicy::Preferred]);
        assert_eq!(select_group(&cluster, None), Err(PipelineError::AmbiguousGroup));
        assert_eq!(select_group(&cluster, Some("g1")).unwrap(), 1);
    }

    #[test]
    fn unknown_group_name_is_an_error() {
        let cluster = cluster_with_groups(&[AllocPolicy::Preferred]);
        assert!(matches!(select_group(&cluster, Some("ghost")), Err(PipelineError::GroupNotFound(_))));
    }

    #[test]
    fn allocation_order_prefers_preferred_over_last_resort() {
        let cluster =
            cluster_with_groups(&[AllocPolicy::LastResort, AllocPolicy::Preferred, AllocPolicy::Unallocable]);
        assert_eq!(allocation_order(&cluster), vec![1, 0]);
    }
}
