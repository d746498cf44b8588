//! The cluster snapshot  and the `Placement` record produced by the
//! balancer/allocator.

use crate::container::Container;
use crate::group::Group;
use crate::instance::{Instance, Move};
use crate::node::Node;
use crate::units::IPolicy;
use crate::Idx;

/// `{ groups, nodes, instances, cluster_tags, ipolicy }`.
#[derive(Clone, Debug)]
pub struct ClusterData {
    pub groups: Container<Group>,
    pub nodes: Container<Node>,
    pub instances: Container<Instance>,
    pub cluster_tags: Vec<String>,
    pub ipolicy: IPolicy,
}

impl ClusterData {
    pub fn new(groups: Container<Group>, nodes: Container<Node>, instances: Container<Instance>, cluster_tags: Vec<String>, ipolicy: IPolicy) -> Self {
        ClusterData { groups, nodes, instances, cluster_tags, ipolicy }
    }

    /// Nodes that contribute to scoring: online and vm-capable.
    pub fn scoring_nodes(&self) -> Vec<&Node> {
        self.nodes.elems().filter(|n| n.is_online_vm_capable()).collect()
    }
}

/// `(instance_idx, new_primary_idx, new_secondary_idx, Move, score_after)`.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
    pub instance_idx: Idx,
    pub new_primary: Idx,
    pub new_secondary: Option<Idx>,
    pub mv: Move,
    pub score_after: f64,
}

impl Placement {
    pub fn new(instance_idx: Idx, new_primary: Idx, new_secondary: Option<Idx>, mv: Move, score_after: f64) -> Self {
        Placement { instance_idx, new_primary, new_secondary, mv, score_after }
    }

    /// Set of node indices this placement touches (old + new hosts are /// tracked by the caller; this is just the new pair), used by jobset
    /// grouping.
    pub fn touched_nodes(&self) -> Vec<Idx> {
        match self.new_secondary {
            Some(s) => vec![self.new_primary, s],
            None => vec![self.new_primary],
        }
    }
}
