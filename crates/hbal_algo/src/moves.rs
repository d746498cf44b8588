//! Move enumeration and application.
//!
//! `candidate_moves` enumerates the legal move variants for one instance,
//! already filtered by the configuration flags in `MoveOptions`.
//! `apply_move` is the pure function that applies one such move to a
//! snapshot, returning either the updated snapshot or a `FailMode`.

use hbal_core::container::Container;
use hbal_core::instance::MirrorType;
use hbal_core::{ClusterData, FailMode, Idx, Instance, Move};

/// Configuration flags that restrict move enumeration.
#[derive(Clone, Debug, Default)]
pub struct MoveOptions {
    pub no_disk_moves: bool,
    pub no_instance_moves: bool,
    pub evac_mode: bool,
    pub restricted_migration: bool,
    /// Tag prefixes that may not co-reside as primaries on the same node
    /// ("Exclusion tag").
    pub exclusion_tags: Vec<String>,
}

/// True when `inst`'s current primary or secondary sits on an offline or
/// drained node — the evac-mode instance filter.
pub fn is_evac_candidate(cluster: &ClusterData, inst: &Instance) -> bool {
    let is_bad = |idx: Option<Idx>| -> bool {
        idx.and_then(|i| cluster.nodes.find(i))
.is_some_and(|n| n.offline || n.drained)
    };
    is_bad(inst.primary) || is_bad(inst.secondary)
}

/// Target nodes eligible to receive an instance: online, not drained,
/// vm-capable, in the same group as `primary` (balancing never crosses a /// group boundary), and not the node(s) excluded by the caller (///).
pub fn eligible_targets(cluster: &ClusterData, primary: Idx, exclude: &[Idx]) -> Vec<Idx> {
    let group = cluster.nodes.find(primary).map(|n| n.group);
    cluster
.nodes
.elems()
.filter(|n| !n.offline && !n.drained && n.vm_capable)
.filter(|n| match group {
            Some(g) => n.group == g,
            None => true,
        })
.map(|n| n.idx)
.filter(|idx| !exclude.contains(idx))
.collect()
}

/// Enumerate legal moves for instance `inst`, in fixed-ordinal then
/// ascending target-node order.
pub fn candidate_moves(cluster: &ClusterData, inst: &Instance, opts: &MoveOptions) -> Vec<Move> {
    if !inst.movable {
        return Vec::new();
    }
    if opts.evac_mode && !is_evac_candidate(cluster, inst) {
        return Vec::new();
    }

    let primary = match inst.primary {
        Some(p) => p,
        None => return Vec::new(),
    };

    let mut moves = match inst.mirror_type() {
        MirrorType::Internal => {
            let secondary = inst.secondary;
            let mut out = Vec::new();
            out.push(Move::Failover);
            for n in eligible_targets(cluster, primary, &[primary]) {
                out.push(Move::ReplaceSecondary(n));
            }
            let exclude_for_primary: Vec<Idx> = secondary.into_iter().collect();
            for n in eligible_targets(cluster, primary, &exclude_for_primary) {
                out.push(Move::ReplacePrimary(n));
            }
            for n in eligible_targets(cluster, primary, &[primary]) {
                out.push(Move::ReplaceAndFailover(n));
            }
            for n in eligible_targets(cluster, primary, &[primary]) {
                out.push(Move::FailoverAndReplace(n));
            }
            out
        }
        MirrorType::External => eligible_targets(cluster, primary, &[primary])
.into_iter()
.map(Move::FailoverToAny)
.collect(),
        MirrorType::None => Vec::new(),
    };

    if opts.no_disk_moves {
        moves.retain(|m| !m.is_disk_move());
    }
    if opts.no_instance_moves {
        moves.retain(|m| !m.changes_primary());
    }
    if opts.restricted_migration {
        let primary_drained = cluster.nodes.find(primary).is_some_and(|n| n.drained);
        moves.retain(|m| {
            !matches!(m, Move::ReplacePrimary(_))
                && !(matches!(m, Move::ReplaceAndFailover(_)) && !primary_drained)
        });
    }

    // Fixed ordinal, then ascending target-node: the tie-breaking order the
    // balancer relies on for determinism (lowest instance index is already
    // fixed by the caller's iteration order; this fixes the rest).
    moves.sort_by_key(|m| (m.ordinal(), m.target().unwrap_or(Idx::MIN)));
    moves
}

/// Result of successfully applying a move (tuple, minus score).
#[derive(Clone, Debug)]
pub struct MoveOutcome {
    pub cluster: ClusterData,
    pub instance_idx: Idx,
    pub new_primary: Idx,
    pub new_secondary: Option<Idx>,
}

fn net_effect(inst: &Instance, mv: Move) -> Option<(Idx, Option<Idx>)> {
    let old_primary = inst.primary?;
    let old_secondary = inst.secondary;
    Some(match mv {
        Move::Failover => (old_secondary?, Some(old_primary)),
        Move::FailoverToAny(n) => (n, None),
        Move::ReplaceSecondary(n) => (old_primary, Some(n)),
        Move::ReplacePrimary(n) => (n, old_secondary),
        Move::ReplaceAndFailover(n) => (n, Some(old_primary)),
        Move::FailoverAndReplace(n) => (old_secondary?, Some(n)),
    })
}

/// Two instances conflict if they both carry a tag beginning with one of
/// `prefixes` and that tag matches exactly.
fn tags_conflict(a: &Instance, b: &Instance, prefixes: &[String]) -> bool {
    if prefixes.is_empty() {
        return false;
    }
    a.tags.iter().any(|t| {
        prefixes.iter().any(|p| t.starts_with(p.as_str())) && b.tags.contains(t)
    })
}

/// Apply `mv` to `inst_idx` within `cluster`. Pure: on success returns
/// a brand-new `ClusterData`; on failure returns the `FailMode` the move
/// tripped over and leaves the input untouched (the caller still owns it).
pub fn apply_move(cluster: &ClusterData, inst_idx: Idx, mv: Move, opts: &MoveOptions) -> Result<MoveOutcome, FailMode> {
    let inst = cluster
.instances
.find(inst_idx)
.expect("apply_move called with a valid instance index");
    let old_primary = inst.primary.expect("movable instance must have a primary");
    let old_secondary = inst.secondary;

    let (new_primary, new_secondary) =
        net_effect(inst, mv).expect("net_effect called with a move valid for this instance");

    // Exclusion-tag check (6): any instance already primary on
    // new_primary that shares an excluded tag with `inst`. Only relevant
    // when the move actually changes who is primary where.
    if new_primary != old_primary {
        for other in cluster.instances.elems() {
            if other.idx == inst_idx {
                continue;
            }
            if other.primary == Some(new_primary) && tags_conflict(inst, other, &opts.exclusion_tags)
            {
                return Err(FailMode::FailTags);
            }
        }
    }

    let mut nodes = cluster.nodes.clone();

    // Remove from old roles.
    nodes.update(old_primary, |n| n.remove_pri(inst));
    if let Some(old_sec) = old_secondary {
        nodes.update(old_sec, |n| n.remove_sec(inst, old_primary));
    }

    // Add to new roles, propagating capacity failures.
    let mut capacity_failure = None;

    if let Some(new_node) = nodes.find(new_primary) {
        match new_node.set_pri(inst) {
            Ok(updated) => {
                nodes.update(new_primary, |_| updated);
            }
            Err(fm) => capacity_failure = Some(fm),
        }
    }

    if capacity_failure.is_none() {
        if let Some(new_sec) = new_secondary {
            if let Some(new_node) = nodes.find(new_sec) {
                match new_node.set_sec(inst, new_primary) {
                    Ok(updated) => {
                        nodes.update(new_sec, |_| updated);
                    }
                    Err(fm) => capacity_failure = Some(fm),
                }
            }
        }
    }

    if let Some(fm) = capacity_failure {
        return Err(fm);
    }

    let mut instances = cluster.instances.clone();
    instances.update(inst_idx, |i| i.set_both(Some(new_primary), new_secondary));

    let updated = ClusterData {
        groups: cluster.groups.clone(),
        nodes,
        instances,
        cluster_tags: cluster.cluster_tags.clone(),
        ipolicy: cluster.ipolicy.clone(),
    };

    Ok(MoveOutcome { cluster: updated, instance_idx: inst_idx, new_primary, new_secondary, })
}

/// Full peer-map rebuild over every node, used by the loader and by debug
/// assertions that cross-check the incremental updates `apply_move` performs
/// ("Peers map").
pub fn rebuild_all_peers(cluster: &ClusterData) -> Container<hbal_core::Node> {
    let all: Vec<&Instance> = cluster.instances.elems().collect();
    let mut nodes = Container::empty();
    for n in cluster.nodes.elems() {
        nodes.add(n.build_peers(&all));
    }
    nodes
}
