//! Move-list renderer : one row per placement — instance, old and new
//! primary/secondary, resulting score, and a short action-letter string.
//!
//! Action letters follow the classic htools vocabulary: `f` is a failover,
//! `r:<node>` a replace-secondary. `ReplacePrimary`/the two composite moves
//! are spelled out as the failover/replace sequence that reaches the same
//! end state, since that is the vocabulary the flag table promises
//! (`f` / `r:<node>` / composites) rather than a fourth letter.

use std::collections::HashMap;

use hbal_core::{ClusterData, Idx, Move, Placement};

fn alias(cluster: &ClusterData, idx: Idx) -> String {
    cluster.nodes.find(idx).map(|n| n.alias.clone()).unwrap_or_else(|| format!("#{idx}"))
}

fn alias_opt(cluster: &ClusterData, idx: Option<Idx>) -> String {
    match idx {
        Some(i) => alias(cluster, i),
        None => "-".to_string(),
    }
}

fn action_string(cluster: &ClusterData, mv: Move) -> String {
    match mv {
        Move::Failover => "f".to_string(),
        Move::FailoverToAny(n) => format!("f:{}", alias(cluster, n)),
        Move::ReplaceSecondary(n) => format!("r:{}", alias(cluster, n)),
        Move::ReplacePrimary(n) => format!("f r:{} f", alias(cluster, n)),
        Move::ReplaceAndFailover(n) => format!("r:{} f", alias(cluster, n)),
        Move::FailoverAndReplace(n) => format!("f r:{}", alias(cluster, n)),
    }
}

/// Render the move list. `cluster_before` must be the cluster snapshot the
/// placements were computed against (the balancer's or allocator's input),
/// so old primary/secondary values can be looked up without replaying
/// `hbal_algo::apply_move`.
pub fn render(cluster_before: &ClusterData, placements: &[Placement]) -> String {
    let headers = ["instance", "old_primary", "old_secondary", "new_primary", "new_secondary", "score", "action"];

    let mut current: HashMap<Idx, (Option<Idx>, Option<Idx>)> = HashMap::new();
    for inst in cluster_before.instances.elems() {
        current.insert(inst.idx, (inst.primary, inst.secondary));
    }

    let mut rows = Vec::with_capacity(placements.len());
    for p in placements {
        let (old_primary, old_secondary) =
            current.get(&p.instance_idx).copied().unwrap_or((None, None));
        let inst_alias = cluster_before
.instances
.find(p.instance_idx)
.map(|i| i.alias.clone())
.unwrap_or_else(|| format!("#{}", p.instance_idx));

        rows.push(vec![
            inst_alias,
            alias_opt(cluster_before, old_primary),
            alias_opt(cluster_before, old_secondary),
            alias(cluster_before, p.new_primary),
            alias_opt(cluster_before, p.new_secondary),
            format!("{:.6}", p.score_after),
            action_string(cluster_before, p.mv),
        ]);

        current.insert(p.instance_idx, (Some(p.new_primary), p.new_secondary));
    }

    crate::table::render(&headers, &rows)
}
