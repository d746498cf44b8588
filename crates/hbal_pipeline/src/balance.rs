//! The greedy balancer : repeatedly apply the single
//! lowest-scoring legal move until one of four termination conditions fires,
//! in this fixed order.

use hbal_algo::moves::{apply_move, candidate_moves, MoveOptions, MoveOutcome};
use hbal_algo::score::compute_score;
use hbal_core::{ClusterData, Idx, Move, Placement};

/// Tunables for the greedy loop (flags `-G`/`-l`/`-g`).
#[derive(Clone, Debug)]
pub struct BalanceOptions {
    pub moves: MoveOptions,
    /// Stop once the running score drops to or below this value.
    pub min_score: f64,
    /// Stop once this many placements have been produced.
    pub max_length: Option<usize>,
    /// Minimum absolute score improvement a move must buy once the running
    /// score is already below `min_gain_limit`.
    pub min_gain: f64,
    pub min_gain_limit: f64,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        BalanceOptions {
            moves: MoveOptions::default(),
            min_score: 1e-9,
            max_length: None,
            min_gain: 0.01,
            min_gain_limit: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BalanceResult {
    pub placements: Vec<Placement>,
    pub final_cluster: ClusterData,
    pub initial_score: f64,
    pub final_score: f64,
}

/// Lowest-scoring move across every movable instance, ascending instance
/// index then ascending ordinal/target within an instance (both already
/// guaranteed by `candidate_moves`'s enumeration order), so the first
/// strictly-lower score found is always the tie-break winner.
fn best_candidate(cluster: &ClusterData, opts: &MoveOptions) -> Option<(Idx, Move, MoveOutcome, f64)> {
    let mut best: Option<(f64, Idx, Move, MoveOutcome)> = None;
    for inst in cluster.instances.elems() {
        if !inst.movable {
            continue;
        }
        for mv in candidate_moves(cluster, inst, opts) {
            let Ok(outcome) = apply_move(cluster, inst.idx, mv, opts) else {
                continue;
            };
            let score = compute_score(&outcome.cluster);
            let better = match &best {
                None => true,
                Some((bs,..)) => score < *bs,
            };
            if better {
                best = Some((score, inst.idx, mv, outcome));
            }
        }
    }
    best.map(|(score, idx, mv, outcome)| (idx, mv, outcome, score))
}

/// Run the greedy balancer to completion.
pub fn balance(cluster: &ClusterData, opts: &BalanceOptions) -> BalanceResult {
    let mut cluster = cluster.clone();
    let mut score = compute_score(&cluster);
    let initial_score = score;
    let mut placements = Vec::new();

    loop {
        if score <= opts.min_score {
            break;
        }
        if let Some(max) = opts.max_length {
            if placements.len() >= max {
                break;
            }
        }
        let Some((inst_idx, mv, outcome, new_score)) = best_candidate(&cluster, &opts.moves)
        else {
            break;
        };
        if new_score >= score {
            break;
        }
        let gain = score - new_score;
        if gain < opts.min_gain && score < opts.min_gain_limit {
            break;
        }

        placements.push(Placement::new(inst_idx, outcome.new_primary, outcome.new_secondary, mv, new_score));
        cluster = outcome.cluster;
        score = new_score;
    }

    BalanceResult { placements, final_cluster: cluster, initial_score, final_score: score }
}
