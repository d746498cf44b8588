//! Jobset grouping : partition an ordered placement list into maximal
//! prefixes of pairwise node-disjoint placements, so independent moves within
//! a jobset can be issued to the job queue concurrently.

use std::collections::BTreeSet;

use hbal_core::{Idx, Placement};

/// Start a new jobset whenever the next placement touches a node already
/// touched by the jobset being built, left to right. Pure function over the
/// placement list; does not look at the cluster.
pub fn group_into_jobsets(placements: &[Placement]) -> Vec<Vec<Placement>> {
    let mut jobsets: Vec<Vec<Placement>> = Vec::new();
    let mut current: Vec<Placement> = Vec::new();
    let mut touched: BTreeSet<Idx> = BTreeSet::new();

    for &p in placements {
        let nodes = p.touched_nodes();
        if !current.is_empty() && nodes.iter().any(|n| touched.contains(n)) {
            jobsets.push(std::mem::take(&mut current));
            touched.clear();
        }
        touched.extend(nodes.iter().copied());
        current.push(p);
    }
    if !current.is_empty() {
        jobsets.push(current);
    }
    jobsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::Move;

    fn placement(inst: Idx, primary: Idx, secondary: Option<Idx>) -> Placement {
        Placement::new(inst, primary, secondary, Move::Failover, 0.0)
    }

    #[test]
    fn disjoint_placements_share_one_jobset() {
        let placements = vec![placement(0, 1, Some(2)), placement(10, 3, Some(4))];
        let jobsets = group_into_jobsets(&placements);
        assert_eq!(jobsets.len(), 1);
        assert_eq!(jobsets[0].len(), 2);
    }

    #[test]
    fn overlapping_placements_split_into_separate_jobsets() {
        let placements = vec![placement(0, 1, Some(2)), placement(10, 2, Some(3))];
        let jobsets = group_into_jobsets(&placements);
        assert_eq!(jobsets.len(), 2);
        assert_eq!(jobsets[0].len(), 1);
        assert_eq!(jobsets[1].len(), 1);
    }

    #[test]
    fn empty_input_yields_no_jobsets() {
        assert!(group_into_jobsets(&[]).is_empty());
    }
}
