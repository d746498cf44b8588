//! The allocator : single-instance best-fit placement, bulk
//! allocation, tiered capacity probing, instance relocation, and node
//! evacuation. All of it is built on top of `hbal_algo::apply_move`'s
//! capacity checks; nothing here duplicates the N+1/mem/disk/cpu rules.

use std::collections::{BTreeMap, BTreeSet};

use hbal_algo::moves::{apply_move, eligible_targets, MoveOptions};
use hbal_algo::score::compute_score;
use hbal_core::instance::{Instance, MirrorType, RunStatus};
use hbal_core::units::{DiskTemplate, DynUtil, IPolicy, RSpec};
use hbal_core::{ClusterData, FailMode, Idx, Move, Node};

/// The resource shape and disk template an allocation attempt wants.
#[derive(Clone, Debug)]
pub struct AllocSpec {
    pub name: String,
    pub mem_mib: u64,
    pub disk_mib: u64,
    pub vcpus: u32,
    pub spindle_use: u32,
    pub disk_template: DiskTemplate,
}

#[derive(Clone, Debug)]
pub struct AllocSuccess {
    pub cluster: ClusterData,
    pub instance_idx: Idx,
    pub primary: Idx,
    pub secondary: Option<Idx>,
    pub score: f64,
}

/// Attempt to register a brand-new instance on `primary` (and, for /// internal-mirror templates, `secondary`). Pure: failure leaves the input
/// untouched.
fn place_new_instance(cluster: &ClusterData, spec: &AllocSpec, primary: Idx, secondary: Option<Idx>) -> Result<ClusterData, FailMode> {
    let instance = Instance::create(
        spec.name.clone(),
        spec.mem_mib,
        spec.disk_mib,
        spec.vcpus,
        spec.spindle_use,
        Some(primary),
        secondary,
        spec.disk_template,
        RunStatus::Running,
        true,
        BTreeSet::new(),
        DynUtil::zero(),
    );

    let mut nodes = cluster.nodes.clone();
    let new_primary_node: Node =
        nodes.find(primary).expect("candidate primary came from this cluster").set_pri(&instance)?;
    nodes.update(primary, |_| new_primary_node);

    if let Some(sec) = secondary {
        let new_sec_node: Node = match nodes.find(sec) {
            Some(n) => n.set_sec(&instance, primary)?,
            None => return Err(FailMode::FailN1),
        };
        nodes.update(sec, |_| new_sec_node);
    }

    let mut instances = cluster.instances.clone();
    instances.add_new(instance);

    Ok(ClusterData {
        groups: cluster.groups.clone(),
        nodes,
        instances,
        cluster_tags: cluster.cluster_tags.clone(),
        ipolicy: cluster.ipolicy.clone(),
    })
}

fn alloc_candidate_nodes(cluster: &ClusterData) -> Vec<Idx> {
    cluster.nodes.elems().filter(|n| n.is_online_vm_capable() && !n.drained).map(|n| n.idx).collect()
}

/// Try every eligible primary (and, for internal-mirror templates, every /// eligible secondary) and keep the lowest-scoring success. On total
/// failure, returns the tally of how many candidate nodes failed for each
/// reason.
pub fn try_allocate(cluster: &ClusterData, spec: &AllocSpec) -> Result<AllocSuccess, BTreeMap<FailMode, u32>> {
    let candidates = alloc_candidate_nodes(cluster);
    let mirror = spec.disk_template.mirror_type();

    let mut best: Option<AllocSuccess> = None;
    let mut fail_stats: BTreeMap<FailMode, u32> = BTreeMap::new();
    let mut record_fail = |fm: FailMode| *fail_stats.entry(fm).or_insert(0) += 1;

    match mirror {
        MirrorType::Internal => {
            for &primary in &candidates {
                for &secondary in &candidates {
                    if secondary == primary {
                        continue;
                    }
                    match place_new_instance(cluster, spec, primary, Some(secondary)) {
                        Ok(next) => {
                            let score = compute_score(&next);
                            let better = match &best {
                                None => true,
                                Some(b) => score < b.score,
                            };
                            if better {
                                let instance_idx = next
.instances
.find_by_name(&spec.name)
.expect("just inserted")
.idx;
                                best = Some(AllocSuccess {
                                    cluster: next,
                                    instance_idx,
                                    primary,
                                    secondary: Some(secondary),
                                    score,
                                });
                            }
                        }
                        Err(fm) => record_fail(fm),
                    }
                }
            }
        }
        MirrorType::External | MirrorType::None => {
            for &primary in &candidates {
                match place_new_instance(cluster, spec, primary, None) {
                    Ok(next) => {
                        let score = compute_score(&next);
                        let better = match &best {
                            None => true,
                            Some(b) => score < b.score,
                        };
                        if better {
                            let instance_idx =
                                next.instances.find_by_name(&spec.name).expect("just inserted").idx;
                            best = Some(AllocSuccess { cluster: next, instance_idx, primary, secondary: None, score, });
                        }
                    }
                    Err(fm) => record_fail(fm),
                }
            }
        }
    }

    best.ok_or(fail_stats)
}

/// Allocate a batch of instances in order, stopping at the first one that
/// cannot be placed (mode). Returns the successes placed so far
/// plus, on failure, the index within `specs` and its fail tally.
pub fn bulk_allocate(cluster: &ClusterData, specs: &[AllocSpec]) -> (ClusterData, Vec<AllocSuccess>, Option<(usize, BTreeMap<FailMode, u32>)>) {
    let mut cluster = cluster.clone();
    let mut successes = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        match try_allocate(&cluster, spec) {
            Ok(success) => {
                cluster = success.cluster.clone();
                successes.push(success);
            }
            Err(fail_stats) => return (cluster, successes, Some((i, fail_stats))),
        }
    }
    (cluster, successes, None)
}

/// One exhausted resource tier from the tiered allocation report.
#[derive(Clone, Debug)]
pub struct TierResult {
    pub rspec: RSpec,
    pub spindle_use: u32,
    pub count: usize,
}

#[derive(Clone, Debug)]
pub struct TieredReport {
    pub tiers: Vec<TierResult>,
    pub total: usize,
    pub final_cluster: ClusterData,
    pub last_fail_stats: BTreeMap<FailMode, u32>,
}

const MEM_STEP: u64 = 64;
const DISK_STEP: u64 = 256;
const VCPU_STEP: u32 = 1;

/// Saturate the cluster at `shape`, then shrink to the next smaller shape
/// (mem first, then disk, then vcpus, each by its unit step) and repeat
/// until all three dimensions are frozen at the policy minimum.
pub fn tiered_allocate(cluster: &ClusterData, policy: &IPolicy, initial: RSpec, disk_template: DiskTemplate, spindle_use: u32) -> TieredReport {
    let mut cluster = cluster.clone();
    let mut shape = initial;
    let mut mem_frozen = false;
    let mut disk_frozen = false;
    let mut vcpu_frozen = false;
    let mut tiers = Vec::new();
    let mut last_fail_stats = BTreeMap::new();
    let mut total = 0usize;

    loop {
        let mut count = 0usize;
        loop {
            let spec = AllocSpec {
                name: format!("tiered-alloc-{}-{count}", tiers.len()),
                mem_mib: shape.mem_mib,
                disk_mib: shape.disk_mib,
                vcpus: shape.cpu,
                spindle_use,
                disk_template,
            };
            match try_allocate(&cluster, &spec) {
                Ok(success) => {
                    cluster = success.cluster;
                    count += 1;
                }
                Err(fail_stats) => {
                    last_fail_stats = fail_stats;
                    break;
                }
            }
        }
        total += count;
        tiers.push(TierResult { rspec: shape, spindle_use, count });

        if mem_frozen && disk_frozen && vcpu_frozen {
            break;
        }
        if !mem_frozen {
            let next = shape.mem_mib.saturating_sub(MEM_STEP);
            if next >= policy.min.rspec.mem_mib && next < shape.mem_mib {
                shape.mem_mib = next;
            } else {
                mem_frozen = true;
            }
        } else if !disk_frozen {
            let next = shape.disk_mib.saturating_sub(DISK_STEP);
            if next >= policy.min.rspec.disk_mib && next < shape.disk_mib {
                shape.disk_mib = next;
            } else {
                disk_frozen = true;
            }
        } else if !vcpu_frozen {
            let next = shape.cpu.saturating_sub(VCPU_STEP);
            if next >= policy.min.rspec.cpu && next < shape.cpu {
                shape.cpu = next;
            } else {
                vcpu_frozen = true;
            }
        }
    }

    TieredReport { tiers, total, final_cluster: cluster, last_fail_stats }
}

/// Why a relocation attempt produced nothing.
#[derive(Clone, Debug)]
pub enum RelocateError {
    /// The instance's disk template has no mirror to relocate (plain/file).
    NotRelocatable,
    NoCapacity(BTreeMap<FailMode, u32>),
}

/// Move `inst_idx`'s secondary (internal mirror) or sole copy (external /// mirror) off of `forbidden`, to whichever eligible node scores lowest.
/// Never touches the instance's primary.
pub fn relocate(cluster: &ClusterData, inst_idx: Idx, forbidden: &[Idx], opts: &MoveOptions) -> Result<(ClusterData, Idx, Idx), RelocateError> {
    let inst = cluster.instances.find(inst_idx).expect("caller passes a valid instance index");
    let primary = inst.primary.expect("movable instance must have a primary");
    let exclude: Vec<Idx> = forbidden.iter().copied().chain(std::iter::once(primary)).collect();

    let moves: Vec<Move> = match inst.mirror_type() {
        MirrorType::Internal => eligible_targets(cluster, primary, &exclude)
.into_iter()
.map(Move::ReplaceSecondary)
.collect(),
        MirrorType::External => eligible_targets(cluster, primary, &exclude)
.into_iter()
.map(Move::FailoverToAny)
.collect(),
        MirrorType::None => return Err(RelocateError::NotRelocatable),
    };

    let mut best: Option<(f64, ClusterData, Idx, Idx)> = None;
    let mut fail_stats: BTreeMap<FailMode, u32> = BTreeMap::new();
    for mv in moves {
        match apply_move(cluster, inst_idx, mv, opts) {
            Ok(outcome) => {
                let score = compute_score(&outcome.cluster);
                let better = match &best {
                    None => true,
                    Some((bs,..)) => score < *bs,
                };
                if better {
                    let target = mv.target().expect("relocation moves always carry a target");
                    best = Some((score, outcome.cluster, outcome.new_primary, target));
                }
            }
            Err(fm) => *fail_stats.entry(fm).or_insert(0) += 1,
        }
    }

    best.map(|(_, cluster, new_primary, target)| (cluster, new_primary, target))
.ok_or(RelocateError::NoCapacity(fail_stats))
}

/// Which node role(s) must leave the evacuated set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvacMode {
    PrimaryOnly,
    SecondaryOnly,
    All,
}

#[derive(Clone, Debug)]
pub struct EvacOutcome {
    pub relocated: Vec<Idx>,
    pub failures: Vec<(Idx, RelocateError)>,
}

/// Relocate every instance with a role on `nodes` consistent with `mode`
///. Internal-mirror instances whose primary is being evacuated fail
/// over onto their secondary when that secondary is itself not being
/// evacuated, which is cheaper than a full replace-primary; otherwise they
/// get a `ReplacePrimary`/`FailoverToAny` onto a node outside the evac set.
pub fn evacuate_nodes(cluster: &ClusterData, nodes: &[Idx], mode: EvacMode, opts: &MoveOptions) -> (ClusterData, EvacOutcome) {
    let evac_set: BTreeSet<Idx> = nodes.iter().copied().collect();
    let mut cluster = cluster.clone();
    let mut relocated = Vec::new();
    let mut failures = Vec::new();

    let candidate_idxs: Vec<Idx> = cluster
.instances
.elems()
.filter(|i| {
            let p_bad = i.primary.is_some_and(|p| evac_set.contains(&p));
            let s_bad = i.secondary.is_some_and(|s| evac_set.contains(&s));
            match mode {
                EvacMode::PrimaryOnly => p_bad,
                EvacMode::SecondaryOnly => s_bad,
                EvacMode::All => p_bad || s_bad,
            }
        })
.map(|i| i.idx)
.collect();

    for idx in candidate_idxs {
        let inst = match cluster.instances.find(idx) {
            Some(i) => i.clone(),
            None => continue,
        };
        if !inst.movable {
            failures.push((idx, RelocateError::NotRelocatable));
            continue;
        }
        let primary_bad = inst.primary.is_some_and(|p| evac_set.contains(&p));
        let secondary_bad = inst.secondary.is_some_and(|s| evac_set.contains(&s));

        let wants_primary_fix = matches!(mode, EvacMode::PrimaryOnly | EvacMode::All) && primary_bad;
        let wants_secondary_fix =
            matches!(mode, EvacMode::SecondaryOnly | EvacMode::All) && secondary_bad;

        let mut ok = true;

        if wants_secondary_fix {
            match relocate(&cluster, idx, nodes, opts) {
                Ok((next, _primary, _new_secondary)) => cluster = next,
                Err(e) => {
                    failures.push((idx, e));
                    ok = false;
                }
            }
        }

        if ok && wants_primary_fix {
            let still_present = cluster.instances.find(idx).cloned();
            if let Some(inst) = still_present {
                let res = match inst.mirror_type() {
                    MirrorType::Internal => {
                        let secondary_ok =
                            inst.secondary.is_some_and(|s| !evac_set.contains(&s));
                        if secondary_ok {
                            apply_move(&cluster, idx, Move::Failover, opts)
.map(|o| (o.cluster, o.new_primary))
.map_err(|fm| {
                                    RelocateError::NoCapacity(BTreeMap::from([(fm, 1)]))
                                })
                        } else {
                            replace_primary_outside(&cluster, idx, nodes, opts)
                        }
                    }
                    MirrorType::External => replace_primary_outside(&cluster, idx, nodes, opts),
                    MirrorType::None => Err(RelocateError::NotRelocatable),
                };
                match res {
                    Ok((next, _new_primary)) => cluster = next,
                    Err(e) => {
                        failures.push((idx, e));
                        ok = false;
                    }
                }
            }
        }

        if ok {
            relocated.push(idx);
        }
    }

    (cluster, EvacOutcome { relocated, failures })
}

fn replace_primary_outside(cluster: &ClusterData, inst_idx: Idx, forbidden: &[Idx], opts: &MoveOptions) -> Result<(ClusterData, Idx), RelocateError> {
    let inst = cluster.instances.find(inst_idx).expect("caller passes a valid instance index");
    let primary = inst.primary.expect("movable instance must have a primary");

    let moves: Vec<Move> = match inst.mirror_type() {
        MirrorType::Internal => eligible_targets(cluster, primary, forbidden)
.into_iter()
.map(Move::ReplacePrimary)
.collect(),
        MirrorType::External => eligible_targets(cluster, primary, forbidden)
.into_iter()
.map(Move::FailoverToAny)
.collect(),
        MirrorType::None => return Err(RelocateError::NotRelocatable),
    };

    let mut best: Option<(f64, ClusterData, Idx)> = None;
    let mut fail_stats: BTreeMap<FailMode, u32> = BTreeMap::new();
    for mv in moves {
        match apply_move(cluster, inst_idx, mv, opts) {
            Ok(outcome) => {
                let score = compute_score(&outcome.cluster);
                let better = match &best {
                    None => true,
                    Some((bs,..)) => score < *bs,
                };
                if better {
                    best = Some((score, outcome.cluster, outcome.new_primary));
                }
            }
            Err(fm) => *fail_stats.entry(fm).or_insert(0) += 1,
        }
    }

    best.map(|(_, cluster, new_primary)| (cluster, new_primary))
.ok_or(RelocateError::NoCapacity(fail_stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::container::Container;
    use hbal_core::units::ISpec;
    use std::collections::BTreeSet as Set;

    fn policy() -> IPolicy {
        let min = ISpec::new(RSpec::new(1, 128, 1024), 1, 1, 1);
        let max = ISpec::new(RSpec::new(8, 16384, 102400), 4, 4, 8);
        IPolicy::new(min, min, max, vec![DiskTemplate::Drbd, DiskTemplate::Rbd], 4.0, 1.0).unwrap()
    }

    fn empty_cluster(n: usize) -> ClusterData {
        let mut nodes = Container::empty();
        for i in 0..n {
            let mut node = Node::create(
                format!("n{i}"), 32762, 1024, 32762, 1861, 1861, 4, false, 0, 8, Set::new(), 8,
            );
            node.idx = i as Idx;
            nodes.add(node);
        }
        ClusterData::new(Container::empty(), nodes, Container::empty(), vec![], policy())
    }

    #[test]
    fn allocates_drbd_instance_onto_distinct_primary_and_secondary() {
        let cluster = empty_cluster(3);
        let spec = AllocSpec {
            name: "new1".into(),
            mem_mib: 1024,
            disk_mib: 100,
            vcpus: 1,
            spindle_use: 1,
            disk_template: DiskTemplate::Drbd,
        };
        let success = try_allocate(&cluster, &spec).unwrap();
        assert_ne!(success.primary, success.secondary.unwrap());
        assert_eq!(success.cluster.instances.size(), 1);
    }

    #[test]
    fn allocation_fails_with_fail_stats_when_cluster_is_full() {
        let cluster = empty_cluster(1);
        let spec = AllocSpec {
            name: "huge".into(),
            mem_mib: 1_000_000,
            disk_mib: 100,
            vcpus: 1,
            spindle_use: 1,
            disk_template: DiskTemplate::Rbd,
        };
        let err = try_allocate(&cluster, &spec).unwrap_err();
        assert!(err.contains_key(&FailMode::FailMem));
    }

    #[test]
    fn tiered_allocate_terminates_and_reports_tiers() {
        let cluster = empty_cluster(4);
        let policy = policy();
        let report = tiered_allocate(
            &cluster,
            &policy,
            RSpec::new(1, 256, 2048),
            DiskTemplate::Rbd,
            1,
        );
        assert!(!report.tiers.is_empty());
        assert!(report.total > 0);
    }

    #[test]
    fn evacuate_primary_only_clears_the_node() {
        let cluster = empty_cluster(3);
        let spec = AllocSpec {
            name: "i0".into(),
            mem_mib: 1024,
            disk_mib: 100,
            vcpus: 1,
            spindle_use: 1,
            disk_template: DiskTemplate::Drbd,
        };
        let success = try_allocate(&cluster, &spec).unwrap();
        let (next, outcome) = evacuate_nodes(
            &success.cluster,
            &[success.primary],
            EvacMode::PrimaryOnly,
            &MoveOptions::default(),
        );
        assert!(outcome.failures.is_empty());
        let inst = next.instances.find(success.instance_idx).unwrap();
        assert_ne!(inst.primary, Some(success.primary));
    }

    proptest::proptest! {
        /// tiered shrinking never proposes a shape
        /// below the policy minimum in any dimension.
        #[test]
        fn tiered_allocate_never_shrinks_below_policy_min(n_nodes in 2usize..5) {
            let cluster = empty_cluster(n_nodes);
            let policy = policy();
            let report = tiered_allocate(
                &cluster,
                &policy,
                RSpec::new(4, 8192, 51200),
                DiskTemplate::Rbd,
                2,
            );
            for tier in &report.tiers {
                proptest::prop_assert!(tier.rspec.cpu >= policy.min.rspec.cpu);
                proptest::prop_assert!(tier.rspec.mem_mib >= policy.min.rspec.mem_mib);
                proptest::prop_assert!(tier.rspec.disk_mib >= policy.min.rspec.disk_mib);
            }
        }
    }
}
