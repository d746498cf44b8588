//! Node entity and its pure operations.
//!
//! Node operations are pure: each returns either an updated `Node` or a
//! `FailMode` from the closed taxonomy. They never mutate self; callers
//! substitute the result back into the owning `Container`.

use std::collections::{BTreeMap, BTreeSet};

use crate::container::Keyed;
use crate::errors::FailMode;
use crate::instance::Instance;
use crate::units::DynUtil;
use crate::{Idx, NO_IDX};

#[derive(Clone, Debug)]
pub struct Node {
    pub idx: Idx,
    /// FQDN.
    pub name: String,
    /// Short alias (name with the common DNS suffix stripped).
    pub alias: String,

    // Capacities.
    pub t_mem: u64,
    pub t_dsk: u64,
    pub t_cpu: u32,
    pub t_spindles: u32,
    pub t_disk_free: u64,
    pub t_mem_node: u64,

    // Current / free.
    pub f_mem: i64,
    pub f_dsk: i64,
    pub f_spindles: i64,
    pub x_mem: u64,

    // Back-references.
    pub p_list: Vec<Idx>,
    pub s_list: Vec<Idx>,

    // Derived sums over p_list / s_list.
    pub p_mem: u64,
    pub p_dsk: u64,
    pub p_cpu: u32,
    pub p_spindles: u32,
    pub p_rem: i64,

    /// Reserved memory: max over `peers`.
    pub r_mem: u64,
    /// Per-peer-node aggregated secondary memory.
    pub peers: BTreeMap<Idx, u64>,

    pub fail_n1: bool,

    pub offline: bool,
    pub drained: bool,
    pub vm_capable: bool,
    pub master_capable: bool,
    pub group: Idx,
    /// Minimum free-disk ratio.
    pub m_dsk: f64,
    /// Maximum vcpu-overcommit ratio.
    pub m_cpu: f64,
    pub u_load: DynUtil,
    pub tags: BTreeSet<String>,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn create(name: String, t_mem: u64, t_mem_node: u64, f_mem: i64, t_dsk: u64, f_dsk: i64, t_cpu: u32, offline: bool, group: Idx, t_spindles: u32, tags: BTreeSet<String>, f_spindles: i64) -> Self {
        Node {
            idx: NO_IDX,
            alias: name.clone(),
            name,
            t_mem,
            t_dsk,
            t_cpu,
            t_spindles,
            t_disk_free: t_dsk,
            t_mem_node,
            f_mem,
            f_dsk,
            f_spindles,
            x_mem: 0,
            p_list: Vec::new(),
            s_list: Vec::new(),
            p_mem: 0,
            p_dsk: 0,
            p_cpu: 0,
            p_spindles: 0,
            p_rem: 0,
            r_mem: 0,
            peers: BTreeMap::new(),
            fail_n1: false,
            offline,
            drained: false,
            vm_capable: true,
            master_capable: true,
            group,
            m_dsk: 0.0,
            m_cpu: 4.0,
            u_load: DynUtil::zero(),
            tags,
        }
    }

    fn free_disk_ratio(&self) -> f64 {
        if self.t_dsk == 0 {
            0.0
        } else {
            self.f_dsk as f64 / self.t_dsk as f64
        }
    }

    fn vcpu_ratio(&self) -> f64 {
        if self.t_cpu == 0 {
            0.0
        } else {
            self.p_cpu as f64 / self.t_cpu as f64
        }
    }

    /// Recompute `r_mem` from `peers` and the `failN1` predicate.
    fn recompute_derived(&mut self) {
        self.r_mem = self.peers.values().copied().max().unwrap_or(0);
        self.fail_n1 = (self.f_mem as i64) < (self.r_mem as i64)
            || self.f_dsk < 0
            || self.f_spindles < 0
            || self.vcpu_ratio() > self.m_cpu;
    }

    fn capacity_check(&self) -> Option<FailMode> {
        if self.f_mem < 0 {
            return Some(FailMode::FailMem);
        }
        if self.free_disk_ratio() < self.m_dsk {
            return Some(FailMode::FailDisk);
        }
        if self.vcpu_ratio() > self.m_cpu {
            return Some(FailMode::FailCpu);
        }
        if self.fail_n1 {
            return Some(FailMode::FailN1);
        }
        None
    }

    /// Add `inst` to `p_list`, updating derived sums and the N+1 flag.
    pub fn set_pri(&self, inst: &Instance) -> Result<Node, FailMode> {
        let mut next = self.clone();
        next.p_list.push(inst.idx);
        next.p_mem += inst.mem_mib;
        next.p_dsk += inst.disk_mib;
        next.p_cpu += inst.vcpus;
        next.p_spindles += inst.spindle_use;
        next.f_mem -= inst.mem_mib as i64;
        next.f_dsk -= inst.disk_mib as i64;
        next.f_spindles -= inst.spindle_use as i64;
        next.u_load = next.u_load + inst.util;
        next.recompute_derived();
        if let Some(fm) = next.capacity_check() {
            return Err(fm);
        }
        Ok(next)
    }

    /// Undo `set_pri`.
    pub fn remove_pri(&self, inst: &Instance) -> Node {
        let mut next = self.clone();
        next.p_list.retain(|&i| i != inst.idx);
        next.p_mem = next.p_mem.saturating_sub(inst.mem_mib);
        next.p_dsk = next.p_dsk.saturating_sub(inst.disk_mib);
        next.p_cpu = next.p_cpu.saturating_sub(inst.vcpus);
        next.p_spindles = next.p_spindles.saturating_sub(inst.spindle_use);
        next.f_mem += inst.mem_mib as i64;
        next.f_dsk += inst.disk_mib as i64;
        next.f_spindles += inst.spindle_use as i64;
        next.u_load = next.u_load - inst.util;
        next.recompute_derived();
        next
    }

    /// Add `inst` to `s_list`; `primary` is the instance's primary node index,
    /// used to key the `peers` map.
    pub fn set_sec(&self, inst: &Instance, primary: Idx) -> Result<Node, FailMode> {
        let mut next = self.clone();
        next.s_list.push(inst.idx);
        *next.peers.entry(primary).or_insert(0) += inst.mem_mib;
        next.recompute_derived();
        if let Some(fm) = next.capacity_check() {
            return Err(fm);
        }
        Ok(next)
    }

    /// Undo `set_sec`.
    pub fn remove_sec(&self, inst: &Instance, primary: Idx) -> Node {
        let mut next = self.clone();
        next.s_list.retain(|&i| i != inst.idx);
        if let Some(v) = next.peers.get_mut(&primary) {
            *v = v.saturating_sub(inst.mem_mib);
            if *v == 0 {
                next.peers.remove(&primary);
            }
        }
        next.recompute_derived();
        next
    }

    /// Recompute `peers` entirely from the instance list. Used by
    /// the loader and, in debug assertions, to cross-check the incremental
    /// updates `set_sec`/`remove_sec` perform on every move.
    pub fn build_peers(&self, instances: &[&Instance]) -> Node {
        let mut next = self.clone();
        let mut peers = BTreeMap::new();
        for inst in instances {
            if inst.secondary == Some(self.idx) {
                if let Some(primary) = inst.primary {
                    *peers.entry(primary).or_insert(0) += inst.mem_mib;
                }
            }
        }
        next.peers = peers;
        next.recompute_derived();
        next
    }

    /// Set only the display alias, leaving `name` untouched.
    pub fn set_alias(&self, alias: String) -> Node {
        let mut next = self.clone();
        next.alias = alias;
        next
    }

    pub fn set_offline(&self, offline: bool) -> Node {
        let mut next = self.clone();
        next.offline = offline;
        next.recompute_derived();
        next
    }

    pub fn set_drained(&self, drained: bool) -> Node {
        let mut next = self.clone();
        next.drained = drained;
        next
    }

    pub fn set_mdsk(&self, m_dsk: f64) -> Node {
        let mut next = self.clone();
        next.m_dsk = m_dsk;
        next.recompute_derived();
        next
    }

    pub fn set_mcpu(&self, m_cpu: f64) -> Node {
        let mut next = self.clone();
        next.m_cpu = m_cpu;
        next.recompute_derived();
        next
    }

    /// Apply a group's policy ratios (vcpu/spindle overcommit) to this node
    /// (8).
    pub fn set_policy(&self, m_cpu: f64, m_dsk: f64) -> Node {
        let mut next = self.clone();
        next.m_cpu = m_cpu;
        next.m_dsk = m_dsk;
        next.recompute_derived();
        next
    }

    pub fn is_online_vm_capable(&self) -> bool {
        !self.offline && self.vm_capable
    }
}

impl Keyed for Node {
    fn idx(&self) -> Idx {
        self.idx
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn alias(&self) -> &str {
        &self.alias
    }
    fn set_idx(&mut self, idx: Idx) {
        self.idx = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::RunStatus;
    use crate::units::DiskTemplate;

    fn node() -> Node {
        let mut n = Node::create(
            "node1".into(),
            32762,
            1024,
            32762,
            1861,
            1861,
            4,
            false,
            0,
            8,
            BTreeSet::new(),
            8,
        );
        n.idx = 0;
        n
    }

    fn inst(mem: u64, disk: u64, vcpus: u32) -> Instance {
        let mut i = Instance::create(
            "i1".into(),
            mem,
            disk,
            vcpus,
            1,
            Some(0),
            None,
            DiskTemplate::Plain,
            RunStatus::Running,
            true,
            BTreeSet::new(),
            DynUtil::zero(),
        );
        i.idx = 0;
        i
    }

    #[test]
    fn set_then_remove_pri_is_identity() {
        let n = node();
        let i = inst(1024, 100, 1);
        let n2 = n.set_pri(&i).unwrap();
        assert_eq!(n2.p_mem, 1024);
        assert_eq!(n2.f_mem, n.f_mem - 1024);
        let n3 = n2.remove_pri(&i);
        assert_eq!(n3.p_mem, 0);
        assert_eq!(n3.f_mem, n.f_mem);
    }

    #[test]
    fn set_pri_overcommit_fails_mem() {
        let n = node();
        let i = inst(100_000, 100, 1);
        assert!(matches!(n.set_pri(&i), Err(FailMode::FailMem)));
    }

    #[test]
    fn r_mem_is_max_of_peers() {
        let n = node();
        let mut i1 = inst(1024, 100, 1);
        i1.idx = 1;
        i1.primary = Some(5);
        let mut i2 = inst(2048, 100, 1);
        i2.idx = 2;
        i2.primary = Some(6);
        let n2 = n.set_sec(&i1, 5).unwrap();
        let n3 = n2.set_sec(&i2, 6).unwrap();
        assert_eq!(n3.r_mem, 2048);
    }
}
