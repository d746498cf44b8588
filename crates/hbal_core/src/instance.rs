//! Instance entity, run status, mirror-type classification, and the `Move`
//! variant.

use std::collections::BTreeSet;

use crate::container::Keyed;
use crate::units::DiskTemplate;
use crate::{Idx, NO_IDX};

use crate::units::DynUtil;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Instance run status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RunStatus {
    Running,
    AdminDown,
    ErrorUp,
    ErrorDown,
    NodeDown,
    NodeOffline,
    WrongNode,
    AdminOffline,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::AdminDown => "admin-down",
            RunStatus::ErrorUp => "error-up",
            RunStatus::ErrorDown => "error-down",
            RunStatus::NodeDown => "node-down",
            RunStatus::NodeOffline => "node-offline",
            RunStatus::WrongNode => "wrong-node",
            RunStatus::AdminOffline => "admin-offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s { "running" => RunStatus::Running, "admin-down" => RunStatus::AdminDown, "error-up" => RunStatus::ErrorUp, "error-down" => RunStatus::ErrorDown, "node-down" => RunStatus::NodeDown, "node-offline" => RunStatus::NodeOffline, "wrong-node" => RunStatus::WrongNode, "admin-offline" => RunStatus::AdminOffline, _ => return None, })
    }

    /// `isRunning`.
    pub fn is_running(self) -> bool {
        matches!(self, RunStatus::Running)
    }

    /// `instanceDown` : instance is not actually up anywhere.
    pub fn instance_down(self) -> bool {
        matches!(self, RunStatus::AdminDown | RunStatus::ErrorDown | RunStatus::NodeDown | RunStatus::AdminOffline)
    }

    /// `notOffline`.
    pub fn not_offline(self) -> bool {
        !matches!(self, RunStatus::AdminOffline | RunStatus::NodeOffline)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a disk template replicates across hosts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirrorType {
    /// Two hosts, synchronised block devices (e.g. drbd): has failover,
    /// replace-secondary, replace-primary, and composite moves.
    Internal,
    /// Shared storage reachable from any host: has `FailoverToAny` only.
    External,
    /// Neither: immovable for placement purposes.
    None,
}

impl DiskTemplate {
    /// `templateMirrorType`.
    pub fn mirror_type(self) -> MirrorType {
        match self {
            DiskTemplate::Drbd => MirrorType::Internal,
            DiskTemplate::SharedFile
            | DiskTemplate::Rbd
            | DiskTemplate::Block
            | DiskTemplate::Ext
            | DiskTemplate::Diskless => MirrorType::External,
            DiskTemplate::Plain | DiskTemplate::File => MirrorType::None,
        }
    }
}

/// A tagged move variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Move {
    Failover,
    FailoverToAny(Idx),
    ReplaceSecondary(Idx),
    ReplacePrimary(Idx),
    ReplaceAndFailover(Idx),
    FailoverAndReplace(Idx),
}

impl Move {
    /// Fixed ordinal used for deterministic tie-breaking.
    pub fn ordinal(&self) -> u8 {
        match self {
            Move::Failover => 0,
            Move::FailoverToAny(_) => 1,
            Move::ReplaceSecondary(_) => 2,
            Move::ReplacePrimary(_) => 3,
            Move::ReplaceAndFailover(_) => 4,
            Move::FailoverAndReplace(_) => 5,
        }
    }

    /// Target node index touched by this move, if any beyond the implicit
    /// failover swap.
    pub fn target(&self) -> Option<Idx> {
        match self {
            Move::Failover => None,
            Move::FailoverToAny(n)
            | Move::ReplaceSecondary(n)
            | Move::ReplacePrimary(n)
            | Move::ReplaceAndFailover(n)
            | Move::FailoverAndReplace(n) => Some(*n),
        }
    }

    /// True for moves that change the instance's primary node.
    pub fn changes_primary(&self) -> bool {
        matches!(
            self,
            Move::Failover
                | Move::FailoverToAny(_)
                | Move::ReplacePrimary(_)
                | Move::ReplaceAndFailover(_)
                | Move::FailoverAndReplace(_)
        )
    }

    /// True for moves whose variant is a "replace-disks" family member, i.e.
    /// not a plain failover (`no_disk_moves`).
    pub fn is_disk_move(&self) -> bool {
        !matches!(self, Move::Failover | Move::FailoverToAny(_))
    }
}

/// A single instance in the cluster snapshot.
#[derive(Clone, Debug)]
pub struct Instance {
    pub idx: Idx,
    pub name: String,
    pub alias: String,
    pub mem_mib: u64,
    pub disk_mib: u64,
    pub vcpus: u32,
    pub spindle_use: u32,
    pub primary: Option<Idx>,
    pub secondary: Option<Idx>,
    pub disk_template: DiskTemplate,
    pub run_status: RunStatus,
    pub auto_balance: bool,
    pub tags: BTreeSet<String>,
    pub util: DynUtil,
    pub movable: bool,
}

impl Instance {
    #[allow(clippy::too_many_arguments)]
    pub fn create(name: String, mem_mib: u64, disk_mib: u64, vcpus: u32, spindle_use: u32, primary: Option<Idx>, secondary: Option<Idx>, disk_template: DiskTemplate, run_status: RunStatus, auto_balance: bool, tags: BTreeSet<String>, util: DynUtil) -> Self {
        Instance {
            idx: NO_IDX,
            alias: name.clone(),
            name,
            mem_mib,
            disk_mib,
            vcpus,
            spindle_use,
            primary,
            secondary,
            disk_template,
            run_status,
            auto_balance,
            tags,
            util,
            movable: true,
        }
    }

    pub fn set_name(&self, name: String) -> Self {
        let mut next = self.clone();
        next.alias = name.clone();
        next.name = name;
        next
    }

    /// Set only the display alias, leaving `name` untouched (the /// loader's common-DNS-suffix stripping).
    pub fn set_alias(&self, alias: String) -> Self {
        let mut next = self.clone();
        next.alias = alias;
        next
    }

    pub fn set_primary(&self, primary: Option<Idx>) -> Self {
        let mut next = self.clone();
        next.primary = primary;
        next
    }

    pub fn set_secondary(&self, secondary: Option<Idx>) -> Self {
        let mut next = self.clone();
        next.secondary = secondary;
        next
    }

    pub fn set_both(&self, primary: Option<Idx>, secondary: Option<Idx>) -> Self {
        let mut next = self.clone();
        next.primary = primary;
        next.secondary = secondary;
        next
    }

    pub fn set_movable(&self, movable: bool) -> Self {
        let mut next = self.clone();
        next.movable = movable;
        next
    }

    pub fn is_running(&self) -> bool {
        self.run_status.is_running()
    }

    pub fn instance_down(&self) -> bool {
        self.run_status.instance_down()
    }

    pub fn not_offline(&self) -> bool {
        self.run_status.not_offline()
    }

    /// Every instance's disk-template mirror type.
    pub fn mirror_type(&self) -> MirrorType {
        self.disk_template.mirror_type()
    }

    /// §3 invariant check: internal-mirror instances must have a distinct
    /// secondary; external-mirror instances must not.
    pub fn invariant_ok(&self) -> bool {
        match self.mirror_type() {
            MirrorType::Internal => {
                matches!(self.secondary, Some(s) if Some(s) != self.primary)
            }
            MirrorType::External => self.secondary.is_none(),
            MirrorType::None => true,
        }
    }
}

impl Keyed for Instance {
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

    fn make(template: DiskTemplate, secondary: Option<Idx>) -> Instance {
        Instance::create(
            "i1".into(),
            1024,
            100,
            1,
            1,
            Some(0),
            secondary,
            template,
            RunStatus::Running,
            true,
            BTreeSet::new(),
            DynUtil::zero(),
        )
    }

    #[test]
    fn drbd_requires_distinct_secondary() {
        assert!(!make(DiskTemplate::Drbd, None).invariant_ok());
        assert!(!make(DiskTemplate::Drbd, Some(0)).invariant_ok());
        assert!(make(DiskTemplate::Drbd, Some(1)).invariant_ok());
    }

    #[test]
    fn external_mirror_forbids_secondary() {
        assert!(make(DiskTemplate::Rbd, None).invariant_ok());
        assert!(!make(DiskTemplate::Rbd, Some(1)).invariant_ok());
    }

    #[test]
    fn move_ordinals_are_fixed_and_monotonic() {
        let ords: Vec<u8> = [
            Move::Failover,
            Move::FailoverToAny(0),
            Move::ReplaceSecondary(0),
            Move::ReplacePrimary(0),
            Move::ReplaceAndFailover(0),
            Move::FailoverAndReplace(0),
        ]
.iter()
.map(|m| m.ordinal())
.collect();
        assert_eq!(ords, vec![0, 1, 2, 3, 4, 5]);
    }
}
