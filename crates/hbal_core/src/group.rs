//! Node group entity.

use crate::container::Keyed;
use crate::units::IPolicy;
use crate::Idx;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Allocation eligibility of a group, used by the group dispatcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum AllocPolicy {
    Preferred,
    LastResort,
    Unallocable,
}

impl AllocPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AllocPolicy::Preferred => "preferred",
            AllocPolicy::LastResort => "last_resort",
            AllocPolicy::Unallocable => "unallocable",
        }
    }

    /// Accepts the canonical `last_resort` spelling as well as the
    /// hyphenated `last-resort` some textual inputs use.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s { "preferred" => AllocPolicy::Preferred, "last_resort" | "last-resort" => AllocPolicy::LastResort, "unallocable" => AllocPolicy::Unallocable, _ => return None, })
    }
}

#[derive(Clone, Debug)]
pub struct Group {
    pub idx: Idx,
    pub name: String,
    pub alias: String,
    pub uuid: String,
    pub alloc_policy: AllocPolicy,
    pub ipolicy: IPolicy,
    pub tags: Vec<String>,
    pub networks: Vec<String>,
}

impl Group {
    pub fn new(name: String, uuid: String, alloc_policy: AllocPolicy, ipolicy: IPolicy, tags: Vec<String>, networks: Vec<String>) -> Self {
        Group {
            idx: crate::NO_IDX,
            alias: name.clone(),
            name,
            uuid,
            alloc_policy,
            ipolicy,
            tags,
            networks,
        }
    }
}

impl Keyed for Group {
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
