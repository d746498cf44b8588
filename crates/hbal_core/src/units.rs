//! Resource value types: `RSpec`, `ISpec`, `IPolicy`, `DynUtil`, `DiskTemplate`.

use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A resource triple: CPU count, memory (MiB), disk (MiB).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RSpec {
    pub cpu: u32,
    pub mem_mib: u64,
    pub disk_mib: u64,
}

impl RSpec {
    pub fn new(cpu: u32, mem_mib: u64, disk_mib: u64) -> Self {
        RSpec { cpu, mem_mib, disk_mib }
    }
}

/// An `RSpec` plus disk-count, NIC-count, and spindle-use; used in policy
/// min/std/max triples.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ISpec {
    pub rspec: RSpec,
    pub disk_count: u32,
    pub nic_count: u32,
    pub spindle_use: u32,
}

impl ISpec {
    pub fn new(rspec: RSpec, disk_count: u32, nic_count: u32, spindle_use: u32) -> Self {
        ISpec { rspec, disk_count, nic_count, spindle_use }
    }

    /// The six fields considered by `spec_matches` , in a fixed order.
    fn fields(&self) -> [u64; 6] {
        [
            self.rspec.cpu as u64,
            self.rspec.mem_mib,
            self.rspec.disk_mib,
            self.disk_count as u64,
            self.nic_count as u64,
            self.spindle_use as u64,
        ]
    }
}

/// Disk template tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DiskTemplate {
    Diskless,
    Plain,
    Drbd,
    File,
    SharedFile,
    Block,
    Rbd,
    Ext,
}

impl DiskTemplate {
    pub const ALL: [DiskTemplate; 8] = [
        DiskTemplate::Diskless,
        DiskTemplate::Plain,
        DiskTemplate::Drbd,
        DiskTemplate::File,
        DiskTemplate::SharedFile,
        DiskTemplate::Block,
        DiskTemplate::Rbd,
        DiskTemplate::Ext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiskTemplate::Diskless => "diskless",
            DiskTemplate::Plain => "plain",
            DiskTemplate::Drbd => "drbd",
            DiskTemplate::File => "file",
            DiskTemplate::SharedFile => "shared-file",
            DiskTemplate::Block => "block",
            DiskTemplate::Rbd => "rbd",
            DiskTemplate::Ext => "ext",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
.into_iter()
.find(|t| t.as_str() == s)
.ok_or(CoreError::UnknownDiskTemplate)
    }
}

impl std::fmt::Display for DiskTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triple of `ISpec` (min, std, max), allowed disk templates, overcommit
/// ratios.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IPolicy {
    pub min: ISpec,
    pub std: ISpec,
    pub max: ISpec,
    pub disk_templates: Vec<DiskTemplate>,
    /// VCPU-overcommit ratio; must be >= 1.0.
    pub vcpu_ratio: f64,
    /// Spindle ratio; must be > 0.
    pub spindle_ratio: f64,
}

impl IPolicy {
    pub fn new(min: ISpec, std: ISpec, max: ISpec, disk_templates: Vec<DiskTemplate>, vcpu_ratio: f64, spindle_ratio: f64) -> Result<Self, CoreError> {
        if vcpu_ratio < 1.0 {
            return Err(CoreError::InvalidPolicy("vcpu_ratio must be >= 1.0"));
        }
        if spindle_ratio <= 0.0 {
            return Err(CoreError::InvalidPolicy("spindle_ratio must be > 0"));
        }
        Ok(IPolicy { min, std, max, disk_templates, vcpu_ratio, spindle_ratio })
    }

    /// True iff every field of `spec` lies within `self.min()`/`self.max()`,
    /// inclusive.
    pub fn spec_matches(&self, spec: &ISpec) -> bool {
        let lo = self.min.fields();
        let hi = self.max.fields();
        let v = spec.fields();
        (0..6).all(|i| v[i] >= lo[i] && v[i] <= hi[i])
    }

    pub fn allows_template(&self, t: DiskTemplate) -> bool {
        self.disk_templates.contains(&t)
    }
}

/// Four non-negative weights describing relative dynamic load. Addition
/// and subtraction are componentwise.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DynUtil {
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
    pub net: f64,
}

impl DynUtil {
    pub fn new(cpu: f64, mem: f64, disk: f64, net: f64) -> Self {
        DynUtil { cpu, mem, disk, net }
    }

    pub fn zero() -> Self {
        DynUtil::default()
    }
}

impl std::ops::Add for DynUtil {
    type Output = DynUtil;
    fn add(self, rhs: DynUtil) -> DynUtil {
        DynUtil {
            cpu: self.cpu + rhs.cpu,
            mem: self.mem + rhs.mem,
            disk: self.disk + rhs.disk,
            net: self.net + rhs.net,
        }
    }
}

impl std::ops::Sub for DynUtil {
    type Output = DynUtil;
    fn sub(self, rhs: DynUtil) -> DynUtil {
        DynUtil {
            cpu: self.cpu - rhs.cpu,
            mem: self.mem - rhs.mem,
            disk: self.disk - rhs.disk,
            net: self.net - rhs.net,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(cpu: u32, mem: u64, disk: u64) -> ISpec {
        ISpec::new(RSpec::new(cpu, mem, disk), 1, 1, 1)
    }

    #[test]
    fn spec_matches_within_bounds() {
        let pol = IPolicy::new(
            spec(1, 128, 1024),
            spec(1, 1024, 10240),
            spec(8, 16384, 102400),
            vec![DiskTemplate::Plain, DiskTemplate::Drbd],
            4.0,
            1.0,
        )
.unwrap();
        assert!(pol.spec_matches(&spec(2, 2048, 20480)));
        assert!(!pol.spec_matches(&spec(16, 2048, 20480)));
        assert!(!pol.spec_matches(&spec(2, 64, 20480)));
    }

    #[test]
    fn dyn_util_componentwise() {
        let a = DynUtil::new(1.0, 2.0, 3.0, 4.0);
        let b = DynUtil::new(0.5, 0.5, 0.5, 0.5);
        let sum = a + b;
        assert_eq!(sum.cpu, 1.5);
        let diff = a - b;
        assert_eq!(diff.net, 3.5);
    }

    #[test]
    fn disk_template_roundtrip() {
        for t in DiskTemplate::ALL {
            assert_eq!(DiskTemplate::parse(t.as_str()).unwrap(), t);
        }
        assert!(DiskTemplate::parse("bogus").is_err());
    }
}
