//! Tiered-allocation capacity report : one row per exhausted
//! resource tier plus an aggregate totals row.

use hbal_pipeline::allocate::TieredReport;

pub fn render(report: &TieredReport) -> String {
    let headers = ["cpu", "mem_mib", "disk_mib", "spindle_use", "count"];
    let mut rows: Vec<Vec<String>> = report
.tiers
.iter()
.map(|t| {
            vec![
                t.rspec.cpu.to_string(),
                t.rspec.mem_mib.to_string(),
                t.rspec.disk_mib.to_string(),
                t.spindle_use.to_string(),
                t.count.to_string(),
            ]
        })
.collect();
    rows.push(vec!["-".into(), "-".into(), "-".into(), "-".into(), report.total.to_string()]);

    let mut out = crate::table::render(&headers, &rows);
    if !report.last_fail_stats.is_empty() {
        out.push_str("\nfailed to allocate further instances:\n");
        for (mode, count) in &report.last_fail_stats {
            out.push_str(&format!(" {mode:?}: {count}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::container::Container;
    use hbal_core::units::{DiskTemplate, IPolicy, ISpec, RSpec};
    use hbal_core::ClusterData;
    use hbal_pipeline::allocate::TierResult;
    use std::collections::BTreeMap;

    fn empty_cluster() -> ClusterData {
        let spec = ISpec::new(RSpec::new(1, 128, 1024), 1, 1, 1);
        let max = ISpec::new(RSpec::new(8, 16384, 102400), 4, 4, 8);
        let policy = IPolicy::new(spec, spec, max, vec![DiskTemplate::Plain], 4.0, 1.0).unwrap();
        ClusterData::new(Container::empty(), Container::empty(), Container::empty(), vec![], policy)
    }

    #[test]
    fn render_includes_a_totals_row_and_each_tier() {
        let report = TieredReport {
            tiers: vec![
                TierResult { rspec: RSpec::new(4, 16384, 102400), spindle_use: 4, count: 3 },
                TierResult { rspec: RSpec::new(2, 8192, 51200), spindle_use: 2, count: 5 },
            ],
            total: 8,
            final_cluster: empty_cluster(),
            last_fail_stats: BTreeMap::new(),
        };
        let out = render(&report);
        assert!(out.contains("16384"));
        assert!(out.contains("8192"));
        assert!(out.contains("8"));
    }
}
