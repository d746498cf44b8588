//! Instance table renderer (`--print-instances`).

use hbal_core::{ClusterData, Instance};

pub const DEFAULT_FIELDS: &[&str] =
    &["name", "mem", "disk", "vcpus", "template", "status", "primary", "secondary", "movable"];

fn field_value(cluster: &ClusterData, inst: &Instance, field: &str) -> String {
    match field {
        "name" => inst.alias.clone(),
        "mem" => inst.mem_mib.to_string(),
        "disk" => inst.disk_mib.to_string(),
        "vcpus" => inst.vcpus.to_string(),
        "template" => format!("{:?}", inst.disk_template).to_lowercase(),
        "status" => inst.run_status.to_string(),
        "primary" => node_alias(cluster, inst.primary),
        "secondary" => node_alias(cluster, inst.secondary),
        "movable" => inst.movable.to_string(),
        "tags" => inst.tags.iter().cloned().collect::<Vec<_>>().join(","),
        other => format!("?{other}"),
    }
}

fn node_alias(cluster: &ClusterData, idx: Option<hbal_core::Idx>) -> String {
    match idx {
        None => "-".to_string(),
        Some(i) => cluster.nodes.find(i).map(|n| n.alias.clone()).unwrap_or_else(|| "?".to_string()),
    }
}

pub fn render(cluster: &ClusterData, fields: &[String]) -> String {
    let headers: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
    let rows: Vec<Vec<String>> = cluster
.instances
.elems()
.map(|i| fields.iter().map(|f| field_value(cluster, i, f)).collect())
.collect();
    crate::table::render(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbal_core::container::Container;
    use hbal_core::instance::RunStatus;
    use hbal_core::units::{DiskTemplate, DynUtil, IPolicy, ISpec, RSpec};
    use hbal_core::Node;
    use std::collections::BTreeSet;

    #[test]
    fn render_resolves_primary_alias() {
        let mut nodes = Container::empty();
        let mut n = Node::create("n0".into(), 32762, 1024, 32762, 1861, 1861, 4, false, 0, 8, BTreeSet::new(), 8);
        n.idx = 0;
        nodes.add(n);

        let mut instances = Container::empty();
        let mut inst = Instance::create(
            "i1".into(), 1024, 100, 1, 1, Some(0), None, DiskTemplate::Plain,
            RunStatus::Running, true, BTreeSet::new(), DynUtil::zero(),
        );
        inst.idx = 0;
        instances.add(inst);

        let spec = ISpec::new(RSpec::new(1, 128, 1024), 1, 1, 1);
        let max = ISpec::new(RSpec::new(8, 16384, 102400), 4, 4, 8);
        let policy = IPolicy::new(spec, spec, max, vec![DiskTemplate::Plain], 4.0, 1.0).unwrap();
        let cluster = ClusterData::new(Container::empty(), nodes, instances, vec![], policy);

        let fields: Vec<String> = vec!["name".into(), "primary".into()];
        let out = render(&cluster, &fields);
        assert!(out.contains("i1"));
        assert!(out.contains("n0"));
    }
}
