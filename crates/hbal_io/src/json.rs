//! Remote-API JSON loader : four independent streams — groups, nodes,
//! instances, cluster tags — each a JSON array of objects. Keys are pulled
//! out by name; this module produces the same [`RawCluster`](crate::text::RawCluster)
//! shape the textual loader does, so [`crate::merge`] only has one consumer
//! to satisfy.

use serde_json::Value;

use crate::errors::IoError;
use crate::text::{RawCluster, RawGroup, RawInstance, RawNode};

const OWNER: &str = "--rapi";

fn err(detail: impl Into<String>) -> IoError {
    IoError::Parse { owner: OWNER, detail: detail.into() }
}

fn get_str(v: &Value, key: &str) -> Result<String, IoError> {
    v.get(key)
.and_then(Value::as_str)
.map(str::to_string)
.ok_or_else(|| err(format!("missing or non-string field {key:?}")))
}

fn get_str_opt(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn get_u64(v: &Value, key: &str) -> Result<u64, IoError> {
    v.get(key)
.and_then(Value::as_u64)
.ok_or_else(|| err(format!("missing or non-integer field {key:?}")))
}

fn get_i64(v: &Value, key: &str) -> Result<i64, IoError> {
    v.get(key)
.and_then(Value::as_i64)
.ok_or_else(|| err(format!("missing or non-integer field {key:?}")))
}

fn get_bool(v: &Value, key: &str, default: bool) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn get_tags(v: &Value) -> Vec<String> {
    v.get("tags")
.and_then(Value::as_array)
.map(|a| a.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
.unwrap_or_default()
}

fn parse_group(v: &Value) -> Result<RawGroup, IoError> {
    Ok(RawGroup {
        name: get_str(v, "name")?,
        uuid: get_str(v, "uuid")?,
        alloc_policy: get_str(v, "alloc_policy")?,
        tags: get_tags(v),
        networks: Vec::new(),
    })
}

/// The remote API reports memory/disk as already-integer MiB totals under
/// `mtotal`/`mnode`/`mfree`/`dtotal`/`dfree` ; `ctotal` is vcpu count.
fn parse_node(v: &Value) -> Result<RawNode, IoError> {
    let offline = get_bool(v, "offline", false);
    let master_capable = get_bool(v, "master_capable", false);
    let role = if offline {
        'Y'
    } else if master_capable {
        'M'
    } else {
        'N'
    };
    let group_uuid = v
.get("group.uuid")
.and_then(Value::as_str)
.or_else(|| v.pointer("/group/uuid").and_then(Value::as_str))
.ok_or_else(|| err("missing field \"group.uuid\""))?
.to_string();
    Ok(RawNode {
        name: get_str(v, "name")?,
        t_mem: get_u64(v, "mtotal")?,
        mem_node: get_u64(v, "mnode")?,
        f_mem: get_i64(v, "mfree")?,
        t_dsk: get_u64(v, "dtotal")?,
        f_dsk: get_i64(v, "dfree")?,
        t_cpu: get_u64(v, "ctotal")? as u32,
        offline_role: role,
        group_uuid,
        t_spindles: v.get("spindles_total").and_then(Value::as_u64).unwrap_or(0) as u32,
        tags: get_tags(v),
        excl_storage: get_bool(v, "excl_storage", false),
        f_spindles: v.get("spindles_free").and_then(Value::as_i64).unwrap_or(0),
        n_vcpus: get_u64(v, "ctotal")? as u32,
        cpu_speed: v.get("cpu_speed").and_then(Value::as_f64).unwrap_or(1.0),
    })
}

/// `beparams.{memory,vcpus,auto_balance}` carry the wanted shape; `oper_ram`
/// is the observed runtime footprint and is kept only as a fallback when
/// `beparams.memory` is absent.
fn parse_instance(v: &Value) -> Result<RawInstance, IoError> {
    let beparams = v.get("beparams");
    let mem = beparams
.and_then(|b| b.get("memory"))
.and_then(Value::as_u64)
.or_else(|| v.get("oper_ram").and_then(Value::as_u64))
.ok_or_else(|| err("missing field \"beparams.memory\" / \"oper_ram\""))?;
    let vcpus = beparams
.and_then(|b| b.get("vcpus"))
.and_then(Value::as_u64)
.ok_or_else(|| err("missing field \"beparams.vcpus\""))? as u32;
    let auto_balance = beparams
.and_then(|b| b.get("auto_balance"))
.and_then(Value::as_bool)
.unwrap_or(true);
    let snodes = v.get("snodes").and_then(Value::as_array);
    let snode = snodes
.and_then(|a| a.first())
.and_then(Value::as_str)
.map(str::to_string);
    Ok(RawInstance {
        name: get_str(v, "name")?,
        mem,
        disk: v.get("disk_usage").and_then(Value::as_u64).unwrap_or(0),
        vcpus,
        status: get_str(v, "status")?,
        auto_balance,
        pnode: get_str(v, "pnode")?,
        snode,
        disk_template: get_str(v, "disk_template")?,
        tags: get_tags(v),
        spindle_use: v.get("spindle_use").and_then(Value::as_u64).unwrap_or(1) as u32,
        actual_spindles: v.get("spindle_use").and_then(Value::as_u64).unwrap_or(1) as u32,
    })
}

/// Parse the four remote-API JSON streams into a [`RawCluster`].
/// `ipolicies` is not part of the remote-API key list in §6, so this mode
/// yields an empty ipolicy section; callers supply a default/override
/// `IPolicy` the way `--max-cpu`/`--min-disk` already override node fields.
pub fn parse_rapi(groups: &Value, nodes: &Value, instances: &Value, tags: &Value) -> Result<RawCluster, IoError> {
    let as_array = |v: &Value, what: &str| -> Result<&Vec<Value>, IoError> {
        v.as_array().ok_or_else(|| err(format!("{what} stream is not a JSON array")))
    };

    let groups = as_array(groups, "groups")?
.iter()
.map(parse_group)
.collect::<Result<Vec<_>, _>>()?;
    let nodes = as_array(nodes, "nodes")?
.iter()
.map(parse_node)
.collect::<Result<Vec<_>, _>>()?;
    let instances = as_array(instances, "instances")?
.iter()
.map(parse_instance)
.collect::<Result<Vec<_>, _>>()?;
    let cluster_tags = as_array(tags, "tags")?
.iter()
.filter_map(|t| t.as_str().map(str::to_string))
.collect();

    Ok(RawCluster { groups, nodes, instances, cluster_tags, ipolicies: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_node_stream() {
        let nodes = json!([{ "name": "node1.example.com", "mtotal": 32762, "mnode": 1024, "mfree": 7280, "dtotal": 1861, "dfree": 1026, "ctotal": 4, "offline": false, "group.uuid": "uuid-g1", }]);
        let parsed = parse_node(&nodes[0]).unwrap();
        assert_eq!(parsed.name, "node1.example.com");
        assert_eq!(parsed.t_mem, 32762);
        assert_eq!(parsed.group_uuid, "uuid-g1");
        assert_eq!(parsed.offline_role, 'N');
    }

    #[test]
    fn parses_instance_beparams() {
        let inst = json!({ "name": "inst1", "status": "running", "pnode": "node1.example.com", "snodes": ["node2.example.com"], "disk_template": "drbd", "disk_usage": 100, "beparams": {"memory": 1024, "vcpus": 1, "auto_balance": true}, });
        let parsed = parse_instance(&inst).unwrap();
        assert_eq!(parsed.mem, 1024);
        assert_eq!(parsed.vcpus, 1);
        assert_eq!(parsed.snode.as_deref(), Some("node2.example.com"));
    }

    #[test]
    fn rejects_non_array_stream() {
        let bad = json!({"not": "an array"});
        assert!(parse_rapi(&bad, &bad, &bad, &bad).is_err());
    }
}
