// crates/hbal_cli/src/main.rs
//
// hbal — CLI entrypoint for the cluster placement and balancing engine.
// Drives the loader, the group dispatcher, and the greedy balancer, then
// renders whichever reports the flags asked for. Strictly offline and
// deterministic: no network, no OS RNG, no live cluster mutation.

mod args;
mod exit;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use args::{parse_and_validate, Args};
use hbal_algo::moves::MoveOptions;
use hbal_core::units::DynUtil;
use hbal_core::ClusterData;
use hbal_io::merge::MergeInput;
use hbal_io::text::RawCluster;
use hbal_pipeline::balance::{balance, BalanceOptions};
use hbal_pipeline::group_dispatch::{select_group, sub_cluster_for_group};
use std::collections::BTreeMap;

fn main() -> ExitCode {
    let args = match parse_and_validate() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("hbal: error: {e}");
            return exit::cli_parse();
        }
    };

    init_tracing(&args);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("hbal: error: {e}");
            exit::algorithmic()
        }
    }
}

fn init_tracing(args: &Args) {
    use tracing_subscriber::EnvFilter;

    let default_level = if args.quiet {
        "warn"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn run(args: Args) -> Result<ExitCode, String> {
    if args.luxi.is_some() {
        return Err("--luxi: not implemented (live job-queue RPC is out of scope)".to_string());
    }

    tracing::info!("loading cluster snapshot");
    let raw = load_raw(&args)?;

    let input = MergeInput {
        raw,
        util_overlay: BTreeMap::<String, DynUtil>::new(),
        extags: args.exclusion_tags_list(),
        selinsts: args.select_instances_list(),
        exinsts: args.exclude_instances_list(),
    };
    let mut cluster = hbal_io::load_cluster(input).map_err(|e| e.to_string())?;
    apply_policy_overrides(&mut cluster, &args);

    let group_idx = select_group(&cluster, args.group.as_deref()).map_err(|e| e.to_string())?;
    let sub_cluster = sub_cluster_for_group(&cluster, group_idx);

    let move_opts = MoveOptions {
        no_disk_moves: args.no_disk_moves,
        no_instance_moves: args.no_instance_moves,
        evac_mode: args.evac_mode,
        restricted_migration: args.restricted_migration,
        exclusion_tags: args.exclusion_tags_list(),
    };
    let default_balance = BalanceOptions::default();
    let balance_opts = BalanceOptions {
        moves: move_opts,
        min_score: args.min_score.unwrap_or(default_balance.min_score),
        max_length: args.max_length,
        min_gain: args.min_gain.unwrap_or(default_balance.min_gain),
        min_gain_limit: args.min_gain_limit.unwrap_or(default_balance.min_gain_limit),
    };

    tracing::info!(
        initial_score = hbal_algo::score::compute_score(&sub_cluster),
        "starting balance"
    );
    let result = balance(&sub_cluster, &balance_opts);
    tracing::info!(
        placements = result.placements.len() as u64,
        final_score = result.final_score,
        "balance complete"
    );

    render_outputs(&args, &sub_cluster, &result)?;

    if !args.quiet && !args.machine_readable_on() {
        println!(
            "hbal: {} placements, score {:.6} -> {:.6}",
            result.placements.len(),
            result.initial_score,
            result.final_score
        );
    } else if args.machine_readable_on() {
        println!("placements={} initial_score={:.6} final_score={:.6}",
            result.placements.len(), result.initial_score, result.final_score);
    }

    Ok(exit::success())
}

fn load_raw(args: &Args) -> Result<RawCluster, String> {
    if let Some(path) = &args.text_data {
        let text = fs::read_to_string(path).map_err(|e| format!("--text-data {}: {e}", path.display()))?;
        return hbal_io::parse_text(&text).map_err(|e| e.to_string());
    }
    if let Some(dir) = &args.rapi {
        let groups = read_json(dir, "groups.json")?;
        let nodes = read_json(dir, "nodes.json")?;
        let instances = read_json(dir, "instances.json")?;
        let tags = read_json(dir, "tags.json")?;
        return hbal_io::json::parse_rapi(&groups, &nodes, &instances, &tags).map_err(|e| e.to_string());
    }
    Err("no input source given".to_string())
}

fn read_json(dir: &Path, file: &str) -> Result<serde_json::Value, String> {
    let path = dir.join(file);
    let text = fs::read_to_string(&path).map_err(|e| format!("--rapi {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("--rapi {}: {e}", path.display()))
}

/// Apply `--max-cpu`/`--min-disk` overrides to every node's N+1 thresholds
///. These fields default to the Loader's built-in constants
/// (`m_cpu = 4.0`, `m_dsk = 0.0`) and are never set from the textual/remote
/// snapshot itself, so the CLI is the only place that overrides them.
fn apply_policy_overrides(cluster: &mut ClusterData, args: &Args) {
    if args.max_cpu.is_none() && args.min_disk.is_none() {
        return;
    }
    let idxs: Vec<_> = cluster.nodes.keys().collect();
    for idx in idxs {
        cluster.nodes.update(idx, |mut n| {
            if let Some(max_cpu) = args.max_cpu {
                n.m_cpu = max_cpu;
            }
            if let Some(min_disk) = args.min_disk {
                n.m_dsk = min_disk;
            }
            n
        });
    }
}

fn render_outputs(args: &Args, cluster_before: &ClusterData, result: &hbal_pipeline::balance::BalanceResult) -> Result<(), String> {
    if let Some(spec) = &args.print_nodes {
        let fields: Vec<String> = if spec.is_empty() {
            hbal_report::node_table::DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect()
        } else {
            hbal_report::parse_node_fields(spec)
        };
        println!("Initial cluster status:");
        println!("{}", hbal_report::render_node_table(cluster_before.nodes.elems(), &fields));
        println!("Final cluster status:");
        println!("{}", hbal_report::render_node_table(result.final_cluster.nodes.elems(), &fields));
    }

    if args.print_instances {
        let fields: Vec<String> =
            hbal_report::instance_table::DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect();
        println!("{}", hbal_report::render_instance_table(&result.final_cluster, &fields));
    }

    if !args.quiet && !args.machine_readable_on() && !result.placements.is_empty() {
        println!("{}", hbal_report::render_move_list(cluster_before, &result.placements));
    }

    if let Some(target) = &args.print_commands {
        let script = hbal_report::render_shell_script(cluster_before, &result.placements);
        write_report(target, &script)?;
    }

    if let Some(path) = &args.save_cluster {
        let before_raw = hbal_io::to_raw_cluster(cluster_before);
        let after_raw = hbal_io::to_raw_cluster(&result.final_cluster);
        write_bytes_atomically(path, hbal_io::serialize_text(&before_raw).as_bytes())
.map_err(|e| format!("--save-cluster {}: {e}", path.display()))?;
        let after_path = after_path_for(path);
        write_bytes_atomically(&after_path, hbal_io::serialize_text(&after_raw).as_bytes())
.map_err(|e| format!("--save-cluster {}: {e}", after_path.display()))?;
    }

    Ok(())
}

fn after_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".balanced");
    PathBuf::from(s)
}

fn write_report(target: &str, content: &str) -> Result<(), String> {
    if target == "-" {
        print!("{content}");
        Ok(())
    } else {
        write_bytes_atomically(Path::new(target), content.as_bytes())
.map_err(|e| format!("--print-commands {target}: {e}"))
    }
}

/// Write bytes with a single trailing LF and atomic rename.
fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path_for(path);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        if !bytes.last().is_some_and(|b| *b == b'\n') {
            f.write_all(b"\n")?;
        }
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut s = final_path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}
