// crates/kg_cli/src/main.rs
//
// CLI entrypoint. Strictly offline & deterministic: no network, no OS RNG;
// the same flags always produce the same bytes, whatever --workers says.

mod args;

use args::{parse_and_validate, Job};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kg_core::MrgState;
use kg_gen::{
    compute_edge_array_size, generate_kronecker, rand_sort_distributed, rand_sort_shared,
    with_mesh, BufferScope, EdgeSink, GenParams, GeneratedEdge, GraphKind, TOMBSTONE,
};

const EDGES_FILE: &str = "edges.tsv";
const PERMUTATION_FILE: &str = "permutation.txt";
const SUMMARY_FILE: &str = "summary.json";

#[derive(serde::Serialize)]
struct RunSummary {
    command: &'static str,
    seed: [u32; 5],
    workers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edges: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initiator: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    undirected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tombstones: Option<u64>,
    artifact: String,
}

fn main() -> ExitCode {
    let job = match parse_and_validate() {
        Ok(j) => j,
        Err(e) => {
            eprintln!("kg: error: {e}");
            return ExitCode::from(1);
        }
    };
    let quiet = job.quiet();
    match run(job) {
        Ok(summary) => {
            if !quiet {
                println!(
                    "kg: {} complete — {} record(s) in {}",
                    summary.command, summary.records, summary.artifact
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("kg: error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(job: Job) -> Result<RunSummary, String> {
    let summary = match job {
        Job::Generate {
            params,
            tombstones,
            workers,
            out,
            ..
        } => run_generate(&params, tombstones, workers, &out)?,
        Job::Permute {
            count,
            seed,
            workers,
            out,
            ..
        } => run_permute(count, seed, workers, &out)?,
    };
    Ok(summary)
}

fn run_generate(
    params: &GenParams,
    flat_layout: bool,
    workers: u32,
    out: &Path,
) -> Result<RunSummary, String> {
    fs::create_dir_all(out)
        .map_err(|e| format!("cannot create output directory {}: {e}", out.display()))?;

    let mut lines = String::new();
    let mut records = 0u64;
    let mut tombstone_count = 0u64;

    // Every worker fills its own slice; concatenation in rank order is the
    // canonical edge sequence whatever `workers` is.
    for rank in 0..workers {
        let len = compute_edge_array_size(rank, workers, params.num_edges())
            .map_err(|e| format!("generation failed: {e}"))? as usize;
        if flat_layout {
            let mut slice = vec![0u64; 2 * len];
            generate_kronecker(
                rank,
                workers,
                params,
                BufferScope::WorkerLocal,
                &mut EdgeSink::PairsWithTombstones(&mut slice),
            )
            .map_err(|e| format!("generation failed: {e}"))?;
            for pair in slice.chunks_exact(2) {
                if pair[0] == TOMBSTONE && pair[1] == TOMBSTONE {
                    tombstone_count += 1;
                } else {
                    writeln!(lines, "{}\t{}", pair[0], pair[1]).expect("write to string");
                    records += 1;
                }
            }
        } else {
            let mut slice = vec![GeneratedEdge::default(); len];
            generate_kronecker(
                rank,
                workers,
                params,
                BufferScope::WorkerLocal,
                &mut EdgeSink::Multiplicity(&mut slice),
            )
            .map_err(|e| format!("generation failed: {e}"))?;
            for e in slice.iter().filter(|e| e.multiplicity > 0) {
                writeln!(lines, "{}\t{}\t{}", e.src, e.tgt, e.multiplicity)
                    .expect("write to string");
                records += 1;
            }
        }
    }

    let artifact = out.join(EDGES_FILE);
    write_bytes_atomically(&artifact, lines.as_bytes())
        .map_err(|e| format!("cannot write {}: {e}", artifact.display()))?;

    let summary = RunSummary {
        command: "generate",
        seed: params.seed(),
        workers,
        log_n: Some(params.log_nverts()),
        edges: Some(params.num_edges()),
        initiator: Some(params.initiator().to_vec()),
        undirected: Some(params.kind() == GraphKind::Undirected),
        layout: Some(if flat_layout {
            "pairs_with_tombstones"
        } else {
            "multiplicity"
        }),
        count: None,
        records,
        tombstones: flat_layout.then_some(tombstone_count),
        artifact: artifact.display().to_string(),
    };
    write_summary(out, &summary)?;
    Ok(summary)
}

fn run_permute(
    count: u64,
    seed: [u32; 5],
    workers: u32,
    out: &Path,
) -> Result<RunSummary, String> {
    fs::create_dir_all(out)
        .map_err(|e| format!("cannot create output directory {}: {e}", out.display()))?;

    let root = MrgState::new(seed);
    let values: Vec<u64> = if workers == 1 {
        let mut result = vec![0u64; count as usize];
        rand_sort_shared(&root, &mut result);
        result
    } else {
        with_mesh(workers, |mut mesh| {
            rand_sort_distributed(&mut mesh, &root, count)
        })
        .into_iter()
        .flatten()
        .collect()
    };

    let mut lines = String::new();
    for v in &values {
        writeln!(lines, "{v}").expect("write to string");
    }
    let artifact = out.join(PERMUTATION_FILE);
    write_bytes_atomically(&artifact, lines.as_bytes())
        .map_err(|e| format!("cannot write {}: {e}", artifact.display()))?;

    let summary = RunSummary {
        command: "permute",
        seed,
        workers,
        log_n: None,
        edges: None,
        initiator: None,
        undirected: None,
        layout: None,
        count: Some(count),
        records: values.len() as u64,
        tombstones: None,
        artifact: artifact.display().to_string(),
    };
    write_summary(out, &summary)?;
    Ok(summary)
}

fn write_summary(out: &Path, summary: &RunSummary) -> Result<(), String> {
    let path = out.join(SUMMARY_FILE);
    let bytes = serde_json::to_vec_pretty(summary)
        .map_err(|e| format!("cannot serialize run summary: {e}"))?;
    write_bytes_atomically(&path, &bytes)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))
}

fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = PathBuf::from(path);
    tmp.set_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
