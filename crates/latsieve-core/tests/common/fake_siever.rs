//! Throwaway siever for integration tests: a `sh` script honouring the
//! lattice siever argument contract and writing one relation per q.

use latsieve_core::config::{ProgramSpec, RunConfig, Side};
use std::path::Path;

/// Options for the generated script.
#[derive(Default)]
pub struct FakeSiever {
    /// Exit 3 without output when the unit's range starts here.
    pub fail_at: Option<u64>,
}

impl FakeSiever {
    /// Write the script into `dir` and return how to invoke it.
    pub fn install(&self, dir: &Path) -> ProgramSpec {
        let script = dir.join("fake-lasieve.sh");
        let fail = self
            .fail_at
            .map(|q| q.to_string())
            .unwrap_or_else(|| "none".to_string());
        let body = format!(
            r#"while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -f) start="$2"; shift 2 ;;
    -c) len="$2"; shift 2 ;;
    -n*) slot="${{1#-n}}"; shift ;;
    -a) side=a; shift ;;
    -r) side=r; shift ;;
    *) shift ;;
  esac
done
[ "$start" = "{fail}" ] && exit 3
: > "$out"
i=0
while [ $i -lt $len ]; do
  echo "$((start + i)):$side:$slot" >> "$out"
  i=$((i + 1))
done
"#
        );
        std::fs::write(&script, body).unwrap();
        ProgramSpec::new("sh").with_leading_args([script.display().to_string()])
    }
}

/// Run over `[1000, 1200)`, save-batches of 100, two workers, files in `dir`.
pub fn run_config(dir: &Path, siever: ProgramSpec) -> RunConfig {
    let poly = dir.join("c95.poly");
    std::fs::write(&poly, "n: 143\nskew: 1.0\n").unwrap();
    RunConfig {
        q_start: 1000,
        q_length: 200,
        workers: 2,
        side: Side::Algebraic,
        unique_name: "c95".to_string(),
        siever,
        save_delta: 100,
        poly,
        work_dir: dir.to_path_buf(),
        niceness: 0,
        compress_results: false,
        clear_on_completion: false,
        factor_base: None,
    }
}

/// Relations an uninterrupted run over `[start, end)` with `workers` per
/// save-batch of `save` produces.
pub fn expected_relations(start: u64, end: u64, save: u64, workers: u64) -> String {
    let mut out = String::new();
    let mut batch = start;
    while batch < end {
        let batch_end = (batch + save).min(end);
        let delta = (batch_end - batch) / workers;
        for q in batch..batch_end {
            let slot = ((q - batch) / delta).min(workers - 1);
            out.push_str(&format!("{}:a:{}\n", q, slot));
        }
        batch = batch_end;
    }
    out
}
