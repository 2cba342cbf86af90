//! Writes a small synthetic acquisition grid for trying out `tv-dataset`.
//!
//! Layout produced under the target directory (default `sample_data`):
//! `raw/{board}_{algorithm}/datos_{iteration}.txt`, `Table_UIDS.csv` and a
//! `sample_config.json` whose bounds match the generated files.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const BOARDS: u32 = 3;
const ALGORITHMS: u32 = 2;
const ITERATIONS: u32 = 4;
/// Pairs per file for each algorithm.
const PAIRS: [usize; ALGORITHMS as usize] = [400, 250];

/// Small deterministic generator (splitmix64), enough for plausible noise.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform integer in `-spread..=spread`.
    fn jitter(&mut self, spread: i64) -> i64 {
        (self.next_u64() % (2 * spread as u64 + 1)) as i64 - spread
    }
}

fn raw_file(board: u32, algorithm: u32, iteration: u32, pairs: usize, rng: &mut SampleRng) -> String {
    let mut text = String::new();
    writeln!(text, "UID {:08X}", 0x5EED_0000 + board).unwrap();
    writeln!(text, "BOARD {board}").unwrap();
    writeln!(text, "ALGORITHM {algorithm}").unwrap();
    writeln!(text, "ITERATION {iteration}").unwrap();

    // Die temperature rises slowly while the algorithm runs; the supply sags
    // a little with load.
    let base_temperature = 1040 + 4 * board as i64;
    let base_voltage = 1650 + 3 * board as i64;
    for i in 0..pairs {
        let warmup = (i as f64 / pairs as f64 * 20.0 * algorithm as f64) as i64;
        let temperature = base_temperature + warmup + rng.jitter(3);
        let voltage = base_voltage + warmup / 4 + rng.jitter(5);
        writeln!(text, "{temperature}").unwrap();
        writeln!(text, "{voltage}").unwrap();
    }

    text.push_str("----\nEND\n");
    text
}

fn main() {
    let target = std::env::args().nth(1).unwrap_or_else(|| "sample_data".to_string());
    let target = Path::new(&target);
    let raw = target.join("raw");
    let mut rng = SampleRng(42);

    let mut files = 0;
    for board in 1..=BOARDS {
        for algorithm in 1..=ALGORITHMS {
            let folder = raw.join(format!("{board}_{algorithm}"));
            fs::create_dir_all(&folder).expect("Failed to create sample folder");
            for iteration in 1..=ITERATIONS {
                let pairs = PAIRS[algorithm as usize - 1];
                let text = raw_file(board, algorithm, iteration, pairs, &mut rng);
                fs::write(folder.join(format!("datos_{iteration}.txt")), text)
                    .expect("Failed to write raw file");
                files += 1;
            }
        }
    }

    let mut table = String::from("UID;BOARD_NUM;T_CAL_1;T_CAL_2;VREFINT_CAL\n");
    for board in 1..=BOARDS {
        writeln!(
            table,
            "{:08X};{board};{};{};{}",
            0x5EED_0000 + board,
            1030 + 5 * board,
            1365 + 4 * board,
            1652 + board
        )
        .unwrap();
    }
    fs::write(target.join("Table_UIDS.csv"), table).expect("Failed to write calibration table");

    let max_raw_lines: Vec<usize> = PAIRS.iter().map(|p| p * 2).collect();
    let config = serde_json::json!({
        "extract": {
            "base_dir": raw,
            "destination_dir": target.join("dataset"),
            "calibration_table": target.join("Table_UIDS.csv"),
            "boards": BOARDS,
            "algorithms": ALGORITHMS,
            "iterations": ITERATIONS,
            "max_raw_lines": max_raw_lines,
            "format": "multiple"
        },
        "sequence": {
            "input_dir": target.join("dataset"),
            "output_dir": target.join("sequences"),
            "sequence_length": 50,
            "max_raw_lines": max_raw_lines
        }
    });
    let config_text = serde_json::to_string_pretty(&config).expect("Failed to serialize config");
    fs::write(target.join("sample_config.json"), config_text).expect("Failed to write config");

    println!(
        "Wrote {files} raw files for {BOARDS} boards x {ALGORITHMS} algorithms to {}",
        raw.display()
    );
}
