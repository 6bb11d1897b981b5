//! sorted-bench: runs the phased add-then-remove workload on one of the six sets.
//!
//! # Usage
//!
//! ```bash
//! sorted-bench <data_structure> <threads> <items> <work_time> <inner_work_time> [--debug]
//! ```
//!
//! Prints the elapsed milliseconds, or with `--debug` the set's contents before adding, after
//! adding and after removing, followed by the time.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use sorted_sets::workload::{Params, Variant};
use sorted_sets::Config;

/// Run the phased workload on a concurrent sorted set.
#[derive(Parser, Debug)]
#[command(name = "sorted-bench")]
struct Cli {
    /// Data structure: one of cgl, cgt, fgl, fgt, lfl, lft.
    data_structure: Variant,

    /// Number of worker threads (at least 1).
    threads: usize,

    /// Number of keys in total (at least 1, divisible by the thread count).
    items: usize,

    /// Busy-wait before every operation, in microseconds.
    work_time: u64,

    /// Busy-wait inside every operation's critical region, in microseconds.
    inner_work_time: u64,

    /// Print the set's contents around both phases.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let params = Params::new(
        cli.threads,
        cli.items,
        Duration::from_micros(cli.work_time),
        cli.data_structure.duplicates(),
    );
    let config = Config::from_micros(cli.inner_work_time);

    let report = match cli.data_structure.execute(config, &params, cli.debug) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.debug {
        if let Some(dump) = report.before_add {
            println!("Output before adding:\n{dump}");
        }
        if let Some(dump) = report.after_add {
            println!("Output after adding, before removing:\n{dump}");
        }
        println!("data structure after removal (should be empty):");
        println!("{}", report.after_remove);
        println!();
        println!("time: {} ms\n", report.elapsed.as_millis());
    } else {
        println!("{}", report.elapsed.as_millis());
    }

    ExitCode::SUCCESS
}
