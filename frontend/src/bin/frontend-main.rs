use std::io::Write;
use std::process::exit;

use clap::{App, Arg};
use log::warn;

use emu86::machine::{Machine, RunExit};
use emu86::tools::read_binary;

/// generous budget for programs that never halt on their own
const MAX_STEPS: usize = 100_000_000;

fn main() {
    env_logger::init();

    let matches = App::new("emu86-frontend")
        .version("0.1")
        .about("runs a dos-style .com binary and prints its captured output")
        .arg(
            Arg::with_name("INPUT")
                .help("the program file to run")
                .required(true)
                .index(1),
        )
        .get_matches();

    let filename = matches.value_of("INPUT").unwrap();

    let data = match read_binary(filename) {
        Ok(data) => data,
        Err(what) => {
            eprintln!("error reading {}: {}", filename, what);
            exit(1);
        }
    };

    let mut machine = Machine::default();
    machine.load_program(&data);

    if machine.run(MAX_STEPS) == RunExit::StepLimit {
        warn!("step budget exhausted after {} steps", MAX_STEPS);
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if handle.write_all(machine.output_bytes()).is_err() {
        exit(1);
    }
}
