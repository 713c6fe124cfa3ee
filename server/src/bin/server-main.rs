use std::net::{TcpListener, TcpStream};
use std::process::exit;

use clap::{App, Arg};
use log::{error, info};

use emu86::machine::{Machine, RunExit};
use emu86::transport::{read_request, write_response, TransportError};

const DEFAULT_PORT: &str = "5555";

/// per-session step budget, so one spinning program cannot wedge the
/// service
const MAX_STEPS: usize = 100_000_000;

fn main() {
    env_logger::init();

    let matches = App::new("emu86-server")
        .version("0.1")
        .about("emulates programs received over tcp and returns their captured output")
        .arg(
            Arg::with_name("port")
                .long("port")
                .help("tcp port to listen on")
                .takes_value(true)
                .default_value(DEFAULT_PORT),
        )
        .get_matches();

    let port = matches.value_of("port").unwrap();

    let listener = match TcpListener::bind(format!("0.0.0.0:{}", port)) {
        Ok(l) => l,
        Err(what) => {
            eprintln!("bind failed on port {}: {}", port, what);
            exit(1);
        }
    };
    info!("listening on port {}", port);

    // connections are served one at a time; every session gets a
    // fresh machine
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(what) = serve(stream) {
                    error!("session aborted: {}", what);
                }
            }
            Err(what) => error!("accept failed: {}", what),
        }
    }
}

fn serve(mut stream: TcpStream) -> Result<(), TransportError> {
    if let Ok(peer) = stream.peer_addr() {
        info!("client connected: {}", peer);
    }

    let payload = read_request(&mut stream)?;

    let mut machine = Machine::default();
    machine.load_program(&payload);
    if machine.run(MAX_STEPS) == RunExit::StepLimit {
        info!("step budget exhausted after {} steps", MAX_STEPS);
    }

    write_response(&mut stream, machine.output_bytes())?;
    info!("session done, {} output bytes", machine.output_bytes().len());
    Ok(())
}
