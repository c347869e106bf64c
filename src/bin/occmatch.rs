//! occmatch CLI - keyed pattern matching over dependently typed terms
//!
//! Reads commands from stdin; see `help` for the command list.

use std::io::{stdin, stdout, BufReader};

use occmatch::repl::Repl;
use occmatch::trace;

fn main() {
    trace::init_subscriber();

    let mut repl = Repl::new();

    let mut input = BufReader::new(stdin().lock());
    let mut output = stdout().lock();

    if let Err(e) = repl.run(&mut input, &mut output) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
