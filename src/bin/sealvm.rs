//! sealvm CLI — evaluate an authenticated-encrypted bytecode file.
//!
//! Usage:
//!   sealvm BYTECODE_FILE --inputs INT1,INT2,... [--out_count N]

use std::fs;
use std::process;

use sealvm::{driver, SeKeys, Word};

fn usage() -> ! {
    eprintln!(
        "sealvm — secure-element bytecode evaluator\n\
         \n\
         Usage:\n\
         \n\
         sealvm BYTECODE_FILE --inputs INT1,INT2,... [--out_count N]\n\
         \n\
         Evaluates BYTECODE_FILE over the given inputs and prints the\n\
         program outputs in decimal, one per line.\n\
         \n\
         Options:\n\
         --inputs INT_LIST    program inputs, comma-separated (required)\n\
         --out_count N        number of program outputs (default 1)\n\
         -h, --help           print this help\n"
    );
    process::exit(1);
}

fn die(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    process::exit(1);
}

fn parse_inputs(list: &str) -> Vec<Word> {
    list.split(',')
        .map(|tok| {
            tok.trim()
                .parse::<Word>()
                .unwrap_or_else(|_| die(&format!("--inputs expects integers, got '{}'", tok)))
        })
        .collect()
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut filename: Option<String> = None;
    let mut inputs: Option<Vec<Word>> = None;
    let mut out_count: usize = 1;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => usage(),
            "--inputs" => {
                i += 1;
                let list = args.get(i).unwrap_or_else(|| die("missing value for --inputs"));
                inputs = Some(parse_inputs(list));
            }
            "--out_count" => {
                i += 1;
                let val = args
                    .get(i)
                    .unwrap_or_else(|| die("missing value for --out_count"));
                out_count = val
                    .parse()
                    .unwrap_or_else(|_| die(&format!("--out_count expects an integer, got '{}'", val)));
            }
            arg if arg.starts_with("--") => die(&format!("unknown option: {}", arg)),
            arg => {
                if filename.is_some() {
                    die(&format!("unexpected extra argument '{}'", arg));
                }
                filename = Some(arg.to_string());
            }
        }
        i += 1;
    }

    let filename = filename.unwrap_or_else(|| {
        eprintln!("missing argument: no bytecode file provided\n");
        usage()
    });
    let inputs = inputs.unwrap_or_else(|| {
        eprintln!("missing mandatory argument: --inputs\n");
        usage()
    });

    let bytecode =
        fs::read(&filename).unwrap_or_else(|e| die(&format!("cannot open '{}': {}", filename, e)));

    let keys = SeKeys::builtin();
    match driver::run(&bytecode, &inputs, out_count, &keys) {
        Ok(outputs) => {
            for w in outputs {
                println!("{}", w);
            }
        }
        Err(e) => die(&e.to_string()),
    }
}
