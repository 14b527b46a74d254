//! `bandjoin`: generate test databases, run one band-join strategy, or
//! compare all six strategy/orientation variants.
//!
//! Exit codes: 0 success, 1 runtime failure or result mismatch, 2 usage
//! error.

mod args;
mod commands;
mod logging;

use std::ffi::OsString;
use std::io::{self, Write as _};

use args::Command;

fn main() {
    let exit_code = run_cli(std::env::args_os());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run_cli<I>(os_args: I) -> i32
where
    I: IntoIterator<Item = OsString>,
{
    let raw: Vec<String> = os_args
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let tail = if raw.len() > 1 { &raw[1..] } else { &[] };

    if tail.is_empty() || tail.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return 0;
    }

    let rest = &tail[1..];
    let parsed = match tail[0].as_str() {
        "generate" => args::parse_generate(rest).map(Command::Generate),
        "run" => args::parse_run(rest).map(Command::Run),
        "compare" => args::parse_compare(rest).map(Command::Compare),
        other => Err(format!("unknown command `{other}`")),
    };
    let command = match parsed {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("run `bandjoin --help` for usage");
            return 2;
        }
    };

    if let Err(err) = logging::init(command.log_file()) {
        eprintln!("error: cannot open log file: {err}");
        return 1;
    }

    match &command {
        Command::Generate(a) => commands::generate(a),
        Command::Run(a) => commands::run(a),
        Command::Compare(a) => commands::compare(a),
    }
}

fn print_help() {
    let text = "\
bandjoin: inexact (band) equi-joins over two SQLite tables

USAGE:
    bandjoin generate [OPTIONS]
    bandjoin run --strategy <NAME> [OPTIONS]
    bandjoin compare [OPTIONS]

GENERATE OPTIONS:
    --dir <DIR>              Output directory (default: databases)
    --db1 <FILE>             Projects database name (default: database1.db)
    --db2 <FILE>             Employees database name (default: database2.db)
    --employees <N>          Employee rows (default: 60000)
    --overlap-ratio <R>      Share of employee departments that projects use (default: 0.25)
    --departments <N>        Departments per letter A..E (default: 100)
    --avg-projects <X>       Mean projects per department (default: 50)
    --std-projects <X>       Std-dev of projects per department (default: 10)
    --seed <N>               RNG seed (default: 42)

RUN / COMPARE OPTIONS:
    --db1 <PATH>             Relation 1 (default: databases/database1.db)
    --db2 <PATH>             Relation 2 (default: databases/database2.db)
    --config <FILE>          TOML join settings; flags below override it
    --max-days-diff <N>      Inclusive timestamp tolerance in days (default: 10)
    --pair-identity <ID>     Symmetric dedup identity: ordinal | content
    --semi-join-dedup <ID>   Enable semi-join dedup: ordinal | content
    --report <FILE>          Write metrics as JSON

RUN ONLY:
    --strategy <NAME>        single-pass | symmetric | semi-join
    --invert-join            Swap the build/driving side (semi-join drives from db2 by default)
    --output <FILE>          CSV path (default: <strategy>_<orientation>.csv)

COMPARE ONLY:
    --out-dir <DIR>          Directory for the six CSV files (default: .)

COMMON:
    --log-file <FILE>        Also append log output to FILE
    -h, --help               Show this help

Logging honours RUST_LOG (default: info).
";
    let _ = io::stdout().write_all(text.as_bytes());
}
