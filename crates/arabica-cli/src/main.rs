use std::{
    env, fs,
    io::{self, BufRead, Write},
    process::ExitCode,
};

use arabica::{Session, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => run_repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: arabica [script]");
            ExitCode::FAILURE
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Error reading {path}: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(StdPrint::new());
    match session.execute(&source) {
        Ok(_) => ExitCode::SUCCESS,
        // diagnostics were already reported by the session
        Err(_) => ExitCode::FAILURE,
    }
}

fn run_repl() -> ExitCode {
    let mut session = Session::new(StdPrint::new());
    let stdin = io::stdin();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(error) => {
                eprintln!("Error reading input: {error}");
                return ExitCode::FAILURE;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        // a failed line reports its diagnostics; the session stays usable
        if let Ok(Some(value)) = session.execute(&line) {
            println!("{value}");
        }
    }

    ExitCode::SUCCESS
}
