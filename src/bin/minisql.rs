//! minisql REPL
//!
//! Interactive line-oriented shell: reads `;`-terminated statements from
//! stdin, executes them, and pretty-prints selected rows. `quit;` exits,
//! `execfile <path>;` runs a script of statements.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use minisql::{Config, Engine, QueryResult, Row};
use tracing_subscriber::{fmt, EnvFilter};

/// minisql shell
#[derive(Parser, Debug)]
#[command(name = "minisql")]
#[command(about = "Minimal relational storage engine with B+-tree indexes")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./minisql_data")]
    data_dir: PathBuf,

    /// Script of statements to execute instead of entering the shell
    #[arg(short, long)]
    file: Option<PathBuf>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,minisql=info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = Config::builder().data_dir(&args.data_dir).build();

    let mut engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("[-] Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = args.file {
        exec_file(&mut engine, &path);
        return;
    }

    repl(&mut engine);
}

/// Read statements from stdin until `quit;`
fn repl(engine: &mut Engine) {
    let stdin = io::stdin();
    let mut buffer = String::new();

    print!("minisql> ");
    let _ = io::stdout().flush();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        buffer.push_str(&line);
        buffer.push('\n');

        while let Some(at) = buffer.find(';') {
            let statement: String = buffer.drain(..=at).collect();
            let statement = statement.trim().to_string();
            if statement == "quit;" {
                return;
            }
            if let Some(path) = statement
                .strip_prefix("execfile ")
                .and_then(|rest| rest.strip_suffix(';'))
            {
                exec_file(engine, Path::new(path.trim()));
                continue;
            }
            run_one(engine, &statement);
        }

        print!("minisql> ");
        let _ = io::stdout().flush();
    }
}

/// Execute every statement of a script file
fn exec_file(engine: &mut Engine, path: &Path) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("[-] Error reading {}: {}", path.display(), e);
            return;
        }
    };

    let start = Instant::now();
    for statement in text.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        let statement = format!("{};", statement);
        println!("[+] {}", statement);
        run_one(engine, &statement);
    }
    println!("Elapsed {:.6}s", start.elapsed().as_secs_f64());
}

/// Execute one statement and print its result
fn run_one(engine: &mut Engine, statement: &str) {
    let start = Instant::now();
    match engine.execute(statement) {
        Ok(QueryResult::Done) => println!("OK"),
        Ok(QueryResult::Deleted(n)) => println!("{} row(s) deleted", n),
        Ok(QueryResult::Rows(rows)) => print_rows(&rows),
        Err(e) => eprintln!("[-] Error: {}", e),
    }
    println!("({:.6}s)", start.elapsed().as_secs_f64());
}

/// Print rows as an aligned text table
fn print_rows(rows: &[Row]) {
    let Some(first) = rows.first() else {
        println!("(0 rows)");
        return;
    };

    let columns = first.columns();
    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.values().iter().map(ToString::to_string).collect())
        .collect();
    for row in &rendered {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(name, &width)| format!("{:<width$}", name))
        .collect();
    println!("{}", header.join(" | "));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("-+-"));
    for row in &rendered {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", cell))
            .collect();
        println!("{}", cells.join(" | "));
    }
    println!("({} row(s))", rows.len());
}
