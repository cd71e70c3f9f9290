use std::io::{self, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use rowkeep::error::{ExecError, StorageError};
use rowkeep::node::{
    Node, COMMON_NODE_HEADER_SIZE, INTERNAL_NODE_CELL_SIZE, INTERNAL_NODE_HEADER_SIZE,
    LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_KEY_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_VALUE_SIZE,
};
use rowkeep::row::ROW_SIZE;
use rowkeep::statement::{execute_statement, prepare_statement};
use rowkeep::table::Table;

/// A single-file, single-table embedded relational store with a line-oriented REPL.
#[derive(Parser)]
struct Cli {
    /// Path to the database file. Created if it doesn't exist.
    database: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == ErrorKind::MissingRequiredArgument => {
            eprintln!("Must supply a database filename.");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let mut table = match Table::open(&cli.database) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        print_prompt();
        let Some(line) = read_input() else {
            break;
        };
        let line = line.trim_end();

        if line.starts_with('.') {
            match run_meta_command(line, &mut table) {
                MetaOutcome::Continue => continue,
                MetaOutcome::Exit(code) => return code,
            }
        }

        if line.is_empty() {
            continue;
        }

        match prepare_statement(line) {
            Ok(statement) => match execute_statement(statement, &mut table) {
                Ok(()) => println!("Executed."),
                Err(ExecError::Execute(err)) => println!("{err}"),
                Err(ExecError::Storage(err)) => {
                    eprintln!("{err}");
                    return ExitCode::FAILURE;
                }
            },
            Err(err) => println!("{err}"),
        }
    }

    ExitCode::SUCCESS
}

enum MetaOutcome {
    Continue,
    Exit(ExitCode),
}

fn run_meta_command(line: &str, table: &mut Table) -> MetaOutcome {
    match line {
        ".exit" => match table.close() {
            Ok(()) => {
                println!("Bye!");
                MetaOutcome::Exit(ExitCode::SUCCESS)
            }
            Err(err) => {
                eprintln!("{err}");
                MetaOutcome::Exit(ExitCode::FAILURE)
            }
        },
        ".btree" => {
            match print_tree(table, table.root_page_num, 0) {
                Ok(()) => MetaOutcome::Continue,
                Err(err) => {
                    eprintln!("{err}");
                    MetaOutcome::Exit(ExitCode::FAILURE)
                }
            }
        }
        ".constants" => {
            print_constants();
            MetaOutcome::Continue
        }
        other => {
            println!("Unrecognized command: {other}");
            MetaOutcome::Continue
        }
    }
}

fn print_constants() {
    println!("Constants:");
    println!("ROW_SIZE: {ROW_SIZE}");
    println!("COMMON_NODE_HEADER_SIZE: {COMMON_NODE_HEADER_SIZE}");
    println!("LEAF_NODE_HEADER_SIZE: {LEAF_NODE_HEADER_SIZE}");
    println!("LEAF_NODE_CELL_SIZE: {LEAF_NODE_CELL_SIZE}");
    println!("LEAF_NODE_KEY_SIZE: {LEAF_NODE_KEY_SIZE}");
    println!("LEAF_NODE_VALUE_SIZE: {LEAF_NODE_VALUE_SIZE}");
    println!("LEAF_NODE_MAX_CELLS: {LEAF_NODE_MAX_CELLS}");
    println!("INTERNAL_NODE_HEADER_SIZE: {INTERNAL_NODE_HEADER_SIZE}");
    println!("INTERNAL_NODE_CELL_SIZE: {INTERNAL_NODE_CELL_SIZE}");
}

enum TreeSnapshot {
    Leaf { keys: Vec<u32> },
    Internal { children: Vec<u32>, keys: Vec<u32>, right_child: u32 },
}

fn print_tree(table: &mut Table, page_num: u32, indent: usize) -> Result<(), StorageError> {
    let snapshot = {
        let page = table.page(page_num)?;
        match Node::from_page(page) {
            Node::Leaf(leaf) => TreeSnapshot::Leaf {
                keys: (0..leaf.num_cells()).map(|i| leaf.key(i)).collect(),
            },
            Node::Internal(internal) => TreeSnapshot::Internal {
                children: (0..internal.num_keys()).map(|i| internal.child(i)).collect(),
                keys: (0..internal.num_keys()).map(|i| internal.key(i)).collect(),
                right_child: internal.right_child(),
            },
        }
    };

    match snapshot {
        TreeSnapshot::Leaf { keys } => {
            println!("{}- leaf (size {})", "  ".repeat(indent), keys.len());
            for key in keys {
                println!("{}  - {}", "  ".repeat(indent), key);
            }
        }
        TreeSnapshot::Internal {
            children,
            keys,
            right_child,
        } => {
            println!("{}- internal (size {})", "  ".repeat(indent), keys.len());
            for (child, key) in children.into_iter().zip(keys) {
                print_tree(table, child, indent + 1)?;
                println!("{}- key {}", "  ".repeat(indent + 1), key);
            }
            print_tree(table, right_child, indent + 1)?;
        }
    }
    Ok(())
}

fn print_prompt() {
    print!("db > ");
    let _ = io::stdout().flush();
}

fn read_input() -> Option<String> {
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(_) => None,
    }
}
