//! Demo runner over the staff model.
//!
//! # Responsibility
//! - Exercise save, update, relationship queries, association mutation and
//!   delete end to end against one store.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Without `--db` the run uses a private in-memory store.

use clap::Parser;
use log::info;
use relstore_cli::staff::{Department, Employee, Manager, SCHEMA};
use relstore_core::{
    default_log_level, init_logging, open_repository, EntityRepository, LoggingConfig,
    RepoResult, SqliteEntityRepository, StoreConfig,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug, Default)]
#[command(name = "relstore_cli", about = "Demo runs against a relstore database")]
struct Options {
    /// SQLite file to use; a private in-memory store when omitted.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Absolute directory for rotating log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run(Options::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("relstore_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: Options) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = &options.log_dir {
        init_logging(&LoggingConfig::new(default_log_level(), dir))?;
    }

    let config = options
        .db
        .map_or_else(StoreConfig::in_memory, StoreConfig::file);
    let repo = open_repository(config)?;
    repo.factory().apply_schema(SCHEMA)?;
    println!("relstore_core version={}", relstore_core::core_version());

    department_scenario(&repo)?;
    raise_scenario(&repo)?;
    Ok(())
}

fn department_scenario(repo: &SqliteEntityRepository) -> RepoResult<()> {
    let mut hr = Department::new("HR");
    repo.save_or_update(&mut hr)?;

    let mut jack = Employee::new("Jack", "Jarvis", 25_000);
    jack.department_id = hr.id;
    repo.save_or_update(&mut jack)?;

    jack.salary = 70_000;
    repo.save_or_update(&mut jack)?;
    info!(
        "event=demo_salary_update module=cli status=ok employee_id={:?} salary={}",
        jack.id, jack.salary
    );

    for employee in repo.query_by_association::<Employee, Department>("department", &hr)? {
        println!(
            "department={} employee={} salary={}",
            hr.title,
            employee.full_name(),
            employee.salary
        );
    }

    repo.delete(&jack)?;
    println!(
        "after delete: employees={}",
        repo.find_all::<Employee>()?.len()
    );
    Ok(())
}

fn raise_scenario(repo: &SqliteEntityRepository) -> RepoResult<()> {
    let mut manager = Manager::new("Marcy", "Darcy", 60_000, 100_000);
    repo.save_or_update(&mut manager)?;

    for (first, salary) in [("Al", 35_000), ("Peggy", 50_000)] {
        let mut employee = Employee::new(first, "Bundy", salary);
        repo.save_or_update(&mut employee)?;
        repo.add_to_association(&mut manager, &employee, "employees")?;
    }

    let total = manager.give_raise(repo)?;
    for employee in repo.query_by_association::<Employee, Manager>("manager", &manager)? {
        println!("raise employee={} salary={}", employee.full_name(), employee.salary);
    }
    println!(
        "manager={} {} total={} budget={}",
        manager.first_name, manager.last_name, total, manager.budget
    );
    Ok(())
}
