//! Interactive console adapter: a numbered menu over stdin/stdout. Collects
//! free-text field values, hands them to the repository and prints the
//! outcome. Validation failures are printed and the loop continues.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::db::Database;
use crate::error::RepoError;
use crate::models::{DateInput, FieldPatch, JobApplication, JobDraft, JobPatch, SalaryInput};

pub fn run(db: &Database) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print_menu();
        let choice = prompt(&mut lines, "Enter your choice: ")?;

        match choice.trim() {
            "1" => create_flow(db, &mut lines)?,
            "2" => list_flow(db)?,
            "3" => update_flow(db, &mut lines)?,
            "4" => delete_flow(db, &mut lines)?,
            "5" => count_flow(db)?,
            "6" => {
                println!("Bye.");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
        println!();
    }

    Ok(())
}

fn print_menu() {
    println!("Job Application Tracker");
    println!("1. Create application");
    println!("2. List applications");
    println!("3. Update application");
    println!("4. Delete application");
    println!("5. Total applications");
    println!("6. Exit");
}

fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    label: &str,
) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(line?),
        None => Ok("6".to_string()), // stdin closed: behave like "exit"
    }
}

fn create_flow(
    db: &Database,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    println!("--- New application ---");
    let company = prompt(lines, "Company: ")?;
    let position = prompt(lines, "Position: ")?;
    let status = prompt(lines, "Status (applied/interviewing/offered/rejected): ")?;
    let date_applied = prompt(lines, "Date applied (YYYY-MM-DD): ")?;
    let salary = prompt(lines, "Salary (optional): ")?;
    let job_url = prompt(lines, "Job URL (optional): ")?;
    let remarks = prompt(lines, "Remarks (optional): ")?;

    let draft = JobDraft {
        company,
        position,
        status,
        date_applied: DateInput::Text(date_applied),
        salary: optional(salary).map(SalaryInput::Text),
        job_url: optional(job_url),
        remarks: optional(remarks),
    };

    match db.create_job(&draft) {
        Ok(id) => println!("Created application #{id}"),
        Err(e) => print_error(&e),
    }
    Ok(())
}

fn list_flow(db: &Database) -> Result<()> {
    let jobs = db.list_jobs()?;
    if jobs.is_empty() {
        println!("No applications yet.");
        return Ok(());
    }

    println!(
        "{:<6} {:<14} {:<24} {:<24} {:<12} {:>12}",
        "ID", "STATUS", "COMPANY", "POSITION", "APPLIED", "SALARY"
    );
    println!("{}", "-".repeat(98));
    for job in jobs {
        print_row(&job);
    }
    Ok(())
}

fn print_row(job: &JobApplication) {
    let salary = match job.salary {
        Some(s) => format!("{s:.0}"),
        None => "-".to_string(),
    };
    println!(
        "{:<6} {:<14} {:<24} {:<24} {:<12} {:>12}",
        job.id,
        job.status,
        truncate(&job.company, 22),
        truncate(&job.position, 22),
        job.date_applied.format("%Y-%m-%d"),
        salary
    );
}

fn update_flow(
    db: &Database,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    println!("--- Update application ---");
    let id = prompt(lines, "Application ID: ")?;
    println!("Enter new values (leave blank to keep the current value):");

    let company = prompt(lines, "Company: ")?;
    let position = prompt(lines, "Position: ")?;
    let status = prompt(lines, "Status: ")?;
    let date_applied = prompt(lines, "Date applied (YYYY-MM-DD): ")?;
    let salary = prompt(lines, "Salary: ")?;
    let job_url = prompt(lines, "Job URL: ")?;
    let remarks = prompt(lines, "Remarks: ")?;

    // A blank line means "no change"; this adapter never clears fields.
    let patch = JobPatch {
        company: optional(company),
        position: optional(position),
        status: optional(status),
        date_applied: optional(date_applied).map(DateInput::Text),
        salary: field_patch(salary, SalaryInput::Text),
        job_url: field_patch(job_url, |s| s),
        remarks: field_patch(remarks, |s| s),
    };

    match db.update_job(id.trim(), &patch) {
        Ok(job) => {
            println!("Updated:");
            print_row(&job);
        }
        Err(e) => print_error(&e),
    }
    Ok(())
}

fn delete_flow(
    db: &Database,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    let id = prompt(lines, "Application ID to delete: ")?;
    match db.delete_job(id.trim()) {
        Ok(true) => println!("Deleted application #{}", id.trim()),
        Ok(false) => println!("No application with id '{}'.", id.trim()),
        Err(e) => print_error(&e),
    }
    Ok(())
}

fn count_flow(db: &Database) -> Result<()> {
    match db.count_jobs() {
        Ok(count) => println!("Total applications: {count}"),
        Err(e) => print_error(&e),
    }
    Ok(())
}

fn print_error(err: &RepoError) {
    match err {
        RepoError::Validation { .. } => println!("Invalid input: {err}"),
        RepoError::NotFound(_) => println!("{err}"),
        RepoError::Storage(_) => println!("Error: {err}"),
    }
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn field_patch<T>(value: String, wrap: impl FnOnce(String) -> T) -> FieldPatch<T> {
    match optional(value) {
        Some(v) => FieldPatch::Set(wrap(v)),
        None => FieldPatch::Unchanged,
    }
}

// Counts chars, not bytes: field text is user-entered and may be
// multibyte, so byte slicing could land inside a char.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
