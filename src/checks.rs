use crossterm::style::Stylize;
use std::io::{self, Write};
use std::time::Duration;

use crate::client::BackendClient;
use crate::config::EnvReport;

/// Table probed by the database check. It is expected not to exist; a
/// missing-relation answer from PostgREST still proves the round trip.
pub const PROBE_TABLE: &str = "_dummy_";

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Failed,
    /// Not attempted because an earlier fatal check stopped the run
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub database: CheckStatus,
    pub storage: CheckStatus,
    pub auth: CheckStatus,
}

impl CheckReport {
    /// Only the database check is fatal; storage and auth are best-effort
    /// diagnostics and never affect the exit code.
    pub fn exit_code(&self) -> i32 {
        if self.database == CheckStatus::Failed {
            EXIT_FAILURE
        } else {
            EXIT_OK
        }
    }
}

pub fn print_env_report(report: &EnvReport, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "📋 Environment Variables:")?;
    for (name, set) in report.rows() {
        let status = if set {
            "✅ Set".green()
        } else {
            "❌ Not set".red()
        };
        writeln!(out, "  {}: {}", name, status)?;
    }
    writeln!(out)
}

/// Entry point shared by the binary and the integration tests: prints the
/// full report to `out` and returns the process exit code.
pub fn run(report: EnvReport, timeout: Duration, out: &mut impl Write) -> anyhow::Result<i32> {
    writeln!(out, "🧪 Starting backend connection tests...")?;
    writeln!(out)?;

    print_env_report(&report, out)?;

    let config = match report.into_config() {
        Ok(config) => config,
        Err(missing) => {
            writeln!(
                out,
                "{}",
                format!(
                    "❌ Required environment variables are not set: {}",
                    missing.join(", ")
                )
                .red()
            )?;
            return Ok(EXIT_FAILURE);
        }
    };

    let client = BackendClient::new(&config, timeout)?;
    let report = run_checks(&client, out)?;

    if report.database == CheckStatus::Passed {
        writeln!(out, "🎉 All tests completed!")?;
    }
    Ok(report.exit_code())
}

/// The three sequential checks. The database check is fatal: on any error
/// other than the missing-relation signature, storage and auth are skipped
/// and the report carries a non-zero exit code.
pub fn run_checks(client: &BackendClient, out: &mut impl Write) -> io::Result<CheckReport> {
    let database = check_database(client, out)?;
    if database == CheckStatus::Failed {
        return Ok(CheckReport {
            database,
            storage: CheckStatus::Skipped,
            auth: CheckStatus::Skipped,
        });
    }

    let storage = check_storage(client, out)?;
    let auth = check_auth(client, out)?;

    Ok(CheckReport {
        database,
        storage,
        auth,
    })
}

fn check_database(client: &BackendClient, out: &mut impl Write) -> io::Result<CheckStatus> {
    writeln!(out, "Test 1: Database connection...")?;
    let status = match client.probe_table(PROBE_TABLE) {
        Ok(_) => {
            writeln!(out, "  {}", "✅ Successfully connected".green())?;
            CheckStatus::Passed
        }
        Err(e) if e.is_missing_relation() => {
            writeln!(
                out,
                "  {}",
                "✅ Successfully connected (table not found is expected)".green()
            )?;
            CheckStatus::Passed
        }
        Err(e) if e.is_connection_failure() => {
            writeln!(out, "  {}", "❌ Failed to connect to backend".red())?;
            writeln!(out, "  Error: {}", e)?;
            CheckStatus::Failed
        }
        Err(e) => {
            writeln!(out, "  {}", format!("❌ Database error: {}", e).red())?;
            CheckStatus::Failed
        }
    };
    writeln!(out)?;
    Ok(status)
}

fn check_storage(client: &BackendClient, out: &mut impl Write) -> io::Result<CheckStatus> {
    writeln!(out, "Test 2: Storage connection...")?;
    let status = match client.list_buckets() {
        Ok(buckets) => {
            let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
            let line = if names.is_empty() {
                "✅ Storage accessible. Buckets: 0".to_string()
            } else {
                format!(
                    "✅ Storage accessible. Buckets: {} ({})",
                    names.len(),
                    names.join(", ")
                )
            };
            writeln!(out, "  {}", line.green())?;
            CheckStatus::Passed
        }
        Err(e) => {
            writeln!(out, "  {}", format!("❌ Storage error: {}", e).red())?;
            CheckStatus::Failed
        }
    };
    writeln!(out)?;
    Ok(status)
}

fn check_auth(client: &BackendClient, out: &mut impl Write) -> io::Result<CheckStatus> {
    writeln!(out, "Test 3: Auth connection...")?;
    let status = match client.auth_health() {
        Ok(_) => {
            writeln!(out, "  {}", "✅ Auth service accessible".green())?;
            CheckStatus::Passed
        }
        Err(e) => {
            writeln!(out, "  {}", format!("❌ Auth error: {}", e).red())?;
            CheckStatus::Failed
        }
    };
    writeln!(out)?;
    Ok(status)
}
