use crossterm::style::Stylize;
use std::io;
use std::time::Duration;

use conncheck::checks;
use conncheck::config::EnvReport;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn print_help() {
    println!("{}", "conncheck - backend connectivity diagnostics".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  conncheck [OPTIONS]");
    println!();
    println!("{}", "Options:".yellow());
    println!(
        "  {} - Per-request timeout in seconds (default {})",
        "--timeout <secs>".green(),
        DEFAULT_TIMEOUT_SECS
    );
    println!("  {}           - Show this help", "--help".green());
    println!();
    println!("{}", "Environment:".yellow());
    println!("  NEXT_PUBLIC_SUPABASE_URL       - backend base URL (required)");
    println!("  NEXT_PUBLIC_SUPABASE_ANON_KEY  - public API key (required)");
    println!("  DATABASE_URL                   - reported only, never dialed");
    println!();
}

fn parse_timeout(args: &[String]) -> Result<Duration, String> {
    let secs = match args.iter().position(|arg| arg == "--timeout") {
        Some(pos) => {
            let value = args
                .get(pos + 1)
                .ok_or_else(|| "--timeout requires a value".to_string())?;
            value
                .parse::<u64>()
                .map_err(|_| format!("invalid --timeout value: {}", value))?
        }
        None => DEFAULT_TIMEOUT_SECS,
    };
    Ok(Duration::from_secs(secs))
}

fn main() {
    conncheck::logging::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        print_help();
        return;
    }

    let timeout = match parse_timeout(&args) {
        Ok(timeout) => timeout,
        Err(e) => {
            eprintln!("{}", format!("❌ {}", e).red());
            std::process::exit(checks::EXIT_FAILURE);
        }
    };

    let mut stdout = io::stdout();
    match checks::run(EnvReport::from_env(), timeout, &mut stdout) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", format!("❌ Unexpected error: {:#}", e).red());
            std::process::exit(checks::EXIT_FAILURE);
        }
    }
}
