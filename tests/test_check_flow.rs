use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use conncheck::checks::{self, CheckStatus, EXIT_FAILURE, EXIT_OK};
use conncheck::client::BackendClient;
use conncheck::config::{Config, EnvReport, ENV_ANON_KEY, ENV_URL};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal HTTP/1.1 responder backing the connectivity checks in tests.
/// Routes on the request path (query string included) and closes the
/// connection after each response.
fn spawn_stub<F>(route: F) -> String
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let addr = listener.local_addr().expect("stub server addr");

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };

            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        head.extend_from_slice(&buf[..n]);
                        if head.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }

            let request = String::from_utf8_lossy(&head);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
            let (status, body) = route(&path);
            let reason = match status {
                200 => "OK",
                403 => "Forbidden",
                404 => "Not Found",
                500 => "Internal Server Error",
                _ => "Error",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{}", addr)
}

fn healthy_route(path: &str) -> (u16, String) {
    if path.starts_with("/rest/v1/_dummy_") {
        (200, "[]".to_string())
    } else if path.starts_with("/storage/v1/bucket") {
        (
            200,
            r#"[{"id":"avatars","name":"avatars","public":true},{"id":"exports","name":"exports","public":false}]"#
                .to_string(),
        )
    } else if path.starts_with("/auth/v1/health") {
        (
            200,
            r#"{"version":"v2.158.1","name":"GoTrue","description":"GoTrue is a user registration and authentication API"}"#
                .to_string(),
        )
    } else {
        (404, r#"{"message":"unknown route"}"#.to_string())
    }
}

fn env_for(url: &str) -> EnvReport {
    let url = url.to_string();
    EnvReport::from_lookup(move |key| match key {
        ENV_URL => Some(url.clone()),
        ENV_ANON_KEY => Some("test-anon-key".to_string()),
        _ => None,
    })
}

fn run_to_string(report: EnvReport) -> (i32, String) {
    let mut out = Vec::new();
    let code = checks::run(report, TIMEOUT, &mut out).expect("run succeeds");
    (code, String::from_utf8(out).expect("utf8 output"))
}

#[test]
fn test_healthy_stack_passes_all_checks() {
    let base_url = spawn_stub(healthy_route);
    let (code, output) = run_to_string(env_for(&base_url));

    assert_eq!(code, EXIT_OK);
    assert!(output.contains("Successfully connected"), "{output}");
    assert!(
        output.contains("Storage accessible. Buckets: 2 (avatars, exports)"),
        "{output}"
    );
    assert!(output.contains("Auth service accessible"), "{output}");
    assert!(output.contains("All tests completed!"), "{output}");
}

#[test]
fn test_missing_relation_counts_as_connected() {
    let base_url = spawn_stub(|path| {
        if path.starts_with("/rest/v1/_dummy_") {
            (
                404,
                r#"{"code":"42P01","details":null,"hint":null,"message":"relation \"public._dummy_\" does not exist"}"#
                    .to_string(),
            )
        } else {
            healthy_route(path)
        }
    });
    let (code, output) = run_to_string(env_for(&base_url));

    assert_eq!(code, EXIT_OK);
    assert!(
        output.contains("Successfully connected (table not found is expected)"),
        "{output}"
    );
    assert!(output.contains("All tests completed!"), "{output}");
}

#[test]
fn test_connection_refused_is_fatal() {
    // Bind and immediately drop so the port is known to refuse connections
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let (code, output) = run_to_string(env_for(&format!("http://{}", addr)));

    assert_eq!(code, EXIT_FAILURE);
    assert!(output.contains("Failed to connect"), "{output}");
    assert!(!output.contains("Test 2"), "{output}");
    assert!(!output.contains("Test 3"), "{output}");
    assert!(!output.contains("All tests completed!"), "{output}");
}

#[test]
fn test_database_service_error_skips_remaining_checks() {
    let later_checks = Arc::new(AtomicUsize::new(0));
    let seen = later_checks.clone();
    let base_url = spawn_stub(move |path| {
        if path.starts_with("/rest/v1/_dummy_") {
            (
                403,
                r#"{"code":"42501","message":"permission denied for schema public"}"#.to_string(),
            )
        } else {
            seen.fetch_add(1, Ordering::SeqCst);
            healthy_route(path)
        }
    });
    let (code, output) = run_to_string(env_for(&base_url));

    assert_eq!(code, EXIT_FAILURE);
    assert!(output.contains("Database error"), "{output}");
    assert_eq!(later_checks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_soft_failures_do_not_change_exit_code() {
    let base_url = spawn_stub(|path| {
        if path.starts_with("/rest/v1/_dummy_") {
            (200, "[]".to_string())
        } else if path.starts_with("/storage/v1/bucket") {
            (
                500,
                r#"{"statusCode":"500","error":"Internal","message":"storage backend offline"}"#
                    .to_string(),
            )
        } else {
            (404, r#"{"code":404,"msg":"health endpoint disabled"}"#.to_string())
        }
    });
    let (code, output) = run_to_string(env_for(&base_url));

    assert_eq!(code, EXIT_OK);
    assert!(output.contains("Storage error"), "{output}");
    assert!(output.contains("storage backend offline"), "{output}");
    assert!(output.contains("Auth error"), "{output}");
    assert!(output.contains("All tests completed!"), "{output}");
}

#[test]
fn test_check_report_statuses() {
    let base_url = spawn_stub(|path| {
        if path.starts_with("/storage/v1/bucket") {
            (500, r#"{"message":"boom"}"#.to_string())
        } else {
            healthy_route(path)
        }
    });
    let config = Config {
        url: base_url,
        anon_key: "test-anon-key".to_string(),
    };
    let client = BackendClient::new(&config, TIMEOUT).expect("client");

    let mut out = Vec::new();
    let report = checks::run_checks(&client, &mut out).expect("run_checks");

    assert_eq!(report.database, CheckStatus::Passed);
    assert_eq!(report.storage, CheckStatus::Failed);
    assert_eq!(report.auth, CheckStatus::Passed);
    assert_eq!(report.exit_code(), EXIT_OK);
}

#[test]
fn test_repeated_runs_are_idempotent() {
    let base_url = spawn_stub(healthy_route);

    let (first_code, first_output) = run_to_string(env_for(&base_url));
    let (second_code, second_output) = run_to_string(env_for(&base_url));

    assert_eq!(first_code, second_code);
    assert_eq!(first_output, second_output);
}

#[test]
fn test_empty_bucket_list_reports_zero() {
    let base_url = spawn_stub(|path| {
        if path.starts_with("/storage/v1/bucket") {
            (200, "[]".to_string())
        } else {
            healthy_route(path)
        }
    });
    let (code, output) = run_to_string(env_for(&base_url));

    assert_eq!(code, EXIT_OK);
    assert!(output.contains("Storage accessible. Buckets: 0"), "{output}");
}
