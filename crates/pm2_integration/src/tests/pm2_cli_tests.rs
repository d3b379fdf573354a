use super::*;

#[test]
fn parses_jlist_records_in_supervisor_order() {
    let raw = br#"[
        {"pm_id": 3, "name": "worker", "pm2_env": {"status": "stopped"}},
        {"pm_id": 0, "name": "api", "pm2_env": {"status": "online", "pm_uptime": 1}},
        {"pm_id": 5, "name": "cron"}
    ]"#;
    let records = parse_jlist(raw).expect("parse");

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id.as_str(), "3");
    assert_eq!(records[0].status, ProcessStatus::Stopped);
    assert_eq!(records[1].name, "api");
    assert_eq!(records[1].status, ProcessStatus::Online);
    assert_eq!(records[2].status, ProcessStatus::Unknown);
}

#[test]
fn skips_notices_printed_before_the_json_array() {
    let raw = b">>>> In-memory PM2 is out-of-date, do:\n>>>> $ pm2 update\n[{\"pm_id\":1,\"name\":\"a\",\"pm2_env\":{\"status\":\"errored\"}}]";
    let records = parse_jlist(raw).expect("parse");
    assert_eq!(records[0].status, ProcessStatus::Errored);
}

#[test]
fn skips_bracketed_daemon_banner_lines() {
    let raw = b"[PM2] Spawning PM2 daemon with pm2_home=/root/.pm2\n[PM2] PM2 Successfully daemonized\n[{\"pm_id\":0,\"name\":\"api\",\"pm2_env\":{\"status\":\"online\"}}]\n";
    let records = parse_jlist(raw).expect("parse");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "api");
    assert_eq!(records[0].status, ProcessStatus::Online);
}

#[test]
fn banner_without_a_list_is_a_parse_error() {
    let err = parse_jlist(b"[PM2] Spawning PM2 daemon\n[PM2] PM2 Successfully daemonized\n")
        .expect_err("should fail");
    assert!(matches!(err, SupervisorError::Parse(_)));
}

#[test]
fn rejects_output_without_a_list() {
    let err = parse_jlist(b"daemon not running").expect_err("should fail");
    assert!(matches!(err, SupervisorError::Parse(_)));

    let err = parse_jlist(b"[{\"name\": 1}]").expect_err("should fail");
    assert!(matches!(err, SupervisorError::Parse(_)));
}

#[tokio::test]
async fn missing_binary_reports_unavailable() {
    let cli = Pm2Cli::new("/nonexistent/pm2-binary-for-tests");
    let err = cli.list().await.expect_err("should fail");
    assert!(matches!(err, SupervisorError::Unavailable(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_command_carries_stderr_detail() {
    use std::{
        fs,
        os::unix::fs::PermissionsExt,
        time::{SystemTime, UNIX_EPOCH},
    };

    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("pm2_panel_cli_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let script = temp_root.join("pm2");
    fs::write(
        &script,
        "#!/bin/sh\n\
         case \"$1\" in\n\
         jlist) echo '[{\"pm_id\":7,\"name\":\"api\",\"pm2_env\":{\"status\":\"online\"}}]' ;;\n\
         stop) echo \"process not found\" >&2; exit 1 ;;\n\
         *) exit 0 ;;\n\
         esac\n",
    )
    .expect("write script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

    let cli = Pm2Cli::new(&script);
    cli.connect().await.expect("ping");
    let records = cli.list().await.expect("list");
    assert_eq!(records[0].id.as_str(), "7");

    let err = cli
        .stop(&ProcessId::parse("7").expect("id"))
        .await
        .expect_err("stop should fail");
    assert_eq!(
        err,
        SupervisorError::CommandFailed {
            command: "stop 7".to_string(),
            detail: "process not found".to_string(),
        }
    );
    cli.restart(&ProcessId::parse("7").expect("id"))
        .await
        .expect("restart");

    fs::remove_dir_all(temp_root).expect("cleanup");
}
