use std::env;
use std::os::unix::process::CommandExt;
use std::process;

use team_tab_bar::{PermissionRequest, StatusUpdate};

const STATUS_PIPE: &str = "team-tab-bar:status";

fn print_help() {
    eprintln!("team-tab-bar - CLI companion for the team-tab-bar plugin");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  team-tab-bar status <team> [options]                 Send status update");
    eprintln!("  team-tab-bar permission <team> <origin> <permission> Raise a permission request");
    eprintln!("  team-tab-bar clear-permission <team>                 Drop a pending request");
    eprintln!("  team-tab-bar --help                                  Show this help");
    eprintln!();
    eprintln!("Status options:");
    eprintln!("  --unread <n>               Unread message count");
    eprintln!("  --unread-at-active         Unread activity in the active channel");
    eprintln!("  --read-at-active           Clear the active-channel unread flag");
    eprintln!("  --mentions <n>             Mention count");
    eprintln!("  --mentions-at-active <n>   Mentions in the active channel");
    eprintln!("  --expired                  Session expired, re-login required");
    eprintln!("  --active                   Session valid again");
}

fn fail(msg: &str) -> ! {
    eprintln!("team-tab-bar: {}", msg);
    process::exit(1);
}

// ============================================================================
// Argument parsing
// ============================================================================

fn parse_count(flag: &str, value: Option<&String>) -> i64 {
    match value.map(|v| v.parse::<i64>()) {
        Some(Ok(n)) => n,
        Some(Err(_)) => fail(&format!("{} expects a number", flag)),
        None => fail(&format!("{} needs a value", flag)),
    }
}

fn parse_status(args: &[String]) -> StatusUpdate {
    let Some(team) = args.first() else {
        fail("usage: team-tab-bar status <team> [options]");
    };

    let mut update = StatusUpdate {
        team: team.clone(),
        ..Default::default()
    };

    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--unread" => update.unread_count = Some(parse_count(flag, rest.next())),
            "--unread-at-active" => update.unread_at_active = Some(true),
            "--read-at-active" => update.unread_at_active = Some(false),
            "--mentions" => update.mention_count = Some(parse_count(flag, rest.next())),
            "--mentions-at-active" => {
                update.mention_at_active_count = Some(parse_count(flag, rest.next()))
            }
            "--expired" => update.session_expired = Some(true),
            "--active" => update.session_expired = Some(false),
            other => fail(&format!("unknown option '{}'", other)),
        }
    }

    update
}

fn parse_permission(args: &[String]) -> StatusUpdate {
    match args {
        [team, origin, permission] => StatusUpdate {
            team: team.clone(),
            permission: Some(PermissionRequest {
                origin: origin.clone(),
                permission: permission.clone(),
            }),
            ..Default::default()
        },
        _ => fail("usage: team-tab-bar permission <team> <origin> <permission>"),
    }
}

fn parse_clear_permission(args: &[String]) -> StatusUpdate {
    match args {
        [team] => StatusUpdate {
            team: team.clone(),
            clear_permission: true,
            ..Default::default()
        },
        _ => fail("usage: team-tab-bar clear-permission <team>"),
    }
}

// ============================================================================
// Sending
// ============================================================================

fn send(update: &StatusUpdate) -> ! {
    // Outside zellij there is no plugin to talk to
    if env::var("ZELLIJ").is_err() {
        process::exit(0);
    }

    let payload = serde_json::to_string(update)
        .unwrap_or_else(|e| fail(&format!("failed to serialize update: {}", e)));

    let err = process::Command::new("zellij")
        .args(["pipe", "--name", STATUS_PIPE, "--", &payload])
        .exec();
    fail(&format!("failed to exec zellij: {}", err));
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        process::exit(1);
    }

    let update = match args[0].as_str() {
        "--help" | "-h" => {
            print_help();
            return;
        }
        "status" => parse_status(&args[1..]),
        "permission" => parse_permission(&args[1..]),
        "clear-permission" => parse_clear_permission(&args[1..]),
        other => {
            eprintln!("team-tab-bar: unknown command '{}'", other);
            eprintln!("Run with --help for usage");
            process::exit(1);
        }
    };

    send(&update);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_status_flags() {
        let update = parse_status(&args(&[
            "alpha",
            "--unread",
            "4",
            "--mentions",
            "2",
            "--mentions-at-active",
            "1",
            "--unread-at-active",
            "--expired",
        ]));
        assert_eq!(update.team, "alpha");
        assert_eq!(update.unread_count, Some(4));
        assert_eq!(update.mention_count, Some(2));
        assert_eq!(update.mention_at_active_count, Some(1));
        assert_eq!(update.unread_at_active, Some(true));
        assert_eq!(update.session_expired, Some(true));
    }

    #[test]
    fn test_parse_status_only_sends_given_fields() {
        let update = parse_status(&args(&["alpha", "--active"]));
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"team":"alpha","session_expired":false}"#);
    }

    #[test]
    fn test_parse_permission() {
        let update = parse_permission(&args(&["alpha", "https://a.example", "notifications"]));
        let request = update.permission.unwrap();
        assert_eq!(request.origin, "https://a.example");
        assert_eq!(request.permission, "notifications");
        assert!(!update.clear_permission);
    }

    #[test]
    fn test_parse_clear_permission() {
        let update = parse_clear_permission(&args(&["alpha"]));
        assert!(update.clear_permission);
        assert!(update.permission.is_none());
    }
}
