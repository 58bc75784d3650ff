//! Administrative commands over the settings store.
//!
//! This is where operator text becomes a stored value: every value argument
//! goes through [`SettingValue::parse_input`]. Callers are expected to have
//! authorised the operator already; the local stdio adapter treats whoever
//! owns the terminal as an administrator.

pub mod stdio;

use std::fmt::Write as _;

use crate::error::AppError;
use crate::settings::{SettingValue, SettingsStore};

#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Get { key: String },
    Set { key: String, value: SettingValue },
    SetMany(Vec<(String, SettingValue)>),
    Del { key: String },
    List,
    Reload,
    Save,
    Path,
    Help,
    Exit,
}

pub const USAGE: &str = "\
commands:
  /get <key>
  /set <key> <value>
  /setmany <key>=<value> [<key>=<value> ...]
  /del <key>
  /list
  /reload
  /save
  /path
  /exit
  /help";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<AdminCommand>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let Some(cmdline) = trimmed.strip_prefix('/') else {
        return Err("expected slash command (first non-whitespace character must be '/')".to_string());
    };

    let mut parts = cmdline.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match command {
        "get" => single_key(rest, "/get <key>").map(|key| Some(AdminCommand::Get { key })),
        "del" => single_key(rest, "/del <key>").map(|key| Some(AdminCommand::Del { key })),
        "set" => {
            let mut kv = rest.splitn(2, char::is_whitespace);
            let key = kv.next().unwrap_or_default();
            let value = kv.next().unwrap_or_default().trim();
            if key.is_empty() || value.is_empty() {
                return Err("usage: /set <key> <value>".to_string());
            }
            Ok(Some(AdminCommand::Set {
                key: key.to_string(),
                value: SettingValue::parse_input(value),
            }))
        }
        "setmany" => parse_pairs(rest).map(|pairs| Some(AdminCommand::SetMany(pairs))),
        "list" => ensure_no_args(rest, AdminCommand::List),
        "reload" => ensure_no_args(rest, AdminCommand::Reload),
        "save" => ensure_no_args(rest, AdminCommand::Save),
        "path" => ensure_no_args(rest, AdminCommand::Path),
        "help" => ensure_no_args(rest, AdminCommand::Help),
        "exit" => ensure_no_args(rest, AdminCommand::Exit),
        "" => Err("usage: /<command> [args]".to_string()),
        other => Err(format!("unknown command: /{other}")),
    }
}

fn single_key(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

fn parse_pairs(rest: &str) -> Result<Vec<(String, SettingValue)>, String> {
    if rest.is_empty() {
        return Err("usage: /setmany <key>=<value> [<key>=<value> ...]".to_string());
    }
    rest.split_whitespace()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                Ok((key.to_string(), SettingValue::parse_input(value)))
            }
            _ => Err(format!("malformed pair '{pair}', expected <key>=<value>")),
        })
        .collect()
}

fn ensure_no_args(rest: &str, command: AdminCommand) -> Result<Option<AdminCommand>, String> {
    if rest.is_empty() {
        Ok(Some(command))
    } else {
        Err("unexpected arguments".to_string())
    }
}

/// Run `command` against `store` and render the reply text.
///
/// Blocks on file I/O for writes and reloads; async callers should run it
/// on a blocking thread.
pub fn execute(store: &SettingsStore, command: AdminCommand) -> Result<String, AppError> {
    let reply = match command {
        AdminCommand::Get { key } => match store.get(&key) {
            Some(value) => format!("{key} = {value} ({})", value.type_name()),
            None => format!("{key} (unset)"),
        },
        AdminCommand::Set { key, value } => {
            let reply = format!("ok: {key} = {value}");
            store.set(key, value)?;
            reply
        }
        AdminCommand::SetMany(pairs) => {
            let count = pairs.len();
            store.update(pairs)?;
            format!("ok: {count} setting(s) updated")
        }
        AdminCommand::Del { key } => {
            if store.remove(&key)? {
                format!("ok: {key} removed")
            } else {
                format!("{key} was not set")
            }
        }
        AdminCommand::List => {
            let all = store.all();
            if all.is_empty() {
                "(no settings)".to_string()
            } else {
                let mut out = String::new();
                for (key, value) in &all {
                    let _ = writeln!(out, "{key} = {value}");
                }
                out.trim_end().to_string()
            }
        }
        AdminCommand::Reload => {
            store.reload()?;
            format!("ok: reloaded {} setting(s)", store.all().len())
        }
        AdminCommand::Save => {
            store.save()?;
            format!("ok: saved (revision {})", store.revision())
        }
        AdminCommand::Path => store.path().display().to_string(),
        AdminCommand::Help => USAGE.to_string(),
        AdminCommand::Exit => "bye".to_string(),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Settings, default_settings};
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> SettingsStore {
        SettingsStore::open(tmp.path().join("settings.json"), default_settings()).unwrap()
    }

    #[test]
    fn parse_blank_line_is_none() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn parse_requires_slash_prefix() {
        let err = parse_command("get x").expect_err("non-command input should fail");
        assert!(err.contains("first non-whitespace"));
    }

    #[test]
    fn parse_set_coerces_value() {
        assert_eq!(
            parse_command("  /set initial_points 200").unwrap(),
            Some(AdminCommand::Set {
                key: "initial_points".into(),
                value: SettingValue::Int(200),
            })
        );
        assert_eq!(
            parse_command("/set rate 0.75").unwrap(),
            Some(AdminCommand::Set { key: "rate".into(), value: SettingValue::Float(0.75) })
        );
        assert_eq!(
            parse_command("/set greeting hello there").unwrap(),
            Some(AdminCommand::Set {
                key: "greeting".into(),
                value: SettingValue::from("hello there"),
            })
        );
    }

    #[test]
    fn parse_set_without_value_fails() {
        assert!(parse_command("/set key").is_err());
        assert!(parse_command("/set").is_err());
    }

    #[test]
    fn parse_setmany_pairs() {
        assert_eq!(
            parse_command("/setmany a=1 b=x").unwrap(),
            Some(AdminCommand::SetMany(vec![
                ("a".into(), SettingValue::Int(1)),
                ("b".into(), SettingValue::from("x")),
            ]))
        );
        assert!(parse_command("/setmany a=1 broken").is_err());
        assert!(parse_command("/setmany").is_err());
    }

    #[test]
    fn parse_rejects_unknown_and_extra_args() {
        assert!(parse_command("/frobnicate").unwrap_err().contains("unknown command"));
        assert!(parse_command("/list now").is_err());
        assert!(parse_command("/get two keys").is_err());
        assert!(parse_command("/").is_err());
    }

    #[test]
    fn parse_save() {
        assert_eq!(parse_command("/save").unwrap(), Some(AdminCommand::Save));
        assert!(parse_command("/save now").is_err());
    }

    #[test]
    fn execute_save_rewrites_file_from_cache() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::write(store.path(), "").unwrap();

        let before = store.revision();
        let reply = execute(&store, AdminCommand::Save).unwrap();
        assert_eq!(reply, format!("ok: saved (revision {})", before + 1));

        let on_disk: Settings =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, store.all());
    }

    #[test]
    fn execute_rejects_unrepresentable_value() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let cmd = AdminCommand::Set { key: "ratio".into(), value: SettingValue::Float(f64::NAN) };
        assert!(matches!(execute(&store, cmd), Err(AppError::InvalidValue { .. })));
    }

    #[test]
    fn execute_set_get_del() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let cmd = parse_command("/set invite_points 75").unwrap().unwrap();
        assert_eq!(execute(&store, cmd).unwrap(), "ok: invite_points = 75");
        assert_eq!(store.get_int("invite_points"), Some(75));

        let get = AdminCommand::Get { key: "invite_points".into() };
        assert_eq!(execute(&store, get).unwrap(), "invite_points = 75 (int)");

        let del = AdminCommand::Del { key: "invite_points".into() };
        assert_eq!(execute(&store, del.clone()).unwrap(), "ok: invite_points removed");
        assert_eq!(execute(&store, del).unwrap(), "invite_points was not set");

        let get = AdminCommand::Get { key: "invite_points".into() };
        assert_eq!(execute(&store, get).unwrap(), "invite_points (unset)");
    }

    #[test]
    fn execute_list_is_sorted() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert_eq!(
            execute(&store, AdminCommand::List).unwrap(),
            "initial_points = 100\ninvite_points = 50"
        );
    }

    #[test]
    fn execute_list_empty() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::open(tmp.path().join("s.json"), Settings::new()).unwrap();
        assert_eq!(execute(&store, AdminCommand::List).unwrap(), "(no settings)");
    }

    #[test]
    fn execute_setmany_is_one_write() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let before = store.revision();

        let cmd = parse_command("/setmany initial_points=1 invite_points=2").unwrap().unwrap();
        assert_eq!(execute(&store, cmd).unwrap(), "ok: 2 setting(s) updated");
        assert_eq!(store.revision(), before + 1);
    }

    #[test]
    fn execute_reload_and_path() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::write(store.path(), r#"{"extra": "v"}"#).unwrap();

        assert_eq!(execute(&store, AdminCommand::Reload).unwrap(), "ok: reloaded 3 setting(s)");
        assert_eq!(
            execute(&store, AdminCommand::Path).unwrap(),
            store.path().display().to_string()
        );
    }
}
