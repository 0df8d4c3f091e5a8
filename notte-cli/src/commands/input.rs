//! User input: JSON payload flags, confirmation prompts and session ids.

use std::io::{BufRead, IsTerminal, Read, Write};

use anyhow::{Context, Result, bail};
use notte_store::{ENV_SESSION_ID, EnvSource};
use serde_json::{Value, json};

use crate::Cli;
use crate::output::Output;

// ============================================================================
// JSON Payloads
// ============================================================================

/// Reads a JSON payload flag.
///
/// Accepts inline JSON, `@path` for a file, and `-`, `@-` or an empty value
/// for stdin. Returns the raw bytes.
pub fn read_json_input(value: Option<&str>, flag: &str) -> Result<Vec<u8>> {
    let stdin = std::io::stdin();
    let piped = !stdin.is_terminal();
    read_json_input_from(value.unwrap_or_default(), flag, &mut stdin.lock(), piped)
}

/// [`read_json_input`] with an explicit stdin.
pub fn read_json_input_from(
    value: &str,
    flag: &str,
    stdin: &mut impl Read,
    stdin_piped: bool,
) -> Result<Vec<u8>> {
    let value = value.trim();

    if value.is_empty() || value == "-" {
        return read_stdin(flag, stdin, stdin_piped);
    }

    if let Some(path) = value.strip_prefix('@') {
        if path.is_empty() {
            bail!("invalid {flag} value: missing file path after @");
        }
        if path == "-" {
            return read_stdin(flag, stdin, stdin_piped);
        }
        let data =
            std::fs::read(path).with_context(|| format!("failed to read {flag} file {path:?}"))?;
        if data.trim_ascii().is_empty() {
            bail!("{flag} file {path:?} is empty");
        }
        return Ok(data);
    }

    Ok(value.as_bytes().to_vec())
}

fn read_stdin(flag: &str, stdin: &mut impl Read, stdin_piped: bool) -> Result<Vec<u8>> {
    if !stdin_piped {
        bail!("{flag} is required (use --{flag}, --{flag} @file, or pipe JSON via stdin)");
    }
    let mut data = Vec::new();
    stdin
        .read_to_end(&mut data)
        .with_context(|| format!("failed to read {flag} from stdin"))?;
    if data.trim_ascii().is_empty() {
        bail!("{flag} input is empty");
    }
    Ok(data)
}

/// Reads a payload flag and parses it as JSON.
pub fn parse_json_input(value: Option<&str>, flag: &str) -> Result<Value> {
    let data = read_json_input(value, flag)?;
    serde_json::from_slice(&data).with_context(|| format!("invalid {flag} JSON"))
}

// ============================================================================
// Confirmation
// ============================================================================

/// Asks `Are you sure you want to {action}? [y/N]` unless `--yes` was given.
///
/// When the user declines, `Cancelled.` is printed and `false` returned.
pub fn confirm(cli: &Cli, action: &str) -> Result<bool> {
    if cli.yes {
        return Ok(true);
    }
    let confirmed = prompt_yes_no(&mut std::io::stdin().lock(), &mut std::io::stderr(), action)?;
    if !confirmed {
        Output::from_cli(cli).print_result("Cancelled.", json!({"cancelled": true}))?;
    }
    Ok(confirmed)
}

/// Writes the prompt and reads one answer line. Only `y` and `yes` confirm.
pub fn prompt_yes_no(input: &mut impl BufRead, prompt: &mut impl Write, action: &str) -> Result<bool> {
    write!(prompt, "Are you sure you want to {action}? [y/N] ")?;
    prompt.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

// ============================================================================
// Session IDs
// ============================================================================

/// Session id from `--id`, then `NOTTE_SESSION_ID`.
pub fn resolve_session_id(flag: Option<&str>, env: &dyn EnvSource) -> Result<String> {
    if let Some(id) = flag.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    match env.var(ENV_SESSION_ID) {
        Some(id) => Ok(id),
        None => bail!("session ID required: use --id flag or set {ENV_SESSION_ID} env var"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn read(value: &str, stdin: &str, piped: bool) -> Result<Vec<u8>> {
        read_json_input_from(value, "action", &mut Cursor::new(stdin.as_bytes()), piped)
    }

    #[test]
    fn test_inline_value_is_returned_trimmed() {
        let data = read("  {\"type\":\"go_back\"}  ", "", false).unwrap();
        assert_eq!(data, b"{\"type\":\"go_back\"}");
    }

    #[test]
    fn test_stdin_markers() {
        for marker in ["", "-", "@-"] {
            let data = read(marker, "{\"a\":1}", true).unwrap();
            assert_eq!(data, b"{\"a\":1}");
        }
    }

    #[test]
    fn test_terminal_stdin_requires_flag() {
        let err = read("", "", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "action is required (use --action, --action @file, or pipe JSON via stdin)"
        );
    }

    #[test]
    fn test_empty_stdin_is_rejected() {
        let err = read("-", "  \n", true).unwrap_err();
        assert_eq!(err.to_string(), "action input is empty");
    }

    #[test]
    fn test_bare_at_sign_is_rejected() {
        let err = read("@", "", true).unwrap_err();
        assert_eq!(err.to_string(), "invalid action value: missing file path after @");
    }

    #[test]
    fn test_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("action.json");
        std::fs::write(&path, "{\"type\":\"reload\"}").unwrap();

        let data = read(&format!("@{}", path.display()), "", false).unwrap();
        assert_eq!(data, b"{\"type\":\"reload\"}");
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "\n").unwrap();

        let err = read(&format!("@{}", path.display()), "", false).unwrap_err();
        assert_eq!(err.to_string(), format!("action file {:?} is empty", path.display().to_string()));
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = read("@/nonexistent/action.json", "", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to read action file \"/nonexistent/action.json\""
        );
    }

    #[test]
    fn test_prompt_accepts_yes_variants() {
        for answer in ["y\n", "Y\n", "yes\n", " YES \n"] {
            let mut prompt = Vec::new();
            let confirmed =
                prompt_yes_no(&mut Cursor::new(answer.as_bytes()), &mut prompt, "stop session s1")
                    .unwrap();
            assert!(confirmed, "{answer:?} should confirm");
            assert_eq!(
                String::from_utf8(prompt).unwrap(),
                "Are you sure you want to stop session s1? [y/N] "
            );
        }
    }

    #[test]
    fn test_prompt_defaults_to_no() {
        for answer in ["\n", "n\n", "nope\n", ""] {
            let confirmed =
                prompt_yes_no(&mut Cursor::new(answer.as_bytes()), &mut Vec::new(), "x").unwrap();
            assert!(!confirmed, "{answer:?} should not confirm");
        }
    }

    #[test]
    fn test_session_id_flag_wins() {
        let env = HashMap::from([(ENV_SESSION_ID.to_string(), "from-env".to_string())]);
        assert_eq!(resolve_session_id(Some("from-flag"), &env).unwrap(), "from-flag");
        assert_eq!(resolve_session_id(None, &env).unwrap(), "from-env");
        assert_eq!(resolve_session_id(Some(""), &env).unwrap(), "from-env");
    }

    #[test]
    fn test_missing_session_id() {
        let env: HashMap<String, String> = HashMap::new();
        let err = resolve_session_id(None, &env).unwrap_err();
        assert_eq!(
            err.to_string(),
            "session ID required: use --id flag or set NOTTE_SESSION_ID env var"
        );
    }
}
