//! Shell escaping and quoting utilities for POSIX sh and PowerShell.

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}

/// Quote a remote path, keeping a leading `~` or `$HOME` pointed at the remote home.
/// `~/demikernel` becomes `"$HOME"/'demikernel'`.
pub fn quote_home_path(path: &str) -> String {
    let rest = ["~", "$HOME", "${HOME}"].iter().find_map(|home| {
        let rest = path.strip_prefix(home)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    });

    match rest {
        None => quote_path(path),
        Some("") => "\"$HOME\"".to_string(),
        Some(rest) => format!("\"$HOME\"/{}", quote_path(rest.trim_start_matches('/'))),
    }
}

/// Double-quote a value so the remote shell still expands `$VARS` inside it.
pub fn quote_expandable(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

/// Quote a PowerShell string literal. PowerShell escapes `'` by doubling it.
pub fn quote_powershell_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Double-quote a PowerShell string so `$env:` and `$HOME` still expand.
/// PowerShell escapes with a backtick rather than a backslash.
pub fn quote_powershell_expandable(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '`') {
            escaped.push('`');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

/// Wrap a whole script as the `-Command` argument of a PowerShell invocation.
pub fn quote_powershell_command(script: &str) -> String {
    format!("\"{}\"", script.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_paths_expand_remotely() {
        assert_eq!(quote_home_path("~/demikernel"), "\"$HOME\"/'demikernel'");
        assert_eq!(quote_home_path("$HOME/my repo"), "\"$HOME\"/'my repo'");
        assert_eq!(quote_home_path("${HOME}/demikernel"), "\"$HOME\"/'demikernel'");
        assert_eq!(quote_home_path("~"), "\"$HOME\"");
        assert_eq!(quote_home_path("/srv/demikernel"), "'/srv/demikernel'");
        assert_eq!(quote_home_path("~ci/demikernel"), "'~ci/demikernel'");
        assert_eq!(quote_home_path("$HOMEDIR/x"), "'$HOMEDIR/x'");
    }

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("catnap"), "catnap");
        assert_eq!(quote_arg("dev"), "dev");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("feature branch"), "'feature branch'");
    }

    #[test]
    fn quote_arg_with_single_quote() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_path_always_quotes() {
        assert_eq!(quote_path("/home/ci/repo"), "'/home/ci/repo'");
        assert_eq!(quote_path("/home/ci/it's"), "'/home/ci/it'\\''s'");
    }

    #[test]
    fn quote_expandable_keeps_variables() {
        assert_eq!(quote_expandable("$HOME/config.yaml"), "\"$HOME/config.yaml\"");
        assert_eq!(quote_expandable("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn powershell_literal_doubles_quotes() {
        assert_eq!(quote_powershell_literal("C:\\repos\\demi"), "'C:\\repos\\demi'");
        assert_eq!(quote_powershell_literal("it's"), "'it''s'");
    }

    #[test]
    fn powershell_expandable_keeps_backslashes() {
        assert_eq!(
            quote_powershell_expandable("C:\\ci\\config.yaml"),
            "\"C:\\ci\\config.yaml\""
        );
        assert_eq!(quote_powershell_expandable("a\"b"), "\"a`\"b\"");
    }

    #[test]
    fn powershell_command_escapes_double_quotes() {
        assert_eq!(
            quote_powershell_command("$env:X=\"1\"; nmake"),
            "\"$env:X=\\\"1\\\"; nmake\""
        );
    }
}
