//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const LIBOS: &'static str = "libos";
    pub const SERVER_NAME: &'static str = "server_name";
    pub const SERVER_IP: &'static str = "server_ip";
    pub const CLIENT_NAME: &'static str = "client_name";
    pub const CLIENT_IP: &'static str = "client_ip";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Placeholders still present after rendering, e.g. `{{typo}}`.
pub fn unresolved(rendered: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = rendered;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        found.push(after[..end].to_string());
        rest = &after[end + 2..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render(
            "--local {{server_ip}}:12345 --peer {{server_ip}}",
            &[(TemplateVars::SERVER_IP, "10.0.1.8")],
        );
        assert_eq!(out, "--local 10.0.1.8:12345 --peer 10.0.1.8");
    }

    #[test]
    fn unresolved_lists_leftover_placeholders() {
        assert_eq!(unresolved("--addr {{sever_ip}}:1 {{x}}"), vec!["sever_ip", "x"]);
        assert!(unresolved("--addr 10.0.1.8").is_empty());
    }
}
