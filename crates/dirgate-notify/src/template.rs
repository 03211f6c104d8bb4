//! Message rendering.

use handlebars::Handlebars;
use serde::Serialize;

use dirgate_secrets::{SecretValue, MASKED_SECRET};

use crate::error::NotificationError;

/// Message used when no active template exists.
pub const DEFAULT_TEMPLATE: &str =
    "Hello {{full_name}},\nYour account is ready.\nUsername: {{username}}\nPassword: {{password}}";

/// Placeholders available to every template.
pub const TEMPLATE_VARIABLES: [&str; 3] = ["username", "password", "full_name"];

/// Values substituted into a template.
#[derive(Debug, Clone)]
pub struct MessageVars<'a> {
    pub username: &'a str,
    pub full_name: &'a str,
    pub password: &'a SecretValue,
}

#[derive(Serialize)]
struct RenderData<'a> {
    username: &'a str,
    password: &'a str,
    full_name: &'a str,
}

/// Render `template` (or [`DEFAULT_TEMPLATE`]) with the real secret.
///
/// Strict mode: an unknown placeholder is an error rather than an empty
/// substitution. Output is plain text, so nothing is HTML-escaped.
pub fn render_template(template: Option<&str>, vars: &MessageVars<'_>) -> Result<String, NotificationError> {
    render(template, vars, vars.password.expose())
}

/// Same as [`render_template`] with the secret replaced by the mask, for logs.
pub fn render_masked(template: Option<&str>, vars: &MessageVars<'_>) -> Result<String, NotificationError> {
    render(template, vars, MASKED_SECRET)
}

fn render(template: Option<&str>, vars: &MessageVars<'_>, password: &str) -> Result<String, NotificationError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    let data = RenderData {
        username: vars.username,
        password,
        full_name: vars.full_name,
    };
    handlebars
        .render_template(template.unwrap_or(DEFAULT_TEMPLATE), &data)
        .map_err(|e| NotificationError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(secret: &SecretValue) -> MessageVars<'_> {
        MessageVars {
            username: "alice",
            full_name: "Alice <Admin>",
            password: secret,
        }
    }

    #[test]
    fn test_default_template() {
        let secret = SecretValue::new("Xk9#mQ2!vB");
        let text = render_template(None, &vars(&secret)).unwrap();
        assert!(text.contains("Username: alice"));
        assert!(text.contains("Password: Xk9#mQ2!vB"));
    }

    #[test]
    fn test_no_html_escaping() {
        let secret = SecretValue::new("a&b<c>");
        let text = render_template(Some("{{full_name}} {{password}}"), &vars(&secret)).unwrap();
        assert_eq!(text, "Alice <Admin> a&b<c>");
    }

    #[test]
    fn test_masked_render_hides_secret() {
        let secret = SecretValue::new("Xk9#mQ2!vB");
        let text = render_masked(Some("{{username}}: {{password}}"), &vars(&secret)).unwrap();
        assert_eq!(text, "alice: ********");
    }

    #[test]
    fn test_unknown_placeholder_is_error() {
        let secret = SecretValue::new("x");
        let err = render_template(Some("Hi {{nickname}}"), &vars(&secret)).unwrap_err();
        assert!(matches!(err, NotificationError::Template(_)));
    }
}
