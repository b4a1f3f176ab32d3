//! Email delivery and link-building settings.

use crate::env_parse;

#[derive(Clone)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub app_name: String,
    pub frontend_url: String,
    pub activation_path: String,
    pub reset_password_path: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "no-reply@appointme.local".to_string(),
            from_name: "AppointMe".to_string(),
            app_name: "AppointMe".to_string(),
            frontend_url: "http://localhost:4200".to_string(),
            activation_path: "activate-account".to_string(),
            reset_password_path: "reset-password".to_string(),
        }
    }
}

impl EmailConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var_or = |key: &str, default: String| std::env::var(key).unwrap_or(default);

        Self {
            enabled: std::env::var("SMTP_ENABLED")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            smtp_host: var_or("SMTP_HOST", defaults.smtp_host),
            smtp_port: env_parse("SMTP_PORT").unwrap_or(defaults.smtp_port),
            smtp_username: var_or("SMTP_USERNAME", defaults.smtp_username),
            smtp_password: var_or("SMTP_PASSWORD", defaults.smtp_password),
            from_email: var_or("FROM_EMAIL", defaults.from_email),
            from_name: var_or("FROM_NAME", defaults.from_name),
            app_name: var_or("APP_NAME", defaults.app_name),
            frontend_url: var_or("FRONTEND_URL", defaults.frontend_url),
            activation_path: var_or("ACTIVATION_PATH", defaults.activation_path),
            reset_password_path: var_or("RESET_PASSWORD_PATH", defaults.reset_password_path),
        }
    }

    /// Page the verification email links to.
    pub fn activation_url(&self) -> String {
        join_url(&self.frontend_url, &self.activation_path)
    }

    /// Page the password reset email links to.
    pub fn reset_password_url(&self) -> String {
        join_url(&self.frontend_url, &self.reset_password_path)
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("frontend_url", &self.frontend_url)
            .finish_non_exhaustive()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
