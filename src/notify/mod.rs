//! Report delivery by email
//!
//! Delivery is best effort: a missing configuration skips it, and a transport
//! failure is reported to the caller as a non-fatal `Notification` error.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pulldown_cmark::{html, Event, Options, Parser};
use std::time::Duration;

/// SMTP relay settings; only built when every required variable is present
#[derive(Clone, PartialEq)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { recipient: String },
    Skipped { reason: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `body` (Markdown) to `recipient`.
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: Option<&str>,
    ) -> Result<DeliveryOutcome>;
}

/// Notifier that never sends, e.g. for `--no-email`
#[derive(Debug, Clone)]
pub struct NoopNotifier {
    reason: String,
}

impl NoopNotifier {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _: &str, _: &str, _: Option<&str>) -> Result<DeliveryOutcome> {
        Ok(DeliveryOutcome::Skipped {
            reason: self.reason.clone(),
        })
    }
}

pub struct SmtpNotifier {
    config: Option<SmtpConfig>,
}

impl SmtpNotifier {
    pub fn new(config: Option<SmtpConfig>) -> Self {
        Self { config }
    }

    fn transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| {
                    AppError::Notification(format!(
                        "Invalid SMTP relay '{}': {}",
                        config.server, e
                    ))
                })?
                .port(config.port)
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .timeout(Some(config.timeout))
                .build(),
        )
    }

    /// Open a session with the relay (STARTTLS and login) without sending mail.
    ///
    /// Returns `Ok(false)` when SMTP is not configured, `Ok(true)` when the
    /// relay accepted the session.
    pub async fn test_connection(&self) -> Result<bool> {
        let Some(config) = &self.config else {
            return Ok(false);
        };

        tracing::debug!("Testing SMTP session with {}:{}", config.server, config.port);
        let connected = Self::transport(config)?
            .test_connection()
            .await
            .map_err(|e| AppError::Notification(format!("SMTP connection failed: {}", e)))?;

        if connected {
            Ok(true)
        } else {
            Err(AppError::Notification(format!(
                "SMTP connection failed: {} did not answer",
                config.server
            )))
        }
    }

    fn build_message(
        config: &SmtpConfig,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<Message> {
        let from: Mailbox = config.from.parse().map_err(|e| {
            AppError::Notification(format!("Invalid sender '{}': {}", config.from, e))
        })?;
        let to: Mailbox = recipient.parse().map_err(|e| {
            AppError::Notification(format!("Invalid recipient '{}': {}", recipient, e))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                body.to_string(),
                markdown_to_html(body),
            ))
            .map_err(|e| AppError::Notification(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: Option<&str>,
    ) -> Result<DeliveryOutcome> {
        let Some(config) = &self.config else {
            return Ok(DeliveryOutcome::Skipped {
                reason: "SMTP is not configured".to_string(),
            });
        };
        let Some(recipient) = recipient.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(DeliveryOutcome::Skipped {
                reason: "no recipient (EMAIL_TO) configured".to_string(),
            });
        };

        let message = Self::build_message(config, subject, body, recipient)?;

        let mailer = Self::transport(config)?;

        tracing::debug!("Sending report to {} via {}", recipient, config.server);
        mailer
            .send(message)
            .await
            .map_err(|e| AppError::Notification(format!("SMTP delivery failed: {}", e)))?;

        tracing::info!("Report emailed to {}", recipient);
        Ok(DeliveryOutcome::Delivered {
            recipient: recipient.to_string(),
        })
    }
}

const MAIL_STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }\n\
h1 { color: #2c3e50; border-bottom: 2px solid #3498db; }\n\
h2 { color: #34495e; margin-top: 20px; }\n\
h3 { color: #7f8c8d; }\n\
code { background-color: #f4f4f4; padding: 2px 5px; border-radius: 3px; }\n\
pre { background-color: #f4f4f4; padding: 10px; border-radius: 5px; overflow-x: auto; }\n\
table { border-collapse: collapse; }\n\
th, td { border: 1px solid #ddd; padding: 4px 8px; }";

/// Render the Markdown report as a styled HTML mail body.
///
/// Raw HTML in the model output is escaped, not passed through.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);

    format!(
        "<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{}\n</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        MAIL_STYLE, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpConfig {
        SmtpConfig {
            server: "smtp.invalid".into(),
            port: 587,
            username: "bot".into(),
            password: "hunter2".into(),
            from: "Paper Panel <bot@example.com>".into(),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_skipped_without_config() {
        let outcome = SmtpNotifier::new(None)
            .send("s", "b", Some("me@example.com"))
            .await
            .unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_skipped_without_recipient() {
        let outcome = SmtpNotifier::new(Some(smtp()))
            .send("s", "b", None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Skipped {
                reason: "no recipient (EMAIL_TO) configured".into()
            }
        );
    }

    #[tokio::test]
    async fn test_noop_notifier() {
        let outcome = NoopNotifier::new("disabled with --no-email")
            .send("s", "b", Some("me@example.com"))
            .await
            .unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Skipped { reason } if reason.contains("--no-email")));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let err = SmtpNotifier::build_message(&smtp(), "s", "b", "not an address").unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));
        assert!(SmtpNotifier::build_message(&smtp(), "s", "b", "me@example.com").is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        assert!(!format!("{:?}", smtp()).contains("hunter2"));
    }

    #[test]
    fn test_markdown_to_html() {
        let html = markdown_to_html(
            "# Title\n\nSome **bold** and *italic* with `code`.\n\n## Part <2>\n```\nlet x = 1;\n```",
        );
        assert!(html.starts_with("<html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains(
            "<p>Some <strong>bold</strong> and <em>italic</em> with <code>code</code>.</p>"
        ));
        assert!(html.contains("<h2>Part &lt;2&gt;</h2>"));
        assert!(html.contains("<pre><code>let x = 1;\n</code></pre>"));
    }

    #[test]
    fn test_reference_list_and_links_render() {
        let html = markdown_to_html(
            "## References\n\n\
             **[1] ReAct**\n\n\
             - *Authors:* Yao, Zhao\n\
             - *Link:* [2210.03629](http://arxiv.org/abs/2210.03629v3)\n",
        );
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li><em>Authors:</em> Yao, Zhao</li>"));
        assert!(html.contains("<a href=\"http://arxiv.org/abs/2210.03629v3\">2210.03629</a>"));
    }

    #[test]
    fn test_tables_render_and_raw_html_is_escaped() {
        let html = markdown_to_html(
            "| Model | Score |\n|---|---|\n| ReAct | 0.9 |\n\n<script>alert(1)</script>\n",
        );
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>ReAct</td>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_connection_check_without_config() {
        assert!(!SmtpNotifier::new(None).test_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_connection_check_against_closed_port() {
        let config = SmtpConfig {
            server: "127.0.0.1".into(),
            port: 1,
            ..smtp()
        };
        let err = SmtpNotifier::new(Some(config))
            .test_connection()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Notification(_)));
        assert!(!err.is_fatal());
    }
}
