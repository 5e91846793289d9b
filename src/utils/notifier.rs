//! Student notifications.
//!
//! Notifications are fire-and-forget: [`dispatch`] logs failures at `warn`
//! and never returns them, so a mail outage cannot undo a lifecycle action.

use lettre::message::{Attachment, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tracing::{info, instrument, warn};

use scolarite_config::EmailConfig;
use scolarite_models::complaints::Complaint;
use scolarite_models::requests::DocumentRequest;
use scolarite_models::students::Student;

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to read attachment: {0}")]
    Attachment(#[from] std::io::Error),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    RequestReceived,
    RequestAccepted,
    RequestRejected,
    ComplaintReceived,
    ComplaintResolved,
}

/// One message to a student.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient_email: String,
    pub recipient_name: String,
    pub reference: String,
    pub document_type: String,
    pub status: String,
    /// Refusal reason or complaint response
    pub reason: Option<String>,
    pub attachment: Option<PathBuf>,
}

impl Notification {
    pub fn for_request(
        kind: NotificationKind,
        student: &Student,
        request: &DocumentRequest,
        attachment: Option<PathBuf>,
    ) -> Self {
        Self {
            kind,
            recipient_email: student.email.clone(),
            recipient_name: format!("{} {}", student.first_name, student.last_name),
            reference: request.reference.clone(),
            document_type: request.document_type.title().to_string(),
            status: request.status.as_str().to_string(),
            reason: request.refusal_reason.clone(),
            attachment,
        }
    }

    pub fn for_complaint(
        kind: NotificationKind,
        student: &Student,
        request: &DocumentRequest,
        complaint: &Complaint,
        attachment: Option<PathBuf>,
    ) -> Self {
        Self {
            kind,
            recipient_email: student.email.clone(),
            recipient_name: format!("{} {}", student.first_name, student.last_name),
            reference: complaint.reference.clone(),
            document_type: request.document_type.title().to_string(),
            status: complaint.status.as_str().to_string(),
            reason: complaint.response.clone(),
            attachment,
        }
    }

    fn subject(&self) -> String {
        match self.kind {
            NotificationKind::RequestReceived => {
                format!("Demande {} enregistrée", self.reference)
            }
            NotificationKind::RequestAccepted => format!("Demande {} acceptée", self.reference),
            NotificationKind::RequestRejected => format!("Demande {} refusée", self.reference),
            NotificationKind::ComplaintReceived => {
                format!("Réclamation {} enregistrée", self.reference)
            }
            NotificationKind::ComplaintResolved => {
                format!("Réclamation {} traitée", self.reference)
            }
        }
    }

    fn body(&self) -> String {
        let mut body = format!("Bonjour {},\n\n", self.recipient_name);

        let line = match self.kind {
            NotificationKind::RequestReceived => format!(
                "Votre demande de {} a bien été enregistrée sous la référence {}. \
                 Vous pouvez suivre son état avec cette référence.",
                self.document_type, self.reference
            ),
            NotificationKind::RequestAccepted => format!(
                "Votre demande de {} (référence {}) a été acceptée.",
                self.document_type, self.reference
            ),
            NotificationKind::RequestRejected => format!(
                "Votre demande de {} (référence {}) a été refusée.",
                self.document_type, self.reference
            ),
            NotificationKind::ComplaintReceived => format!(
                "Votre réclamation concernant votre {} a été enregistrée sous la référence {}.",
                self.document_type, self.reference
            ),
            NotificationKind::ComplaintResolved => format!(
                "Votre réclamation {} a été traitée.",
                self.reference
            ),
        };
        body.push_str(&line);

        if let Some(reason) = &self.reason {
            let label = match self.kind {
                NotificationKind::RequestRejected => "Motif",
                _ => "Réponse",
            };
            body.push_str(&format!("\n\n{} : {}", label, reason));
        }
        if self.attachment.is_some() {
            body.push_str("\n\nLe document est joint à ce message.");
        }

        body.push_str("\n\nCordialement,\nService de la scolarité");
        body
    }
}

pub trait Notifier: Send + Sync {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a>;
}

/// Send `notification`, logging instead of returning failures.
pub async fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.send(&notification).await {
        warn!(
            reference = %notification.reference,
            recipient = %notification.recipient_email,
            error = %e,
            "Failed to notify student"
        );
    }
}

/// Logs notifications instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        Box::pin(async move {
            info!(
                kind = ?notification.kind,
                reference = %notification.reference,
                recipient = %notification.recipient_email,
                attachment = ?notification.attachment,
                "Notification"
            );
            Ok(())
        })
    }
}

/// Sends notifications by SMTP. Does nothing unless `SMTP_ENABLED` is set.
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn mailer(&self) -> Result<SmtpTransport, NotifyError> {
        if self.config.smtp_username.is_empty() {
            return Ok(SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build());
        }

        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| NotifyError::Transport(format!("Failed to create SMTP relay: {}", e)))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build())
    }

    async fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        let text = notification.body();

        let mut body = MultiPart::mixed().singlepart(
            SinglePart::builder()
                .header(header::ContentType::TEXT_PLAIN)
                .body(text),
        );

        if let Some(path) = &notification.attachment {
            let content = tokio::fs::read(path).await?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}.pdf", notification.reference));
            let content_type = header::ContentType::parse("application/pdf")
                .map_err(|e| NotifyError::Build(e.to_string()))?;
            body = body.singlepart(Attachment::new(filename).body(content, content_type));
        }

        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| NotifyError::Address(format!("from: {}", e)))?,
            )
            .to(notification
                .recipient_email
                .parse()
                .map_err(|e| NotifyError::Address(format!("to: {}", e)))?)
            .subject(notification.subject())
            .multipart(body)
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

impl Notifier for EmailNotifier {
    #[instrument(skip(self, notification), fields(reference = %notification.reference))]
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        Box::pin(async move {
            if !self.config.enabled {
                info!("SMTP disabled, skipping notification");
                return Ok(());
            }

            let email = self.build_message(notification).await?;
            let mailer = self.mailer()?;

            tokio::task::spawn_blocking(move || mailer.send(&email))
                .await
                .map_err(|e| NotifyError::Transport(format!("Task join error: {}", e)))?
                .map_err(|e| NotifyError::Transport(e.to_string()))?;

            info!(recipient = %notification.recipient_email, "Notification sent");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            kind,
            recipient_email: "amal@etu.ma".to_string(),
            recipient_name: "Amal Idrissi".to_string(),
            reference: "AS-2025-001".to_string(),
            document_type: "Attestation de scolarité".to_string(),
            status: "Refusé".to_string(),
            reason: Some("Dossier incomplet".to_string()),
            attachment: None,
        }
    }

    #[test]
    fn test_rejection_body_carries_reason() {
        let n = notification(NotificationKind::RequestRejected);
        assert_eq!(n.subject(), "Demande AS-2025-001 refusée");
        assert!(n.body().contains("Motif : Dossier incomplet"));
    }

    #[tokio::test]
    async fn test_disabled_smtp_is_a_no_op() {
        let notifier = EmailNotifier::new(EmailConfig {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "scolarite@universite.ma".to_string(),
            from_name: "Service Scolarité".to_string(),
            frontend_url: String::new(),
        });
        assert!(
            notifier
                .send(&notification(NotificationKind::RequestAccepted))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_missing_attachment_fails_build() {
        let notifier = EmailNotifier::new(EmailConfig::from_env());
        let mut n = notification(NotificationKind::RequestAccepted);
        n.attachment = Some(PathBuf::from("/nonexistent/AS-2025-001-final.pdf"));

        let err = notifier.build_message(&n).await.unwrap_err();
        assert!(matches!(err, NotifyError::Attachment(_)));
    }
}
