use std::time::Duration;

use anyhow::Context as _;
use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::domain::repository::Mailer;
use crate::error::AccountsServiceError;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// SMTP delivery over STARTTLS. The transport is synchronous, so sends run
/// on the blocking pool.
#[derive(Clone)]
pub struct SmtpMailer {
    host: String,
    username: String,
    password: String,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        username: &str,
        password: &str,
        from: &str,
    ) -> Result<Self, AccountsServiceError> {
        let from = from.parse().context("parse smtp from address")?;
        Ok(Self {
            host: host.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            from,
        })
    }

    fn transport(&self) -> Result<SmtpTransport, AccountsServiceError> {
        let transport = SmtpTransport::starttls_relay(&self.host)
            .context("create smtp transport")?
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(transport)
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<Message, AccountsServiceError> {
        let to = to.parse::<Mailbox>().context("parse recipient address")?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_owned()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_owned()),
                    ),
            )
            .context("build email message")?;
        Ok(message)
    }
}

impl Mailer for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AccountsServiceError> {
        let message = self.build_message(to, subject, text_body, html_body)?;
        let transport = self.transport()?;
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("email send task panicked")?
            .context("send email over smtp")?;
        Ok(())
    }
}
