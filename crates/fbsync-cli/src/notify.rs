use anyhow::Result;
use fbsync_core::DeviceContact;
use fbsync_sync::vcf::device_contact_vcard;
use tracing::warn;

/// One device-only contact, ready to be sent back to the address book owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactReply {
    pub subject: String,
    pub body: String,
    pub file_name: String,
    pub vcard: String,
}

impl ContactReply {
    pub fn new(contact: &DeviceContact, subject_prefix: &str, phonebook: &str, separator: &str) -> Self {
        Self {
            subject: format!("{subject_prefix}: {phonebook}"),
            body: "Add this contact to your CardDAV server:".to_string(),
            file_name: format!("{}.vcf", file_stem(&contact.name)),
            vcard: device_contact_vcard(contact, separator),
        }
    }
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "contact".to_string()
    } else {
        stem
    }
}

pub trait Notifier {
    fn send(&self, reply: &ContactReply) -> Result<()>;
}

/// Used when no `[reply]` section is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, reply: &ContactReply) -> Result<()> {
        warn!(file = %reply.file_name, "{}", reply.subject);
        Ok(())
    }
}

#[cfg(feature = "email-notify")]
pub struct EmailNotifier {
    from: lettre::message::Mailbox,
    to: Vec<lettre::message::Mailbox>,
    transport: lettre::SmtpTransport,
}

#[cfg(feature = "email-notify")]
impl EmailNotifier {
    pub fn new(config: &fbsync_config::ReplyConfig) -> Result<Self> {
        use crate::error::invalid_input;
        use lettre::transport::smtp::authentication::Credentials;
        use std::time::Duration;

        let from: lettre::message::Mailbox = config
            .from
            .parse()
            .map_err(|_| invalid_input("reply.from must be a valid email address"))?;
        let mut to = Vec::with_capacity(config.to.len());
        for raw in &config.to {
            let mailbox: lettre::message::Mailbox = raw
                .parse()
                .map_err(|_| invalid_input("reply.to must contain valid email addresses"))?;
            to.push(mailbox);
        }

        let mut builder = match config.tls {
            fbsync_config::EmailTls::Tls => lettre::SmtpTransport::relay(&config.smtp_host)
                .map_err(|_| invalid_input("invalid reply.smtp_host"))?,
            fbsync_config::EmailTls::StartTls => {
                lettre::SmtpTransport::starttls_relay(&config.smtp_host)
                    .map_err(|_| invalid_input("invalid reply.smtp_host"))?
            }
            fbsync_config::EmailTls::None => {
                lettre::SmtpTransport::builder_dangerous(&config.smtp_host)
            }
        };

        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }

        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Some(Duration::from_secs(seconds)));
        }

        if let Some(username) = config.username.as_deref() {
            let password = fbsync_config::resolve_secret(config.password_env.as_deref())?;
            builder = builder.credentials(Credentials::new(username.to_string(), password));
        }

        Ok(Self {
            from,
            to,
            transport: builder.build(),
        })
    }
}

#[cfg(feature = "email-notify")]
impl Notifier for EmailNotifier {
    fn send(&self, reply: &ContactReply) -> Result<()> {
        use lettre::message::header::ContentType;
        use lettre::message::{Attachment, MultiPart, SinglePart};
        use lettre::Message;
        use lettre::Transport as _;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(reply.subject.clone());
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }

        let vcard_type = ContentType::parse("text/x-vcard")?;
        let message = builder.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(reply.body.clone()))
                .singlepart(
                    Attachment::new(reply.file_name.clone()).body(reply.vcard.clone(), vcard_type),
                ),
        )?;
        self.transport.send(&message)?;
        Ok(())
    }
}
