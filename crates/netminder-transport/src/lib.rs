//! # netminder-transport
//!
//! Outbound text-message delivery for the netminder assistant.
//!
//! Delivery is fire-and-forget from the assistant's perspective: the
//! [`Transport`] trait has a single `deliver` call, and any retry policy
//! belongs to the implementation. [`SmsGateway`] posts to a Twilio-style
//! REST endpoint, [`ConsoleTransport`] logs instead of sending (the
//! disabled-SMS mode), and [`RecordingTransport`] captures messages for
//! tests.

use async_trait::async_trait;
use netminder_core::{ContactAddress, NetminderError, Result, SmsConfig};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Message delivery to a contact address
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `text` to `address`
    async fn deliver(&self, address: &ContactAddress, text: &str) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn deliver(&self, address: &ContactAddress, text: &str) -> Result<()> {
        (**self).deliver(address, text).await
    }
}

/// Twilio-style SMS gateway
#[derive(Debug, Clone)]
pub struct SmsGateway {
    account_id: String,
    auth_token: String,
    from_number: String,
    enabled: bool,
}

impl SmsGateway {
    pub fn new(
        account_id: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            enabled: true,
        }
    }

    /// Build a gateway from the environment variables named in `config`
    pub fn from_env(config: &SmsConfig) -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .map_err(|_| NetminderError::Config(format!("Missing SMS credential in ${}", name)))
        };

        Ok(Self {
            account_id: read(&config.account_env)?,
            auth_token: read(&config.token_env)?,
            from_number: read(&config.from_number_env)?,
            enabled: config.enabled,
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[async_trait]
impl Transport for SmsGateway {
    async fn deliver(&self, address: &ContactAddress, text: &str) -> Result<()> {
        if !self.enabled {
            debug!("SMS disabled; skipping delivery to {}", address);
            return Ok(());
        }

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_id
        );

        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .form(&[
                ("To", address.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", text),
            ])
            .send()
            .await
            .map_err(|e| NetminderError::Transport(format!("Failed to send SMS: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(NetminderError::Transport(format!(
                "SMS gateway error {}: {}",
                status, error_text
            )));
        }

        debug!("Delivered SMS to {}", address);
        Ok(())
    }
}

/// Logs outbound messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn deliver(&self, address: &ContactAddress, text: &str) -> Result<()> {
        info!("SMS to {}: {}", address, text);
        Ok(())
    }
}

/// Records every delivery for later inspection in tests
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(ContactAddress, String)>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message delivered so far, oldest first
    pub fn sent(&self) -> Vec<(ContactAddress, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages delivered to one address, oldest first
    pub fn sent_to(&self, address: &ContactAddress) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == address)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, address: &ContactAddress, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((address.clone(), text.to_string()));
        Ok(())
    }
}
