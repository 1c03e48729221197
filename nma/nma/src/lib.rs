#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! NMA is NotifyMyAndroid API client in Rust 2021 edition.
//!
//! ```no_run
//! use nma::{Client, Notification, Priority};
//!
//! let mut client = Client::new("apikey");
//! client.set_developer_key("developerkey");
//!
//! let mut n = Notification::new("application", "event", "description");
//! n.priority = Priority::High;
//! let quota = client.notify(&n)?;
//! println!("{} calls remaining", quota.remaining);
//! # Ok::<(), nma::NotificationError>(())
//! ```

use std::borrow::Cow;
use std::fmt::Display;

use log::debug;
use thiserror::Error;

pub use response::{decode, interpret, DecodeError, ServiceError, ServiceResponse, Success};
pub use transport::{Exchange, Transport, TransportError};

mod response;
mod transport;

/// NotifyMyAndroid server.
pub const API_SERVER: &str = "https://www.notifymyandroid.com";
/// Path to verify an API key.
pub const VERIFY_PATH: &str = "/publicapi/verify";
/// Path to send a notification.
pub const NOTIFY_PATH: &str = "/publicapi/notify";

/// Notification error. Exactly one kind per failed call.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// No HTTP exchange completed.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
    /// Exchange completed with a status outside `[200, 300)`.
    #[error("HTTP Error {status_text} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// HTTP status text.
        status_text: String,
        /// Raw response body.
        body: String,
    },
    /// Wrapped [`crate::DecodeError`].
    #[error("deserialization error: {0}")]
    Decode(#[from] DecodeError),
    /// Error reported by the service in a well-formed response.
    #[error("{message}")]
    Service {
        /// Error code reported by the service.
        code: i32,
        /// Message reported by the service, verbatim.
        message: String,
        /// Minutes until the rate limit resets, if reported.
        reset_timer: Option<i64>,
    },
}

/// Messages may be sent with a different priority
/// that affects how the message is presented to the user.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Priority {
    /// Very low
    #[strum(to_string = "-2", serialize = "very-low", serialize = "verylow")]
    VeryLow,
    /// Moderate
    #[strum(to_string = "-1", serialize = "moderate")]
    Moderate,
    /// Normal (default)
    #[default]
    #[strum(to_string = "0", serialize = "normal")]
    Normal,
    /// High
    #[strum(to_string = "1", serialize = "high")]
    High,
    /// Emergency
    #[strum(to_string = "2", serialize = "emergency")]
    Emergency,
}

impl Priority {
    /// Numeric value sent to the service.
    pub fn value(self) -> i8 {
        match self {
            Priority::VeryLow => -2,
            Priority::Moderate => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Emergency => 2,
        }
    }
}

/// Content type of the description.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum ContentType {
    /// HTML, rendered by the device
    #[strum(to_string = "text/html", serialize = "html")]
    HTML,
    /// Plain text
    #[strum(to_string = "text/plain", serialize = "text")]
    Text,
}

/// NotifyMyAndroid API parameters of one notification.
#[derive(Default, Debug)]
pub struct Notification<'a> {
    /// The name of the application that is generating the call.
    pub application: Cow<'a, str>,
    /// The event that occurred, depends on your application e.g. "New e-mail".
    pub event: Cow<'a, str>,
    /// A description of the event.
    pub description: Cow<'a, str>,
    /// Not sent when [`Priority::Normal`].
    pub priority: Priority,
    /// URL to open when the notification is tapped. Not sent when empty.
    pub url: Option<&'a str>,
    /// Content type of the description.
    pub content_type: Option<ContentType>,
}

impl<'a> Notification<'a> {
    /// Creates a [`Notification`] with normal priority.
    ///
    /// ```rust
    /// # use nma::Notification;
    /// Notification::new("application", "event", "description");
    /// ```
    pub fn new<T>(application: T, event: T, description: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        Self {
            application: application.into(),
            event: event.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
fn server_url() -> String {
    mockito::server_url()
}

#[cfg(not(test))]
fn server_url() -> String {
    API_SERVER.to_string()
}

fn add_optional_text<T: Display>(
    f: &mut Vec<(&'static str, String)>,
    n: &'static str,
    v: Option<T>,
) {
    if let Some(v) = v {
        let v = v.to_string();
        if !v.is_empty() {
            f.push((n, v));
        }
    }
}

/// NotifyMyAndroid client.
///
/// Configure it once with [`Client::add_key`] and [`Client::set_developer_key`],
/// then [`Client::verify`] and [`Client::notify`] only read it.
#[derive(Debug)]
pub struct Client {
    api_keys: Vec<String>,
    developer_key: Option<String>,
    base_url: String,
    transport: Box<dyn Transport>,
}

impl Client {
    /// Creates a [`Client`] with an API key and the default transport.
    ///
    /// ```
    /// # use nma::Client;
    /// let client = Client::new("apikey");
    /// ```
    pub fn new<T: Into<String>>(api_key: T) -> Self {
        Self::with_transport(api_key, transport::default_transport())
    }

    /// Creates a [`Client`] with an API key and a custom [`Transport`].
    pub fn with_transport<T, R>(api_key: T, transport: R) -> Self
    where
        T: Into<String>,
        R: Transport + 'static,
    {
        Self {
            api_keys: vec![api_key.into()],
            developer_key: None,
            base_url: server_url(),
            transport: Box::new(transport),
        }
    }

    /// Sends requests to another server instead of [`API_SERVER`].
    ///
    /// ```
    /// # use nma::Client;
    /// let client = Client::new("apikey").with_base_url("http://localhost:8080/");
    /// ```
    pub fn with_base_url<T: Into<String>>(mut self, base_url: T) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Adds an API key. All keys are sent comma separated, in the order added.
    pub fn add_key<T: Into<String>>(&mut self, api_key: T) {
        self.api_keys.push(api_key.into());
    }

    /// Sets the developer key attached to every subsequent request. Empty key clears it.
    pub fn set_developer_key<T: Into<String>>(&mut self, developer_key: T) {
        let developer_key = developer_key.into();
        self.developer_key = if developer_key.is_empty() {
            None
        } else {
            Some(developer_key)
        };
    }

    /// API keys in the order added.
    pub fn keys(&self) -> &[String] {
        &self.api_keys
    }

    /// Developer key, if set.
    pub fn developer_key(&self) -> Option<&str> {
        self.developer_key.as_deref()
    }

    /// Verifies a single API key, not the stored ones.
    pub fn verify(&self, api_key: &str) -> Result<Success, NotificationError> {
        let mut query = vec![("apikey", api_key)];
        if let Some(ref k) = self.developer_key {
            query.push(("developerkey", k.as_str()));
        }

        let uri = format!("{}{VERIFY_PATH}", self.base_url);
        debug!("GET {uri}");
        let exchange = self
            .transport
            .get(&uri, &query)
            .map_err(NotificationError::Transport)?;
        interpret(&exchange)
    }

    /// Send [`Notification`] to NotifyMyAndroid.
    pub fn notify(&self, n: &Notification<'_>) -> Result<Success, NotificationError> {
        let form = self.build_form(n);
        let form: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let uri = format!("{}{NOTIFY_PATH}", self.base_url);
        debug!("POST {uri}");
        let exchange = self
            .transport
            .post_form(&uri, &form)
            .map_err(NotificationError::Transport)?;
        interpret(&exchange)
    }

    fn build_form(&self, n: &Notification<'_>) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("apikey", self.api_keys.join(",")),
            ("application", n.application.to_string()),
            ("description", n.description.to_string()),
            ("event", n.event.to_string()),
        ];

        // zero is the service default
        let priority = (n.priority != Priority::Normal).then(|| n.priority.value());
        add_optional_text(&mut form, "priority", priority);
        add_optional_text(&mut form, "url", n.url);
        add_optional_text(&mut form, "content-type", n.content_type);
        add_optional_text(&mut form, "developerkey", self.developer_key.as_deref());
        form
    }
}
