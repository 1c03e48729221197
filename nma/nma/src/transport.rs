use std::fmt::Debug;
use std::sync::Arc;

/// Error raised when no HTTP exchange completed e.g. connection refused or DNS failure.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// A completed HTTP exchange, whatever its status code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Exchange {
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text e.g. "Bad Request".
    pub status_text: String,
    /// Raw response body.
    pub body: String,
}

/// HTTP-capable collaborator of [`crate::Client`].
///
/// Implemented for [`ureq::Agent`], which is the default. Implement it yourself to
/// route requests elsewhere or to substitute a test double.
pub trait Transport: Debug + Send + Sync {
    /// Issues a GET request with query parameters.
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Exchange, TransportError>;

    /// Issues a POST request with a form-encoded body.
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Exchange, TransportError>;
}

impl Transport for ureq::Agent {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Exchange, TransportError> {
        let request = query
            .iter()
            .fold(ureq::Agent::get(self, url), |r, (k, v)| r.query(k, v));
        exchange(request.call())
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Exchange, TransportError> {
        exchange(ureq::Agent::post(self, url).send_form(form))
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Exchange, TransportError> {
        (**self).get(url, query)
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Exchange, TransportError> {
        (**self).post_form(url, form)
    }
}

pub(crate) fn default_transport() -> ureq::Agent {
    let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
    ureq::AgentBuilder::new().user_agent(user_agent).build()
}

// ureq reports non-2xx responses as errors, but they are completed exchanges
fn exchange(result: Result<ureq::Response, ureq::Error>) -> Result<Exchange, TransportError> {
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(e) => return Err(Box::new(e)),
    };
    let status = response.status();
    let status_text = response.status_text().to_string();
    let body = response.into_string()?;
    Ok(Exchange {
        status,
        status_text,
        body,
    })
}
