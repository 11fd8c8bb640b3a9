use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use tracing::trace;

use crate::error::ODataError;
use crate::odata_framework::ClientSettings;

pub const SUBSCRIPTION_KEY_HEADER: &str = "ocp-apim-subscription-key";
pub const TRACE_HEADER: &str = "ocp-apim-trace";

/// The three values the API gateway expects on every call.
#[derive(Clone, Default, PartialEq)]
pub struct GatewayCredentials {
    /// Sent verbatim as the `Authorization` header, e.g. `Basic dXNlcjpwYXNz`.
    pub authorization: String,
    pub subscription_key: String,
    pub trace: String,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("authorization", &"<redacted>")
            .field("subscription_key", &"<redacted>")
            .field("trace", &self.trace)
            .finish()
    }
}

/// Parses the service root and installs the gateway header decorator.
///
/// Header values are checked here so a value that cannot travel in an HTTP
/// header fails at configuration time rather than on every request. No network
/// call is made.
///
/// # Errors
/// `ODataError::Configuration` for a malformed base URL or an unrepresentable
/// header value.
pub fn configure(base_url: &str, credentials: &GatewayCredentials) -> Result<ClientSettings, ODataError> {
    let settings = ClientSettings::new(base_url)?;

    let authorization = header_value("Authorization", &credentials.authorization, true)?;
    let subscription_key = header_value("Ocp-Apim-Subscription-Key", &credentials.subscription_key, true)?;
    let trace_flag = header_value("Ocp-Apim-Trace", &credentials.trace, false)?;

    Ok(settings.before_request(move |request| {
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, authorization.clone());
        headers.insert(HeaderName::from_static(SUBSCRIPTION_KEY_HEADER), subscription_key.clone());
        headers.insert(HeaderName::from_static(TRACE_HEADER), trace_flag.clone());
        trace!(method = %request.method(), url = %request.url(), "Applied gateway headers");
    }))
}

fn header_value(name: &str, value: &str, sensitive: bool) -> Result<HeaderValue, ODataError> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| ODataError::Configuration(format!("{name} is not a valid header value")))?;
    header.set_sensitive(sensitive);
    Ok(header)
}
