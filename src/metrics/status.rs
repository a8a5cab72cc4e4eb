//! HTTP status-code classification.

/// Class of an HTTP response status code.
///
/// Codes in `[100, 600)` map to one of the five counted classes; everything
/// else is [`StatusClass::Unclassified`] and is never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    Unclassified,
}

impl StatusClass {
    /// The counted classes, in counter order.
    pub const COUNTED: [StatusClass; 5] = [
        StatusClass::Informational,
        StatusClass::Success,
        StatusClass::Redirection,
        StatusClass::ClientError,
        StatusClass::ServerError,
    ];

    pub fn from_code(code: u16) -> Self {
        match code {
            100..=199 => StatusClass::Informational,
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirection,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Unclassified,
        }
    }

    /// Name of the counter tracking this class, if it is counted.
    pub fn counter_name(self) -> Option<&'static str> {
        match self {
            StatusClass::Informational => Some("http_1XX_requests_total"),
            StatusClass::Success => Some("http_2XX_requests_total"),
            StatusClass::Redirection => Some("http_3XX_requests_total"),
            StatusClass::ClientError => Some("http_4XX_requests_total"),
            StatusClass::ServerError => Some("http_5XX_requests_total"),
            StatusClass::Unclassified => None,
        }
    }

    pub fn help_text(self) -> Option<&'static str> {
        match self {
            StatusClass::Informational => Some("HTTP 1XX Status Codes"),
            StatusClass::Success => Some("HTTP 2XX Status Codes"),
            StatusClass::Redirection => Some("HTTP 3XX Status Codes"),
            StatusClass::ClientError => Some("HTTP 4XX Status Codes"),
            StatusClass::ServerError => Some("HTTP 5XX Status Codes"),
            StatusClass::Unclassified => None,
        }
    }

    /// Position within [`StatusClass::COUNTED`], if counted.
    pub(crate) fn index(self) -> Option<usize> {
        match self {
            StatusClass::Informational => Some(0),
            StatusClass::Success => Some(1),
            StatusClass::Redirection => Some(2),
            StatusClass::ClientError => Some(3),
            StatusClass::ServerError => Some(4),
            StatusClass::Unclassified => None,
        }
    }
}
