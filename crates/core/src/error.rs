/// Errors raised while building the router or talking to the gateway.
///
/// Classification itself never fails; these surface at construction
/// boundaries (pattern tables, credentials) and in signature checks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A pattern row whose regex does not compile.
    #[error("invalid pattern for {intent}: {pattern}: {source}")]
    InvalidPattern {
        intent: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A pattern row whose capture list disagrees with its regex groups.
    #[error(
        "pattern for {intent} has {groups} capture groups \
         but declares {declared} captures: {pattern}"
    )]
    CaptureMismatch {
        intent: String,
        pattern: String,
        groups: usize,
        declared: usize,
    },

    /// An intent name in configuration that the router does not know.
    #[error("unknown intent: {0}")]
    UnknownIntent(String),

    /// A capture kind name in configuration that the router does not know.
    #[error("unknown capture kind: {0}")]
    UnknownCapture(String),

    /// A credential required by the outbound sender is not configured.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A webhook signature header that is not `sha256=<hex>`.
    #[error("malformed signature header: {0}")]
    MalformedSignature(String),
}
