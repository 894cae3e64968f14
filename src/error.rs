use miette::Diagnostic;
use thiserror::Error;

/// Main error type for KoboToolbox MCP operations
#[derive(Error, Debug, Diagnostic)]
pub enum KoboError {
    #[error("Configuration error")]
    #[diagnostic(help("Check KOBO_API_TOKEN and KOBO_SERVER"))]
    Config(#[from] ConfigError),

    #[error("KoboToolbox API error")]
    #[diagnostic(help("Check network connectivity and the server base URL"))]
    Http(#[from] HttpError),

    #[error("Failed to {action} {path}")]
    #[diagnostic(
        code(kobo::io_failed),
        help("Check that the path is writable and the disk has space")
    )]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("KOBO_API_TOKEN environment variable is not set")]
    #[diagnostic(
        code(kobo::config::missing_token),
        help("Create an API token under account settings on your KoboToolbox server and export it as KOBO_API_TOKEN")
    )]
    MissingToken,

    #[error("Invalid server base URL: {url}")]
    #[diagnostic(
        code(kobo::config::invalid_server),
        help("KOBO_SERVER must be an http(s) URL, e.g. https://kf.kobotoolbox.org")
    )]
    InvalidServer { url: String },
}

/// Errors raised by the request executor
#[derive(Error, Debug, Diagnostic)]
pub enum HttpError {
    #[error("{method} {path} returned {status}")]
    #[diagnostic(
        code(kobo::http::status),
        help("The response body usually carries a detail message from the server")
    )]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Request to {path} failed")]
    #[diagnostic(code(kobo::http::transport))]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build request for {path}")]
    #[diagnostic(code(kobo::http::build_request))]
    BuildRequest {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to initialize HTTP client")]
    #[diagnostic(code(kobo::http::client_init))]
    ClientInit(#[source] reqwest::Error),
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, KoboError>;
