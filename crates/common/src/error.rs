//! Common error types

use thiserror::Error;

/// Errors raised while loading configuration or seeding state from disk.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_detail() {
        let err = Error::Config("refresh_url must start with http:// or https://".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: refresh_url must start with http:// or https://"
        );
    }

    #[test]
    fn io_error_converts_with_prefix() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "credentials.json").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn toml_error_converts() {
        let parse: std::result::Result<toml::Value, _> = toml::from_str("not = valid = toml");
        let err: Error = parse.unwrap_err().into();
        assert!(
            format!("{err:?}").contains("Toml"),
            "Debug should include variant name, got: {err:?}"
        );
    }
}
