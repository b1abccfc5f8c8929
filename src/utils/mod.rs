//! The `utils` module provides shared pieces used across the `webdraw`
//! application: the top-level error type and logging setup.

pub mod error;
pub mod logging;

pub use error::RelayError;

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("warn");
    }

    #[test]
    fn parse_level_falls_back_to_info() {
        assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
        assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
        assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
    }
}
