#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("forge CLI not available on PATH")]
    CliNotAvailable,

    #[error("forge CLI failed: {message}")]
    CliError { message: String },

    #[error("failed to parse forge CLI output: {message}")]
    ParseError { message: String },

    #[error("IO error invoking forge CLI: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}
