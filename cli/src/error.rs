use conductor_core::CoordinationError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid plan: {0}")]
    Plan(#[from] CoordinationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// 0: success
    /// 1: run finished with failed tasks (returned as a normal exit code, not as an error)
    /// 11: config error
    /// 20: IO error
    /// 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Plan(e) if e.is_configuration() => 11,
            CliError::Plan(_) => 50,
            CliError::Io(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 11);
        assert_eq!(
            CliError::from(CoordinationError::CircularDependency("a -> a".into())).exit_code(),
            11
        );
        assert_eq!(
            CliError::from(CoordinationError::Interrupted("join".into())).exit_code(),
            50
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(CliError::from(io).exit_code(), 20);
    }
}
