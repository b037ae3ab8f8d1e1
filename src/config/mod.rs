// Configuration module entry point
// Builds the immutable startup configuration from command-line flags and layered settings

mod state;
mod types;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::error::ServeError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LogLevel, Scheme, ServerConfig, Settings};

/// Environment variable prefix, e.g. `GILES_LOGGING__LEVEL=debug`
const ENV_PREFIX: &str = "GILES";

impl Config {
    /// Validate command-line flags and load settings.
    ///
    /// Fails before anything is bound if the root directory is missing or is not a
    /// directory, the address cannot be resolved, or the settings file is invalid.
    pub fn load(cli: &Cli) -> Result<Self, ServeError> {
        let server = ServerConfig::from_cli(cli)?;
        let settings = Settings::load(cli.config.as_deref())?;

        Ok(Self {
            server,
            logging: settings.logging,
            performance: settings.performance,
        })
    }
}

impl Settings {
    /// Load settings from defaults, then `file` (if given), then the environment
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("performance.backlog", 1024)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ServeError> {
        let root = match &cli.root_path {
            Some(path) => path.clone(),
            None => std::env::current_dir().map_err(|e| {
                ServeError::InvalidArgument(format!("cannot determine working directory: {e}"))
            })?,
        };

        Ok(Self {
            root_directory: validate_root(&root)?,
            bind_address: cli.url.clone(),
            port: cli.port,
            scheme: cli.scheme,
            socket_addr: resolve_socket_addr(&cli.url, cli.port)?,
        })
    }

    /// URL advertised at startup, e.g. `http://0.0.0.0:8080/`
    pub fn public_url(&self) -> String {
        let host = self.bind_address.trim_start_matches('[').trim_end_matches(']');
        if host.contains(':') {
            format!("{}://[{host}]:{}/", self.scheme, self.port)
        } else {
            format!("{}://{host}:{}/", self.scheme, self.port)
        }
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, ServeError> {
    let canonical = root.canonicalize().map_err(|e| {
        ServeError::InvalidArgument(format!(
            "root path '{}' is not accessible: {e}",
            root.display()
        ))
    })?;

    if !canonical.is_dir() {
        return Err(ServeError::InvalidArgument(format!(
            "root path '{}' is not a directory",
            root.display()
        )));
    }

    Ok(canonical)
}

fn resolve_socket_addr(host: &str, port: u16) -> Result<SocketAddr, ServeError> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    (host, port)
        .to_socket_addrs()
        .map_err(|e| ServeError::InvalidArgument(format!("invalid address '{host}': {e}")))?
        .next()
        .ok_or_else(|| ServeError::InvalidArgument(format!("address '{host}' did not resolve")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_args;

    fn cli(args: &[&str]) -> Cli {
        parse_args(std::iter::once("giles").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_root_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let server = ServerConfig::from_cli(&cli(&["--rootPath", root])).unwrap();

        assert!(server.root_directory.is_absolute());
        assert_eq!(server.root_directory, dir.path().canonicalize().unwrap());
        assert_eq!(server.port, 8080);
        assert_eq!(server.socket_addr.port(), 8080);
        assert!(server.socket_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_root_is_working_directory() {
        let server = ServerConfig::from_cli(&cli(&[])).unwrap();
        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
        assert_eq!(server.root_directory, cwd);
    }

    #[test]
    fn test_missing_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ServerConfig::from_cli(&cli(&["-r", missing.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, ServeError::InvalidArgument(_)));
    }

    #[test]
    fn test_file_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let err = ServerConfig::from_cli(&cli(&["-r", file.to_str().unwrap()])).unwrap_err();
        match err {
            ServeError::InvalidArgument(msg) => assert!(msg.contains("not a directory")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let server =
            ServerConfig::from_cli(&cli(&["-r", root, "-u", "127.0.0.1", "-p", "9000"])).unwrap();
        assert_eq!(server.public_url(), "http://127.0.0.1:9000/");

        let server = ServerConfig::from_cli(&cli(&["-r", root, "-u", "::1", "-s", "https"])).unwrap();
        assert_eq!(server.public_url(), "https://[::1]:8080/");
        assert!(server.socket_addr.is_ipv6());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert!(settings.logging.access_log);
        assert_eq!(settings.logging.access_log_format, "combined");
        assert!(settings.performance.keep_alive);
        assert_eq!(settings.performance.header_read_timeout, 30);
        assert_eq!(settings.performance.max_connections, None);
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("giles.toml");
        std::fs::write(
            &path,
            "[logging]\nlevel = \"debug\"\naccess_log = false\n\n[performance]\nworkers = 2\nmax_connections = 64\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert!(!settings.logging.access_log);
        assert_eq!(settings.performance.workers, Some(2));
        assert_eq!(settings.performance.max_connections, Some(64));
        assert_eq!(settings.performance.backlog, 1024);
    }

    #[test]
    fn test_missing_settings_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
