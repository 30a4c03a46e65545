use clap::Parser;
use std::path::PathBuf;
use tip::config::ConnectionOverrides;
use tip::formatter::OutputFormat;

// Version string assembled at compile time from build.rs output
macro_rules! version_string {
    () => {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nCommit: ",
            env!("GIT_COMMIT_HASH"),
            " (",
            env!("GIT_BRANCH"),
            ")\nBuilt: ",
            env!("BUILD_DATE")
        )
    };
}

/// tip - Terminal client for TiDB
#[derive(Parser, Debug)]
#[command(name = "tip")]
#[command(version = version_string!())]
#[command(about = "Interactive and scriptable terminal client for TiDB", long_about = None)]
pub struct Cli {
    /// TiDB host name
    #[arg(long = "host")]
    pub host: Option<String>,

    /// TiDB port
    #[arg(short = 'P', long = "port")]
    pub port: Option<u16>,

    /// TiDB user name
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// TiDB password (empty when the flag is given without a value)
    #[arg(short = 'p', long = "password", num_args = 0..=1, default_missing_value = "")]
    pub password: Option<String>,

    /// Database to use
    #[arg(short = 'd', long = "database")]
    pub database: Option<String>,

    /// Configuration file path (default: ~/.tip/config.toml when present)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output-format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Execute a SQL statement and exit
    #[arg(short = 'e', long = "execute")]
    pub execute: Option<String>,

    /// Write results of -e to this file instead of stdout
    #[arg(short = 'O', long = "output-file", requires = "execute")]
    pub output_file: Option<PathBuf>,

    /// Show execution details and debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    /// Connection values given on the command line
    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_flag_set() {
        let cli = Cli::try_parse_from([
            "tip", "--host", "db", "-P", "4001", "-u", "admin", "-p", "pw", "-d", "shop", "-o",
            "csv", "-e", "SELECT 1;", "-O", "out.csv", "-v", "--no-color",
        ])
        .unwrap();

        assert_eq!(cli.host.as_deref(), Some("db"));
        assert_eq!(cli.port, Some(4001));
        assert_eq!(cli.output_format, Some(OutputFormat::Csv));
        assert_eq!(cli.output_file, Some(PathBuf::from("out.csv")));
        assert!(cli.verbose && cli.no_color);

        let overrides = cli.overrides();
        assert_eq!(overrides.user.as_deref(), Some("admin"));
        assert_eq!(overrides.database.as_deref(), Some("shop"));
    }

    #[test]
    fn test_password_flag_without_value() {
        let cli = Cli::try_parse_from(["tip", "-p"]).unwrap();
        assert_eq!(cli.password.as_deref(), Some(""));
    }

    #[test]
    fn test_rejects_unknown_format_and_orphan_output_file() {
        assert!(Cli::try_parse_from(["tip", "-o", "yaml"]).is_err());
        assert!(Cli::try_parse_from(["tip", "-O", "out.txt"]).is_err());
    }
}
