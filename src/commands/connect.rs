//! `.connect <host> <port> <user> <password> [database]`

use std::io::Write;

use colored::Colorize;
use tracing::debug;

use super::CommandSpec;
use crate::completer::prefetch_metadata;
use crate::connection::ConnectionInfo;
use crate::error::{CLIError, Result};
use crate::session::SessionContext;

/// Build connection parameters from positional arguments
fn parse_info(spec: &CommandSpec, args: &[String]) -> Result<ConnectionInfo> {
    let [host, port, user, password, rest @ ..] = args else {
        return Err(CLIError::usage(spec.usage));
    };
    let port = port
        .parse::<u16>()
        .map_err(|_| CLIError::CommandArgumentError(format!("invalid port: {}", port)))?;

    Ok(ConnectionInfo {
        host: host.clone(),
        port,
        user: user.clone(),
        password: password.clone(),
        database: rest.first().cloned().unwrap_or_default(),
    })
}

pub(super) async fn run(
    ctx: &mut SessionContext,
    spec: &CommandSpec,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let info = parse_info(spec, args)?;
    debug!("Reconnecting to {:?}", info);

    let selected = ctx
        .manager
        .connect(info)
        .await
        .map_err(|e| match e {
            CLIError::ConnectError(msg) => {
                CLIError::ConnectError(format!("failed to connect to TiDB: {}", msg))
            }
            other => other,
        })?;

    if let Some(database) = ctx.manager.current() {
        prefetch_metadata(&database, &ctx.metadata, selected.as_deref()).await;
    }

    let message = "Connected successfully.";
    if ctx.color {
        writeln!(out, "{}", message.green())?;
    } else {
        writeln!(out, "{}", message)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::find;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_info_with_and_without_database() {
        let spec = find(".connect").unwrap();

        let info = parse_info(spec, &args(&["db.local", "4000", "root", ""])).unwrap();
        assert_eq!(info.host, "db.local");
        assert_eq!(info.port, 4000);
        assert_eq!(info.password, "");
        assert_eq!(info.database, "");

        let info = parse_info(spec, &args(&["h", "4001", "u", "p", "shop"])).unwrap();
        assert_eq!(info.database, "shop");
    }

    #[test]
    fn test_parse_info_rejects_bad_port() {
        let spec = find(".connect").unwrap();
        let err = parse_info(spec, &args(&["h", "four", "u", "p"])).unwrap_err();
        assert_eq!(err.to_string(), "invalid port: four");
    }
}
