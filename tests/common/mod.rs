#![allow(dead_code)]
use assert_cmd::Command;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tempfile::TempDir;

pub const SERVER_HOST: &str = "127.0.0.1";
pub const SERVER_PORT: u16 = 4000;

/// Port nothing listens on, for tests that must run disconnected
pub const CLOSED_PORT: &str = "1";

/// Check if a TiDB server is listening
pub fn is_server_running() -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], SERVER_PORT));
    TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok()
}

/// `tip` command isolated from the user's home, `.env` and `DB_*` variables.
///
/// Keep the returned directory alive for the duration of the command.
pub fn create_cli_command() -> (Command, TempDir) {
    let home = TempDir::new().expect("create temp home");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tip"));
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("DB_HOST")
        .env_remove("DB_PORT")
        .env_remove("DB_USERNAME")
        .env_remove("DB_PASSWORD")
        .env_remove("DB_DATABASE")
        .timeout(Duration::from_secs(60));
    (cmd, home)
}

/// Command that will fail to connect at startup
pub fn disconnected_command() -> (Command, TempDir) {
    let (mut cmd, home) = create_cli_command();
    cmd.args(["--host", SERVER_HOST, "-P", CLOSED_PORT, "--no-color"]);
    (cmd, home)
}

/// Command connected to the local test server
pub fn connected_command() -> (Command, TempDir) {
    let (mut cmd, home) = create_cli_command();
    cmd.args(["--host", SERVER_HOST, "-P", "4000", "-u", "root", "-p", "", "--no-color"]);
    (cmd, home)
}
