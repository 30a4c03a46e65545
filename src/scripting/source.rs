//! Script source loading for `.lua-eval-file`

use crate::error::{CLIError, Result};

/// Whether `target` names a remote script
pub fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Read a script from a local path or fetch it from an `http(s)` URL
pub async fn load_script(client: &reqwest::Client, target: &str) -> Result<String> {
    if is_remote(target) {
        let response = client.get(target).send().await?.error_for_status()?;
        return Ok(response.text().await?);
    }

    tokio::fs::read_to_string(target)
        .await
        .map_err(|e| CLIError::FileError(format!("Failed to read Lua script {}: {}", target, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_detection() {
        assert!(is_remote("https://example.com/a.lua"));
        assert!(is_remote("http://localhost/a.lua"));
        assert!(!is_remote("scripts/http.lua"));
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.lua");
        std::fs::write(&path, "return 1").unwrap();

        let client = reqwest::Client::new();
        let source = load_script(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(source, "return 1");

        let missing = dir.path().join("missing.lua");
        let err = load_script(&client, missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, CLIError::FileError(_)));
    }
}
