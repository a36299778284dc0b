//! Docker command line for the QuantConnect MCP server

use crate::mcp::error::{McpError, Result};
use qcforge_domain::Credentials;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Default image of the QuantConnect MCP server
pub const DEFAULT_MCP_IMAGE: &str = "quantconnect/mcp-server";

/// How to launch the MCP server container.
///
/// Credentials are forwarded with `-e NAME` (no value) and set on the child's
/// environment, so they never show up in the process list.
#[derive(Clone)]
pub struct DockerLaunch {
    image: String,
    platform: Option<String>,
    user_id: String,
    api_token: String,
}

impl DockerLaunch {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            image: DEFAULT_MCP_IMAGE.to_string(),
            platform: None,
            user_id: credentials.user_id().to_string(),
            api_token: credentials.api_token().to_string(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Arguments passed to `docker`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-i".to_string(), "--rm".to_string()];
        if let Some(platform) = &self.platform {
            args.push("--platform".to_string());
            args.push(platform.clone());
        }
        for name in ["QUANTCONNECT_USER_ID", "QUANTCONNECT_API_TOKEN"] {
            args.push("-e".to_string());
            args.push(name.to_string());
        }
        args.push(self.image.clone());
        args
    }

    /// Locate the docker binary.
    pub fn docker_path() -> Result<PathBuf> {
        which::which("docker").map_err(|e| McpError::DockerNotFound(e.to_string()))
    }

    /// Build the child process command with piped stdio.
    pub fn command(&self, docker: &Path) -> Command {
        let mut cmd = Command::new(docker);
        cmd.args(self.args())
            .env("QUANTCONNECT_USER_ID", &self.user_id)
            .env("QUANTCONNECT_API_TOKEN", &self.api_token)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        cmd
    }
}

impl std::fmt::Debug for DockerLaunch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerLaunch")
            .field("image", &self.image)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}
