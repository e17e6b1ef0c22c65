// src/project/builder.rs

//! The seam between the host and the external bundler.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

use super::html::{css_file_name, js_file_name};
use crate::models::{BuildOutcome, Env, ProjectConfig};
use crate::system::executor::{self, ExecutionError};

/// What one bundler run needs to know.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub project_root: PathBuf,
    pub env: Env,
    pub config: ProjectConfig,
    /// The command line to run (`bundler.dev`, `bundler.build`, ...).
    pub command_line: String,
    /// Generated entry file.
    pub entry_path: PathBuf,
    /// Content hash embedded in emitted asset names.
    pub hash: String,
    /// Dev server port, when one was requested.
    pub port: Option<u16>,
}

impl BuildRequest {
    /// Environment variables describing the request to the bundler.
    pub fn env_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::from([
            ("PRI_ENV".to_string(), self.env.to_string()),
            (
                "PRI_PROJECT_ROOT".to_string(),
                self.project_root.display().to_string(),
            ),
            (
                "PRI_ENTRY_PATH".to_string(),
                self.entry_path.display().to_string(),
            ),
            ("PRI_DIST_DIR".to_string(), self.config.dist_dir.clone()),
            ("PRI_BASE_HREF".to_string(), self.config.base_href.clone()),
            ("PRI_USE_HTTPS".to_string(), self.config.use_https.to_string()),
            ("PRI_OUT_FILE_NAME".to_string(), js_file_name(&self.hash)),
            ("PRI_OUT_CSS_FILE_NAME".to_string(), css_file_name(&self.hash)),
        ]);
        if let Some(public_path) = &self.config.public_path {
            vars.insert("PRI_PUBLIC_PATH".to_string(), public_path.clone());
        }
        if let Some(port) = self.port {
            vars.insert("PRI_PORT".to_string(), port.to_string());
        }
        vars
    }
}

#[async_trait]
pub trait Bundler: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, ExecutionError>;
}

/// Runs the configured command line as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessBundler;

#[async_trait]
impl Bundler for ProcessBundler {
    async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, ExecutionError> {
        let result = executor::execute_command(
            &request.command_line,
            &request.project_root,
            &request.env_vars(),
        )
        .await;

        let success = match result {
            Ok(()) => true,
            Err(ExecutionError::NonZeroExitStatus { command, code }) => {
                log::warn!("Bundler '{}' exited with {:?}", command, code);
                false
            }
            Err(e) => return Err(e),
        };

        Ok(BuildOutcome {
            hash: request.hash.clone(),
            success,
            dist_dir: request.project_root.join(&request.config.dist_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command_line: &str) -> BuildRequest {
        BuildRequest {
            project_root: std::env::temp_dir(),
            env: Env::Prod,
            config: ProjectConfig {
                public_path: Some("/static".to_string()),
                ..ProjectConfig::default()
            },
            command_line: command_line.to_string(),
            entry_path: std::env::temp_dir().join(".temp/entry.tsx"),
            hash: "0123abcd".to_string(),
            port: None,
        }
    }

    #[test]
    fn test_env_vars_describe_the_request() {
        let vars = request("true").env_vars();
        assert_eq!(vars["PRI_ENV"], "prod");
        assert_eq!(vars["PRI_OUT_FILE_NAME"], "main.0123abcd.js");
        assert_eq!(vars["PRI_OUT_CSS_FILE_NAME"], "main.0123abcd.css");
        assert_eq!(vars["PRI_PUBLIC_PATH"], "/static");
        assert!(!vars.contains_key("PRI_PORT"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_build_is_reported_not_raised() {
        let outcome = ProcessBundler.build(&request("false")).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.hash, "0123abcd");

        let outcome = ProcessBundler.build(&request("true")).await.unwrap();
        assert!(outcome.success);
    }
}
