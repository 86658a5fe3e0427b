use async_trait::async_trait;
use serde::Deserialize;
use tokio::{fs, io::AsyncWriteExt};

use crate::error::{AgentError, Result};
use crate::tool::{decode_arguments, Tool};

pub struct ReadFileTool;

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: ReadFileArgs = decode_arguments(self.name(), arguments)?;

        let failed = |message: String| AgentError::ToolInvocation {
            name: "read_file".into(),
            message: format!("{}: {message}", args.path),
        };

        let bytes = fs::read(&args.path)
            .await
            .map_err(|err| failed(err.to_string()))?;
        String::from_utf8(bytes).map_err(|_| failed("file is not valid UTF-8 text".into()))
    }
}

pub struct WriteFileTool;

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: WriteFileArgs = decode_arguments(self.name(), arguments)?;
        let failed = |err: std::io::Error| AgentError::ToolInvocation {
            name: "write_file".into(),
            message: format!("{}: {err}", args.path),
        };

        let mut options = fs::OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o644);

        let mut file = options.open(&args.path).await.map_err(failed)?;
        file.write_all(args.content.as_bytes())
            .await
            .map_err(failed)?;
        file.flush().await.map_err(failed)?;

        tracing::debug!(path = %args.path, bytes = args.content.len(), "file written");
        Ok("File written successfully".to_string())
    }
}
