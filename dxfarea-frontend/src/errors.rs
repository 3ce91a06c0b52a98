use std::path::PathBuf;

use dxfarea_engine::errors::CommandError;
use dxfarea_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Load(#[from] IoError),
    #[error("读取脚本 {path:?} 失败: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("脚本第 {line} 行执行失败: {source}")]
    Command {
        line: usize,
        #[source]
        source: CommandError,
    },
    #[error("序列化报告失败: {0}")]
    Serialize(#[from] serde_json::Error),
}
