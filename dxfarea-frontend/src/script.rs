//! 交互脚本回放：逐行把命令分发到会话，模拟宿主的指针、滚轮与按键事件。

use std::fs;
use std::path::Path;

use dxfarea_engine::command::{CommandBus, CommandContext, CommandRequest};
use dxfarea_engine::session::Session;
use tracing::debug;

use crate::errors::FrontendError;

/// 一条已执行的脚本命令。
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    /// 从 1 开始的行号。
    pub line: usize,
    pub command: String,
    pub message: String,
}

/// 执行脚本文本。遇到第一条失败的命令即停止，此前的修改保留在会话中。
pub fn run_script(session: &mut Session, script: &str) -> Result<Vec<ScriptStep>, FrontendError> {
    let bus = CommandBus::new();
    let mut context = CommandContext { session };
    let mut steps = Vec::new();

    for (index, raw) in script.lines().enumerate() {
        let Some(request) = CommandRequest::parse_line(raw) else {
            continue;
        };
        let line = index + 1;
        let response = bus
            .dispatch(&request, &mut context)
            .map_err(|source| FrontendError::Command { line, source })?;
        debug!(
            line,
            command = %request.name,
            changed = response.changes.any(),
            "{}",
            response.message
        );
        steps.push(ScriptStep {
            line,
            command: request.name,
            message: response.message,
        });
    }

    Ok(steps)
}

pub fn run_script_file(
    session: &mut Session,
    path: &Path,
) -> Result<Vec<ScriptStep>, FrontendError> {
    let script = fs::read_to_string(path).map_err(|source| FrontendError::ScriptRead {
        path: path.to_path_buf(),
        source,
    })?;
    run_script(session, &script)
}
