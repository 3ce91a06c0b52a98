//! 文本命令总线：把脚本中的一行命令分发给会话上的交互操作。
//!
//! 每行形如 `down 120 80`，空行与 `#` 开头的注释行被忽略。

use std::collections::HashMap;

use dxfarea_core::geometry::Point2;

use crate::errors::CommandError;
use crate::session::{Changes, InteractionMode, PointerButton, Session};
use crate::viewport::CanvasSize;

#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// 按空白切分一行命令；空行和注释返回 `None`。
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_ascii_lowercase();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }

    fn arg(&self, index: usize) -> Result<&str, CommandError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingArgument {
                command: self.name.clone(),
                index,
            })
    }

    fn number(&self, index: usize) -> Result<f64, CommandError> {
        let value = self.arg(index)?;
        value.parse().map_err(|_| CommandError::InvalidNumber {
            command: self.name.clone(),
            value: value.to_string(),
        })
    }

    fn point(&self, first: usize) -> Result<Point2, CommandError> {
        Ok(Point2::new(self.number(first)?, self.number(first + 1)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub message: String,
    pub changes: Changes,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>, changes: Changes) -> Self {
        Self {
            message: message.into(),
            changes,
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError>;
}

pub struct CommandContext<'a> {
    pub session: &'a mut Session,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ModeCommand);
        bus.register(PointerDownCommand);
        bus.register(PointerMoveCommand);
        bus.register(PointerUpCommand);
        bus.register(PointerLeaveCommand);
        bus.register(WheelCommand);
        bus.register(DeleteAreaCommand);
        bus.register(ClearAreasCommand);
        bus.register(ResizeCanvasCommand);
        bus.register(FitViewCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        match self.handlers.get(request.name.as_str()) {
            Some(handler) => handler.execute(request, context),
            None => Err(CommandError::UnknownCommand(request.name.clone())),
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_mode(value: &str) -> Result<InteractionMode, CommandError> {
    match value.to_ascii_lowercase().as_str() {
        "pan" => Ok(InteractionMode::Pan),
        "select" => Ok(InteractionMode::Select),
        _ => Err(CommandError::InvalidMode(value.to_string())),
    }
}

fn parse_button(value: &str) -> Result<PointerButton, CommandError> {
    match value.to_ascii_lowercase().as_str() {
        "primary" | "left" => Ok(PointerButton::Primary),
        "secondary" | "right" => Ok(PointerButton::Secondary),
        "middle" => Ok(PointerButton::Middle),
        _ => Err(CommandError::InvalidButton(value.to_string())),
    }
}

struct ModeCommand;

impl CommandHandler for ModeCommand {
    fn name(&self) -> &'static str {
        "mode"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let mode = parse_mode(request.arg(0)?)?;
        let changes = context.session.set_mode(mode);
        Ok(CommandResponse::ok(
            format!("交互模式: {}", mode.as_str()),
            changes,
        ))
    }
}

struct PointerDownCommand;

impl CommandHandler for PointerDownCommand {
    fn name(&self) -> &'static str {
        "down"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let point = request.point(0)?;
        let button = match request.args.get(2) {
            Some(value) => parse_button(value)?,
            None => PointerButton::Primary,
        };
        let changes = context.session.pointer_down(point, button);
        Ok(CommandResponse::ok(
            format!("指针按下 ({}, {})", point.x(), point.y()),
            changes,
        ))
    }
}

struct PointerMoveCommand;

impl CommandHandler for PointerMoveCommand {
    fn name(&self) -> &'static str {
        "move"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let point = request.point(0)?;
        let changes = context.session.pointer_move(point);
        Ok(CommandResponse::ok(
            format!("指针移动 ({}, {})", point.x(), point.y()),
            changes,
        ))
    }
}

struct PointerUpCommand;

impl CommandHandler for PointerUpCommand {
    fn name(&self) -> &'static str {
        "up"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let changes = context.session.pointer_up();
        Ok(CommandResponse::ok("指针抬起", changes))
    }
}

struct PointerLeaveCommand;

impl CommandHandler for PointerLeaveCommand {
    fn name(&self) -> &'static str {
        "leave"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let changes = context.session.pointer_leave();
        Ok(CommandResponse::ok("指针离开画布", changes))
    }
}

struct WheelCommand;

impl CommandHandler for WheelCommand {
    fn name(&self) -> &'static str {
        "wheel"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let point = request.point(0)?;
        let delta_y = request.number(2)?;
        let changes = context.session.wheel(point, delta_y);
        let message = if changes.viewport {
            format!("缩放至 {:.4}", context.session.viewport().scale())
        } else {
            "缩放未生效".to_string()
        };
        Ok(CommandResponse::ok(message, changes))
    }
}

struct DeleteAreaCommand;

impl CommandHandler for DeleteAreaCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let changes = context.session.delete_active_area();
        let message = if changes.areas {
            "已删除活动选区"
        } else {
            "没有活动选区"
        };
        Ok(CommandResponse::ok(message, changes))
    }
}

struct ClearAreasCommand;

impl CommandHandler for ClearAreasCommand {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let changes = context.session.clear_areas();
        Ok(CommandResponse::ok("选区已清空", changes))
    }
}

struct ResizeCanvasCommand;

impl CommandHandler for ResizeCanvasCommand {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let canvas = CanvasSize::new(request.number(0)?, request.number(1)?);
        let changes = context.session.resize_canvas(canvas);
        Ok(CommandResponse::ok(
            format!("画布尺寸 {}x{}", canvas.width, canvas.height),
            changes,
        ))
    }
}

struct FitViewCommand;

impl CommandHandler for FitViewCommand {
    fn name(&self) -> &'static str {
        "fit"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> Result<CommandResponse, CommandError> {
        let changes = context.session.fit_to_view();
        let message = if changes.viewport {
            "视口已适配文档范围"
        } else {
            "文档范围无效，视口保持不变"
        };
        Ok(CommandResponse::ok(message, changes))
    }
}
