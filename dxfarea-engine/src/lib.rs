pub mod command;
pub mod display;
pub mod selection;
pub mod session;
pub mod viewport;

pub mod errors {
    use thiserror::Error;

    /// 脚本命令执行失败的原因。交互本身（指针、滚轮）不会失败。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum CommandError {
        #[error("unknown command: {0}")]
        UnknownCommand(String),
        #[error("command `{command}` expects argument #{index}")]
        MissingArgument { command: String, index: usize },
        #[error("command `{command}` got non-numeric argument {value:?}")]
        InvalidNumber { command: String, value: String },
        #[error("unknown interaction mode {0:?} (expected `pan` or `select`)")]
        InvalidMode(String),
        #[error("unknown pointer button {0:?}")]
        InvalidButton(String),
    }
}
