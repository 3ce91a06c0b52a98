pub mod cli;
pub mod errors;
pub mod loader;
pub mod script;

use cli::{CliOptions, OutputFormat, Report};
use dxfarea_config::AppConfig;
use errors::FrontendError;
use tracing::info;

/// 载入文件、回放脚本并生成报告文本。
pub fn render_report(options: &CliOptions, config: &AppConfig) -> Result<String, FrontendError> {
    let loaded = loader::load_session(&options.path, config)?;
    let mut session = loaded.session;

    if let Some(script) = &options.script {
        let steps = script::run_script_file(&mut session, script)?;
        info!(path = %script.display(), steps = steps.len(), "脚本回放完成");
    }

    let report = Report::from_session(&loaded.source, &session);
    match options.format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Json => {
            let report = if options.draw_list {
                report.with_draw_list(&session)
            } else {
                report
            };
            Ok(report.to_json()?)
        }
    }
}

/// CLI 入口：把报告打印到标准输出。
pub fn run_cli(options: &CliOptions, config: &AppConfig) -> Result<(), FrontendError> {
    info!(path = %options.path.display(), "启动 CLI 前端");
    let output = render_report(options, config)?;
    println!("{}", output.trim_end());
    Ok(())
}
