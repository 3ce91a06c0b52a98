use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use dxfarea_config::{AppConfig, ConfigError};
use dxfarea_frontend::cli::{CliOptions, OutputFormat};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 读取 DXF 图纸，回放交互脚本，输出视口与选区的世界坐标。
#[derive(Debug, Parser)]
#[command(name = "dxfarea", version)]
struct Args {
    /// 要载入的 DXF 文件
    file: PathBuf,
    /// 交互脚本（每行一条命令，如 `down 120 80`）
    #[arg(long)]
    script: Option<PathBuf>,
    /// 配置文件路径，缺省时按 DXFAREA_CONFIG 与 ./config/default.toml 查找
    #[arg(long)]
    config: Option<PathBuf>,
    /// 覆盖配置中的画布宽度（像素）
    #[arg(long)]
    width: Option<f64>,
    /// 覆盖配置中的画布高度（像素）
    #[arg(long)]
    height: Option<f64>,
    /// 以 JSON 输出报告
    #[arg(long)]
    json: bool,
    /// 在 JSON 报告中附带绘制列表
    #[arg(long, requires = "json")]
    draw_list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, fallback) = load_configuration(args.config.clone());
    init_logging(&config);
    if let Some(err) = fallback {
        report_fallback(&err);
    }
    info!("启动 dxfarea");

    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }
    if let Err(message) = config.validate() {
        bail!("命令行参数无效: {message}");
    }

    let options = CliOptions {
        path: args.file.clone(),
        script: args.script,
        format: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        draw_list: args.draw_list,
    };
    dxfarea_frontend::run_cli(&options, &config)
        .with_context(|| format!("处理 {} 失败", args.file.display()))
}

/// 加载配置。失败时回退到默认配置，并把错误交给调用方在日志初始化后报告。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn report_fallback(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. }
        | ConfigError::Parse { path, .. }
        | ConfigError::Invalid { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 报告写到标准输出，日志走标准错误
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
