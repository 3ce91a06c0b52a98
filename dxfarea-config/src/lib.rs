use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "DXFAREA_CONFIG";

/// 画布单边的最大像素数。
pub const MAX_CANVAS_SIZE: f64 = 65_536.0;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `DXFAREA_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 检查取值范围。命令行覆盖配置项后也需再次调用。
    pub fn validate(&self) -> Result<(), String> {
        let ViewportConfig { width, height } = self.viewport;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(format!("画布尺寸必须为正数: {width}x{height}"));
        }
        if width > MAX_CANVAS_SIZE || height > MAX_CANVAS_SIZE {
            return Err(format!("画布尺寸超过上限 {MAX_CANVAS_SIZE}: {width}x{height}"));
        }
        let ZoomConfig {
            min_scale,
            max_scale,
        } = self.zoom;
        if !(min_scale.is_finite() && max_scale.is_finite() && min_scale > 0.0) {
            return Err(format!("缩放范围无效: [{min_scale}, {max_scale}]"));
        }
        if min_scale > max_scale {
            return Err(format!("最小缩放 {min_scale} 大于最大缩放 {max_scale}"));
        }
        let SelectionConfig {
            handle_tolerance,
            min_size,
        } = self.selection;
        if !(handle_tolerance >= 0.0 && min_size >= 0.0) {
            return Err(format!(
                "选区参数不能为负: tolerance={handle_tolerance}, min_size={min_size}"
            ));
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 画布像素尺寸，CLI 下没有真实窗口时使用。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "ViewportConfig::default_width")]
    pub width: f64,
    #[serde(default = "ViewportConfig::default_height")]
    pub height: f64,
}

impl ViewportConfig {
    fn default_width() -> f64 {
        1024.0
    }

    fn default_height() -> f64 {
        768.0
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "SelectionConfig::default_handle_tolerance")]
    pub handle_tolerance: f64,
    #[serde(default = "SelectionConfig::default_min_size")]
    pub min_size: f64,
}

impl SelectionConfig {
    fn default_handle_tolerance() -> f64 {
        6.0
    }

    fn default_min_size() -> f64 {
        20.0
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            handle_tolerance: Self::default_handle_tolerance(),
            min_size: Self::default_min_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ZoomConfig {
    #[serde(default = "ZoomConfig::default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "ZoomConfig::default_max_scale")]
    pub max_scale: f64,
}

impl ZoomConfig {
    fn default_min_scale() -> f64 {
        0.1
    }

    fn default_max_scale() -> f64 {
        10.0
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: Self::default_min_scale(),
            max_scale: Self::default_max_scale(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置文件 {path:?} 无效: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
