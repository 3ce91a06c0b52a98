use std::path::{Path, PathBuf};

use dxfarea_config::AppConfig;
use dxfarea_engine::selection::SelectionSettings;
use dxfarea_engine::session::Session;
use dxfarea_engine::viewport::{CanvasSize, ZoomLimits};
use dxfarea_io::{DocumentLoader, DxfFacade};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 载入后的会话及其来源文件。
#[derive(Debug)]
pub struct LoadedSession {
    pub session: Session,
    pub source: PathBuf,
}

/// 按配置创建空会话：画布尺寸、控制点容差、最小选区与缩放范围。
pub fn session_from_config(config: &AppConfig) -> Session {
    let canvas = CanvasSize::new(config.viewport.width, config.viewport.height);
    let selection = SelectionSettings {
        handle_tolerance: config.selection.handle_tolerance,
        min_size: config.selection.min_size,
    };
    let zoom = ZoomLimits {
        min_scale: config.zoom.min_scale,
        max_scale: config.zoom.max_scale,
    };
    Session::with_settings(canvas, selection, zoom)
}

/// 读取 DXF 文件并载入新会话，视口自动适配文档范围。
pub fn load_session(path: &Path, config: &AppConfig) -> Result<LoadedSession, FrontendError> {
    let document = DxfFacade::new().load(path).inspect_err(|err| {
        warn!(path = %path.display(), error = %err, "加载 DXF 失败");
    })?;
    info!(
        path = %path.display(),
        entities = document.entity_count(),
        blocks = document.block_count(),
        "从 DXF 加载文档成功"
    );

    let mut session = session_from_config(config);
    let changes = session.load_document(document);
    if !changes.viewport {
        warn!(path = %path.display(), "文档范围退化，视口保持默认");
    }
    Ok(LoadedSession {
        session,
        source: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn session_uses_configured_canvas_and_limits() {
        let mut config = AppConfig::default();
        config.viewport.width = 500.0;
        config.viewport.height = 400.0;
        config.zoom.max_scale = 3.0;
        config.selection.min_size = 5.0;

        let session = session_from_config(&config);
        assert_eq!(session.canvas(), CanvasSize::new(500.0, 400.0));
        assert_eq!(session.zoom_limits().max_scale, 3.0);
        assert_eq!(session.selection().settings().min_size, 5.0);
    }

    #[test]
    fn load_session_fits_document() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n0\n10\n0\n20\n0\n11\n100\n21\n50\n0\nENDSEC\n0\nEOF\n"
        )
        .expect("write dxf");

        let loaded = load_session(file.path(), &AppConfig::default()).expect("load");
        assert_eq!(loaded.source, file.path());
        let session = loaded.session;
        assert_eq!(session.document().map(|doc| doc.entity_count()), Some(1));
        // min(1024 * 0.8 / 100, 768 * 0.8 / 50, 2) = 2
        assert_eq!(session.viewport().scale(), 2.0);
    }

    #[test]
    fn load_session_propagates_io_errors() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let result = load_session(&dir.path().join("missing.dxf"), &AppConfig::default());
        assert!(matches!(result, Err(FrontendError::Load(_))));
    }
}
