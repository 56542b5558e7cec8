//! 环境变量 key 常量与别名定义
//!
//! 主变量统一使用 `PROVISION_*`，兼容早期脚本使用的 `REDACTOR_*`。

/// 工作根目录与环境目录
pub mod paths {
    pub const PROVISION_ROOT: &str = "PROVISION_ROOT";
    pub const ROOT_ALIASES: &[&str] = &["REDACTOR_ROOT"];

    /// 环境目录名（相对于根目录），默认 `venv`
    pub const PROVISION_ENV_DIR: &str = "PROVISION_ENV_DIR";
    pub const ENV_DIR_ALIASES: &[&str] = &["REDACTOR_VENV"];
}

/// 创建环境所用的解释器
pub mod python {
    pub const PROVISION_PYTHON: &str = "PROVISION_PYTHON";
    pub const PYTHON_ALIASES: &[&str] = &["REDACTOR_PYTHON"];
}

/// 依赖与包索引
pub mod packages {
    /// 逗号分隔，如 "PyMuPDF==1.24.14,Pillow"
    pub const PROVISION_PACKAGES: &str = "PROVISION_PACKAGES";
    pub const PACKAGES_ALIASES: &[&str] = &["REDACTOR_PACKAGES"];

    pub const PYPI_MIRROR_URL: &str = "PYPI_MIRROR_URL";
}

/// 可观测性与日志
pub mod observability {
    pub const PROVISION_QUIET: &str = "PROVISION_QUIET";
    pub const QUIET_ALIASES: &[&str] = &["REDACTOR_QUIET"];

    pub const PROVISION_LOG_LEVEL: &str = "PROVISION_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["REDACTOR_LOG_LEVEL"];

    pub const PROVISION_LOG_JSON: &str = "PROVISION_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &[];

    /// 步骤日志（JSONL）路径
    pub const PROVISION_JOURNAL: &str = "PROVISION_JOURNAL";
}
