//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。CLI 参数在调用方覆盖这些值（CLI > env > 默认）。

use super::env_keys::{observability as obv_keys, packages, paths, python};
use super::loader::{env_bool, env_list, env_optional, env_or, expand_home};
use std::path::PathBuf;

/// 默认环境目录名（相对于根目录）
pub const DEFAULT_ENV_DIR: &str = "venv";

/// 默认依赖：PDF 库固定版本，图像库取最新
pub const DEFAULT_PACKAGES: &[&str] = &["PyMuPDF==1.24.14", "Pillow"];

/// 默认日志级别（未设置 `PROVISION_LOG_LEVEL` 且无 `RUST_LOG` 时）
pub const DEFAULT_LOG_LEVEL: &str = "redactor_provision=info,provision_env=info";

/// 环境供给配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// 显式根目录；None 表示从当前目录向上查找项目标记
    pub root: Option<PathBuf>,
    pub env_dir: String,
    /// 显式解释器；None 表示在 PATH 中查找 python3 / python
    pub python: Option<PathBuf>,
    /// 原始依赖字符串，由 `requirement::parse_requirements` 校验
    pub packages: Vec<String>,
    pub index_url: Option<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            root: None,
            env_dir: DEFAULT_ENV_DIR.to_string(),
            python: None,
            packages: DEFAULT_PACKAGES.iter().map(|s| s.to_string()).collect(),
            index_url: None,
        }
    }
}

impl ProvisionConfig {
    /// 从环境变量加载，空值使用默认（会自动加载 .env）
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let defaults = Self::default();
        Self {
            root: env_optional(paths::PROVISION_ROOT, paths::ROOT_ALIASES)
                .map(|s| expand_home(&s)),
            env_dir: env_or(paths::PROVISION_ENV_DIR, paths::ENV_DIR_ALIASES, || {
                defaults.env_dir.clone()
            }),
            python: env_optional(python::PROVISION_PYTHON, python::PYTHON_ALIASES)
                .map(|s| expand_home(&s)),
            packages: env_list(packages::PROVISION_PACKAGES, packages::PACKAGES_ALIASES)
                .unwrap_or(defaults.packages),
            index_url: env_optional(packages::PYPI_MIRROR_URL, &[])
                .map(|s| s.trim_end_matches('/').to_string()),
        }
    }
}

/// 可观测性配置：quiet、log_level、log_json、journal
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub journal: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::PROVISION_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(
                    obv_keys::PROVISION_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || DEFAULT_LOG_LEVEL.to_string(),
                ),
                log_json: env_bool(
                    obv_keys::PROVISION_LOG_JSON,
                    obv_keys::LOG_JSON_ALIASES,
                    false,
                ),
                journal: env_optional(obv_keys::PROVISION_JOURNAL, &[]),
            }
        })
    }
}
