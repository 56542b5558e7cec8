//! 统一配置层
//!
//! 所有环境变量读取集中在此模块，业务代码通过结构化配置访问，避免直接 `std::env::var`。
//!
//! - `loader`：env_or、env_optional、env_bool、env_list 等辅助函数
//! - `schema`：ProvisionConfig、ObservabilityConfig
//! - `env_keys`：key 常量（含 `REDACTOR_*` 旧名兼容）

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{
    env_bool, env_list, env_optional, env_or, expand_home, load_dotenv, load_dotenv_from_dir,
    parse_dotenv, split_list,
};
pub use schema::{
    ObservabilityConfig, ProvisionConfig, DEFAULT_ENV_DIR, DEFAULT_LOG_LEVEL, DEFAULT_PACKAGES,
};
