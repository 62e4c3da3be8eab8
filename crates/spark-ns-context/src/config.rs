//! 上下文提供者的配置层。
//!
//! # 教案式说明
//! - **意图（Why）**：procfs 挂载点、回退路径长度上限与上下文集合容量在容器、沙箱与测试中
//!   各不相同，需要集中描述而不是散落为常量。
//! - **逻辑（How）**：默认值 → TOML 文档 → 环境变量，三层依次覆盖；环境变量的读取通过
//!   注入的查找闭包完成，测试无需改动进程环境。
//! - **契约（What）**：未出现的键保持默认值；非法取值返回 [`ConfigError`]，不会静默回退。
//!   `path_max` 一旦由某一层显式给出，后续层只替换挂载点时不会重新推导它。

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 默认 procfs 挂载点。
pub const DEFAULT_PROCFS_ROOT: &str = "/proc";

/// 回退路径 `/proc/self/task/<tid>/ns/<kind>` 允许的最大字节数（不含终止符）。
pub const PROC_NS_PATH_MAX: usize = 40;

/// 覆盖 procfs 挂载点的环境变量。
pub const ENV_PROCFS_ROOT: &str = "SPARK_NS_PROCFS_ROOT";
/// 覆盖回退路径长度上限的环境变量。
pub const ENV_PATH_MAX: &str = "SPARK_NS_PATH_MAX";
/// 覆盖上下文集合容量上限的环境变量。
pub const ENV_CONTEXT_CAPACITY: &str = "SPARK_NS_CONTEXT_CAPACITY";

/// 配置解析失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 文档无法解析或字段类型不符。
    #[error("invalid namespace context configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// 环境变量取值不是合法的非负整数。
    #[error("environment variable `{name}` must be a non-negative integer, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },

    /// 路径长度上限为 0，任何回退路径都无法构造。
    #[error("procfs path_max must be greater than zero")]
    ZeroPathMax,

    /// procfs 挂载点不是绝对路径，`stat` 会相对当前工作目录解析。
    #[error("procfs root `{}` must be an absolute path", root.display())]
    RelativeProcfsRoot { root: PathBuf },
}

/// procfs 路径约定。
///
/// 主路径为 `<root>/thread-self/ns/<kind>`；回退路径为 `<root>/self/task/<tid>/ns/<kind>`，
/// 其字节长度必须小于 `path_max`。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcfsLayout {
    pub root: PathBuf,
    pub path_max: usize,
}

impl ProcfsLayout {
    /// 以自定义挂载点构造，长度上限随根路径长度等量放宽。
    ///
    /// 这样 `/proc` 之外的挂载点（例如测试用临时目录）享有与默认布局相同的后缀余量。
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let extra = root
            .as_os_str()
            .len()
            .saturating_sub(DEFAULT_PROCFS_ROOT.len());
        Self {
            root,
            path_max: PROC_NS_PATH_MAX + extra,
        }
    }

    /// procfs 挂载点。
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 回退路径允许的字节数上限（不含）。
    pub fn path_max(&self) -> usize {
        self.path_max
    }
}

impl Default for ProcfsLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_PROCFS_ROOT),
            path_max: PROC_NS_PATH_MAX,
        }
    }
}

/// 上下文提供者的完整配置。
///
/// ```toml
/// context_capacity = 16
///
/// [procfs]
/// root = "/host/proc"
/// path_max = 45
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct NsContextConfig {
    pub procfs: ProcfsLayout,
    /// 上下文集合最多容纳的字段数；`None` 表示只受分配器约束。
    pub context_capacity: Option<usize>,
    /// `path_max` 是否由某一层显式给出。
    path_max_pinned: bool,
}

/// TOML 文档的原始形态：区分“未写”与“写了默认值”。
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    procfs: RawProcfs,
    context_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawProcfs {
    root: Option<PathBuf>,
    path_max: Option<usize>,
}

impl From<RawConfig> for NsContextConfig {
    fn from(raw: RawConfig) -> Self {
        let mut procfs = match raw.procfs.root {
            Some(root) => ProcfsLayout::with_root(root),
            None => ProcfsLayout::default(),
        };
        if let Some(path_max) = raw.procfs.path_max {
            procfs.path_max = path_max;
        }
        Self {
            procfs,
            context_capacity: raw.context_capacity,
            path_max_pinned: raw.procfs.path_max.is_some(),
        }
    }
}

impl NsContextConfig {
    /// 从 TOML 文本解析，缺省键取默认值。
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// 读取进程环境变量并覆盖当前配置。
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// 以注入的查找函数覆盖当前配置。
    ///
    /// 覆盖 procfs 根路径时，若此前没有任何一层给出长度上限，则上限按
    /// [`ProcfsLayout::with_root`] 的规则重新推导；否则保留已给出的上限。
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_PROCFS_ROOT) {
            if self.path_max_pinned {
                self.procfs.root = PathBuf::from(root);
            } else {
                self.procfs = ProcfsLayout::with_root(root);
            }
        }
        if let Some(value) = lookup(ENV_PATH_MAX) {
            self.procfs.path_max = parse_number(ENV_PATH_MAX, &value)?;
            self.path_max_pinned = true;
        }
        if let Some(value) = lookup(ENV_CONTEXT_CAPACITY) {
            self.context_capacity = Some(parse_number(ENV_CONTEXT_CAPACITY, &value)?);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.procfs.path_max == 0 {
            return Err(ConfigError::ZeroPathMax);
        }
        if !self.procfs.root.is_absolute() {
            return Err(ConfigError::RelativeProcfsRoot {
                root: self.procfs.root.clone(),
            });
        }
        Ok(())
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_owned(),
        })
}
