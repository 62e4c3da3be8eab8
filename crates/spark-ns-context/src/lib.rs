#![deny(unsafe_code)]
#![doc = "spark-ns-context: 为用户态追踪器提供线程级命名空间标识的上下文字段。"]
#![doc = ""]
#![doc = "== 组成 =="]
#![doc = "1. 命名空间标识缓存（[`namespace`]）：按线程缓存 procfs 命名空间句柄的 inode 号，热路径只做一次原子读取；命名空间变更由外部事件显式失效。"]
#![doc = "2. 上下文字段适配器（[`context`]）：把缓存接入追踪器的上下文字段注册表，提供尺寸查询、记录写入与标量取值三个钩子。"]
#![doc = ""]
#![doc = "== 线格式 =="]
#![doc = "标识以 `ino_t` 的原生宽度、原生对齐、原生字节序写入事件记录，十进制展示；`0` 表示“未知”。"]

//! # 快速上手
//!
//! ```no_run
//! use spark_ns_context::context::{ContextSet, register_uts_ns};
//! use spark_ns_context::namespace::{self, NamespaceKind};
//!
//! let mut set = ContextSet::new();
//! register_uts_ns(&mut set).expect("首次注册不会重名");
//!
//! // 运行时在 setns(2)/unshare(2) 之后通知：
//! namespace::invalidate(NamespaceKind::Uts);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod namespace;
pub mod record;
/// 测试桩命名空间，供集成测试、基准与下游追踪器的测试复用。
pub mod test_stubs;

pub use config::{ConfigError, NsContextConfig, ProcfsLayout};
pub use context::{
    ContextField, ContextFieldProvider, ContextSet, ContextValue, register_namespace_field,
    register_uts_ns,
};
pub use error::ContextError;
pub use namespace::{
    NamespaceCache, NamespaceInode, NamespaceKind, NamespaceResolver, NamespaceState,
    ProcfsResolver, UtsNamespaceCache, invalidate, touch_for_relocation,
};
pub use record::{EventChannel, RecordContext};

/// 按配置构造上下文集合与 procfs 解析器。
///
/// 容量上限取自 [`NsContextConfig::context_capacity`]，解析器使用配置中的 procfs 布局。
pub fn build_from_config(config: &NsContextConfig) -> (ContextSet, ProcfsResolver) {
    let set = match config.context_capacity {
        Some(limit) => ContextSet::with_capacity_limit(limit),
        None => ContextSet::new(),
    };
    (set, ProcfsResolver::new(config.procfs.clone()))
}
