//! 上下文注册错误域。
//!
//! # 教案式说明
//! - **意图（Why）**：注册是本组件唯一向调用方传播错误的路径；解析失败被缓存吸收为哨兵值，
//!   不在此列。
//! - **契约（What）**：两类错误都是局部、同步、非致命的，调用方可据此决定跳过该字段或整体放弃。

use thiserror::Error;

/// 向上下文集合注册字段时的失败。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ContextError {
    /// 集合中已存在同名字段；预留的槽位已释放，集合保持原状。
    #[error("context field `{name}` already exists")]
    AlreadyExists { name: String },

    /// 集合无法再增长：分配器拒绝或达到配置的容量上限。
    #[error("context set cannot grow to {requested} fields")]
    OutOfMemory { requested: usize },
}
