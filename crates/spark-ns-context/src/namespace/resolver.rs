use std::path::PathBuf;

use nix::sys::stat::stat;
use thiserror::Error;

use crate::config::ProcfsLayout;

use super::inode::{NamespaceInode, RawInode};
use super::kind::NamespaceKind;

/// 慢路径解析失败的原因。
///
/// 该错误不会穿透 [`NamespaceCache::get`](super::cache::NamespaceCache::get)：缓存把它吸收为
/// [`NamespaceInode::UNAVAILABLE`]，这里保留细节只为日志与直接调用解析器的测试。
#[derive(Debug, Error)]
pub enum ResolveError {
    /// 对命名空间句柄执行 `stat(2)` 失败。
    #[error("stat `{path}` failed: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    /// 回退路径超出长度上限，未尝试。
    #[error("procfs fallback path is {len} bytes, limit is {max}")]
    PathTooLong { len: usize, max: usize },

    /// 内核返回的 inode 号与保留哨兵冲突。
    #[error("kernel reported reserved inode {raw} for `{path}`")]
    ReservedInode { path: PathBuf, raw: RawInode },
}

/// 命名空间标识的内核查询接缝。
///
/// # 教案式说明
/// - **意图（Why）**：把“如何向内核询问”与“如何缓存”解耦，使缓存语义可以用计数桩精确验证
///   “每次未命中恰好解析一次”。
/// - **契约（What）**：实现必须是同步、有界的单次查询，不得内部重试；失败以 `Err` 返回，
///   由调用方决定吸收策略。
pub trait NamespaceResolver: Send + Sync {
    fn resolve(&self, kind: NamespaceKind) -> Result<NamespaceInode, ResolveError>;
}

impl<R> NamespaceResolver for &R
where
    R: NamespaceResolver + ?Sized,
{
    fn resolve(&self, kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
        (**self).resolve(kind)
    }
}

impl<R> NamespaceResolver for std::sync::Arc<R>
where
    R: NamespaceResolver + ?Sized,
{
    fn resolve(&self, kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
        (**self).resolve(kind)
    }
}

/// 当前线程的内核线程号来源，仅在回退路径中使用。
pub trait ThreadIdSource: Send + Sync {
    fn current_tid(&self) -> i32;
}

/// 通过 `gettid(2)` 读取内核线程号。
#[derive(Clone, Copy, Debug, Default)]
pub struct KernelThreadId;

impl ThreadIdSource for KernelThreadId {
    fn current_tid(&self) -> i32 {
        nix::unistd::gettid().as_raw()
    }
}

impl<F> ThreadIdSource for F
where
    F: Fn() -> i32 + Send + Sync,
{
    fn current_tid(&self) -> i32 {
        self()
    }
}

/// 基于 procfs 的生产解析器。
///
/// # 教案式说明
/// - **逻辑（How）**：
///   1. `stat` 线程专属路径 `<root>/thread-self/ns/<kind>`（内核 3.17 起提供）；
///   2. 只要第一步失败，无论原因，一律改为 `stat` 以线程号为键的
///      `<root>/self/task/<tid>/ns/<kind>`；
///   3. 两者都失败时返回回退路径的错误。
/// - **契约（What）**：单次调用至多两次 `stat(2)`，无循环、无阻塞等待。
/// - **风险（Trade-offs）**：回退条件刻意保持宽泛。只在“路径不存在”时回退看似更精确，
///   但内核版本差异之外的失败原因同样可能被回退路径绕过。
#[derive(Clone, Debug)]
pub struct ProcfsResolver<T = KernelThreadId> {
    layout: ProcfsLayout,
    thread_ids: T,
}

impl ProcfsResolver {
    /// 按给定布局解析，线程号取自 `gettid(2)`。
    pub fn new(layout: ProcfsLayout) -> Self {
        Self {
            layout,
            thread_ids: KernelThreadId,
        }
    }
}

impl Default for ProcfsResolver {
    fn default() -> Self {
        Self::new(ProcfsLayout::default())
    }
}

impl<T> ProcfsResolver<T>
where
    T: ThreadIdSource,
{
    /// 替换线程号来源。
    pub fn with_thread_ids<U: ThreadIdSource>(self, thread_ids: U) -> ProcfsResolver<U> {
        ProcfsResolver {
            layout: self.layout,
            thread_ids,
        }
    }

    /// 当前使用的 procfs 布局。
    pub fn layout(&self) -> &ProcfsLayout {
        &self.layout
    }

    /// 线程专属主路径。
    pub fn primary_path(&self, kind: NamespaceKind) -> PathBuf {
        self.layout
            .root()
            .join("thread-self/ns")
            .join(kind.proc_entry())
    }

    /// 以线程号为键的回退路径；超长时返回 [`ResolveError::PathTooLong`]。
    pub fn fallback_path(&self, kind: NamespaceKind, tid: i32) -> Result<PathBuf, ResolveError> {
        let path = self
            .layout
            .root()
            .join(format!("self/task/{tid}/ns"))
            .join(kind.proc_entry());
        let len = path.as_os_str().len();
        if len >= self.layout.path_max() {
            return Err(ResolveError::PathTooLong {
                len,
                max: self.layout.path_max(),
            });
        }
        Ok(path)
    }
}

impl<T> NamespaceResolver for ProcfsResolver<T>
where
    T: ThreadIdSource,
{
    fn resolve(&self, kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
        let primary = self.primary_path(kind);
        match stat_inode(primary) {
            Ok(inode) => Ok(inode),
            Err(primary_err) => {
                tracing::trace!(
                    namespace = %kind,
                    error = %primary_err,
                    "thread-self namespace entry unavailable, trying task path"
                );
                let fallback = self.fallback_path(kind, self.thread_ids.current_tid())?;
                stat_inode(fallback)
            }
        }
    }
}

fn stat_inode(path: PathBuf) -> Result<NamespaceInode, ResolveError> {
    match stat(path.as_path()) {
        Ok(meta) => {
            let raw: RawInode = meta.st_ino;
            NamespaceInode::from_kernel(raw).ok_or(ResolveError::ReservedInode { path, raw })
        }
        Err(source) => Err(ResolveError::Stat { path, source }),
    }
}
