//! 测试桩集合：内存事件通道与可编排的命名空间解析器。
//!
//! # 设计定位（Why）
//! - 集成测试、基准与下游追踪器的测试都需要一个“记录下写入了什么”的通道，以及一个可以精确计数、
//!   可以按剧本失败的解析器；集中维护，避免各处重复定义。
//!
//! # 使用方式（How）
//! - [`InMemoryChannel`]：把 `event_write` 写入的字节落到一块可增长的缓冲，空洞以 `0` 填充；
//! - [`FixedResolver`] / [`FailingResolver`]：恒定成功或恒定失败；
//! - [`CountingResolver`]：包装任意解析器，统计 `resolve` 被调用的次数。
//!
//! # 风险提示（Trade-offs）
//! - 这些类型随 crate 发布对外可见，仅用于测试与示例；生产代码应使用 [`ProcfsResolver`]
//!   与追踪器自身的环形缓冲。
//!
//! [`ProcfsResolver`]: crate::namespace::ProcfsResolver

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::namespace::{NamespaceInode, NamespaceKind, NamespaceResolver, ResolveError};
use crate::record::EventChannel;

/// 记录写入内容的内存通道。
#[derive(Debug, Default)]
pub struct InMemoryChannel {
    bytes: Mutex<Vec<u8>>,
    writes: AtomicUsize,
}

impl InMemoryChannel {
    /// 空通道。
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录内容的拷贝。
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// `event_write` 被调用的次数。
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// 清空已写入的字节与计数。
    pub fn clear(&self) {
        self.bytes.lock().clear();
        self.writes.store(0, Ordering::Relaxed);
    }
}

impl EventChannel for InMemoryChannel {
    fn event_write(&self, offset: usize, payload: &[u8]) {
        let mut bytes = self.bytes.lock();
        let end = offset + payload.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[offset..end].copy_from_slice(payload);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

/// 恒定返回同一标识的解析器。
#[derive(Clone, Copy, Debug)]
pub struct FixedResolver(pub NamespaceInode);

impl NamespaceResolver for FixedResolver {
    fn resolve(&self, _kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
        Ok(self.0)
    }
}

/// 恒定失败的解析器，模拟 procfs 不可用。
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingResolver;

impl NamespaceResolver for FailingResolver {
    fn resolve(&self, kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
        Err(ResolveError::Stat {
            path: PathBuf::from("/proc/thread-self/ns").join(kind.proc_entry()),
            source: nix::Error::ENOENT,
        })
    }
}

/// 统计调用次数的解析器包装。
///
/// 计数跨线程累计；按线程区分的断言请为每个线程单独构造实例。
#[derive(Debug, Default)]
pub struct CountingResolver<R> {
    inner: R,
    calls: AtomicUsize,
}

impl<R> CountingResolver<R> {
    /// 包装 `inner`，计数从 0 开始。
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// `resolve` 累计被调用的次数。
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

impl<R> NamespaceResolver for CountingResolver<R>
where
    R: NamespaceResolver,
{
    fn resolve(&self, kind: NamespaceKind) -> Result<NamespaceInode, ResolveError> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        self.inner.resolve(kind)
    }
}
