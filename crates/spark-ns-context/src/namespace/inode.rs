use core::fmt;
use core::mem::{align_of, size_of};

/// 平台原生的 inode 类型，命名空间句柄的 inode 号即以该类型序列化进事件记录。
pub type RawInode = nix::libc::ino_t;

/// `RawInode` 的原生字节宽度。
pub const INODE_SIZE: usize = size_of::<RawInode>();

/// `RawInode` 的原生对齐要求（字节）。
pub const INODE_ALIGN: usize = align_of::<RawInode>();

/// `RawInode` 是否为有符号类型；Linux 上恒为 `false`，但仍按平台约定计算而非硬编码。
pub const INODE_SIGNED: bool = RawInode::MIN != 0;

/// 命名空间标识：命名空间句柄的 inode 号。
///
/// # 教案式说明
/// - **意图（Why）**：该值会被原样写入定宽事件记录，读端依赖与 `ino_t` 完全一致的二进制布局，
///   因此“未初始化/不可用”两个哨兵值保留在同一数值域内，而不是另起一个枚举判别位。
/// - **契约（What）**：
///   - [`NamespaceInode::UNAVAILABLE`]（`0`）：查询过内核但失败，在下一次失效前不再重试；
///   - [`NamespaceInode::UNINITIALIZED`]（`RawInode::MAX`，即 `UNAVAILABLE - 1` 回绕）：
///     自上次失效以来本线程尚未计算过；
///   - 其余取值均为不透明令牌，只做相等比较，不参与排序或算术。
/// - **逻辑（How）**：需要分支处理时调用 [`NamespaceInode::state`] 得到带标签的
///   [`NamespaceState`] 视图。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceInode(RawInode);

impl NamespaceInode {
    /// 查询失败的哨兵值。
    pub const UNAVAILABLE: Self = Self(0);

    /// 尚未计算的哨兵值。
    pub const UNINITIALIZED: Self = Self(RawInode::MAX);

    /// 以内核返回的原始 inode 号构造标识。
    ///
    /// 若原始值恰好落在哨兵上，返回 `None`，调用方应将其视为不可用。
    pub const fn from_kernel(raw: RawInode) -> Option<Self> {
        if raw == Self::UNAVAILABLE.0 || raw == Self::UNINITIALIZED.0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// 从缓存单元中的原始值还原，不做哨兵过滤。
    pub const fn from_raw(raw: RawInode) -> Self {
        Self(raw)
    }

    /// 原始 inode 号。
    pub const fn raw(self) -> RawInode {
        self.0
    }

    /// 是否为有效令牌。
    pub const fn is_valid(self) -> bool {
        self.0 != Self::UNAVAILABLE.0 && self.0 != Self::UNINITIALIZED.0
    }

    /// 带标签的状态视图。
    pub const fn state(self) -> NamespaceState {
        if self.0 == Self::UNINITIALIZED.0 {
            NamespaceState::Uninitialized
        } else if self.0 == Self::UNAVAILABLE.0 {
            NamespaceState::Unavailable
        } else {
            NamespaceState::Valid(self)
        }
    }

    /// 原生字节序、原生宽度的序列化形式，即事件记录中的线格式。
    pub fn to_ne_bytes(self) -> [u8; INODE_SIZE] {
        self.0.to_ne_bytes()
    }

    /// 以有符号 64 位整数呈现，供过滤、内省等非序列化消费者使用。
    ///
    /// 与 C 语义一致：`u64` 超出 `i64::MAX` 的值按二进制补码回绕。
    pub const fn as_s64(self) -> i64 {
        self.0 as i64
    }

    // 64 位目标上 `ino_t` 就是 `u64`，转换为空操作；32 位目标上为 `u32`，单元值只来自 `to_cell`。
    #[allow(clippy::unnecessary_cast)]
    pub(crate) const fn to_cell(self) -> u64 {
        self.0 as u64
    }

    #[allow(clippy::unnecessary_cast)]
    pub(crate) const fn from_cell(cell: u64) -> Self {
        Self(cell as RawInode)
    }
}

impl fmt::Debug for NamespaceInode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            NamespaceState::Uninitialized => f.write_str("NamespaceInode(UNINITIALIZED)"),
            NamespaceState::Unavailable => f.write_str("NamespaceInode(UNAVAILABLE)"),
            NamespaceState::Valid(inode) => write!(f, "NamespaceInode({})", inode.0),
        }
    }
}

impl fmt::Display for NamespaceInode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单个线程缓存单元的三态视图。
///
/// 状态迁移只有四条：`Uninitialized → Valid`（解析成功）、`Uninitialized → Unavailable`
/// （解析失败）、`Valid → Uninitialized` 与 `Unavailable → Uninitialized`（显式失效）。
/// `Valid` 永远不会直接跳到另一个 `Valid`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespaceState {
    /// 自上次失效以来尚未解析。
    Uninitialized,
    /// 已尝试解析但失败。
    Unavailable,
    /// 已解析出的有效令牌。
    Valid(NamespaceInode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_adjacent_under_wrapping() {
        assert_eq!(
            NamespaceInode::UNAVAILABLE.raw().wrapping_sub(1),
            NamespaceInode::UNINITIALIZED.raw()
        );
    }

    #[test]
    fn kernel_values_on_sentinels_are_rejected() {
        assert_eq!(NamespaceInode::from_kernel(0), None);
        assert_eq!(NamespaceInode::from_kernel(RawInode::MAX), None);
        let inode = NamespaceInode::from_kernel(4026531838).expect("普通 inode 应被接受");
        assert_eq!(inode.state(), NamespaceState::Valid(inode));
        assert!(inode.is_valid());
    }

    #[test]
    fn state_view_matches_sentinels() {
        assert_eq!(
            NamespaceInode::UNINITIALIZED.state(),
            NamespaceState::Uninitialized
        );
        assert_eq!(NamespaceInode::UNAVAILABLE.state(), NamespaceState::Unavailable);
        assert!(!NamespaceInode::UNAVAILABLE.is_valid());
    }

    #[test]
    fn cell_encoding_preserves_every_state() {
        for inode in [
            NamespaceInode::UNINITIALIZED,
            NamespaceInode::UNAVAILABLE,
            NamespaceInode::from_raw(4026531838),
        ] {
            assert_eq!(NamespaceInode::from_cell(inode.to_cell()), inode);
        }
    }

    #[test]
    fn wire_bytes_use_native_width_and_order() {
        let inode = NamespaceInode::from_raw(0x0102_0304);
        let bytes = inode.to_ne_bytes();
        assert_eq!(bytes.len(), INODE_SIZE);
        assert_eq!(RawInode::from_ne_bytes(bytes), 0x0102_0304);
    }

    #[test]
    fn linux_inode_is_unsigned() {
        assert!(!INODE_SIGNED);
    }
}
