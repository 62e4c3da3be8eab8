use core::fmt;

use nix::sched::CloneFlags;

/// 可被缓存与追踪的命名空间种类。
///
/// # 教案式说明
/// - **意图（Why）**：各类命名空间的缓存、解析与字段适配完全同构，只在 procfs 条目名、
///   上下文字段名与 `CLONE_NEW*` 标志位上有差异；用枚举参数化即可复用同一套机制。
/// - **契约（What）**：[`NamespaceKind::index`] 在 `0..NamespaceKind::COUNT` 内唯一，
///   用于定位线程本地缓存单元。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Cgroup,
    Ipc,
    Mnt,
    Net,
    Pid,
    User,
    Uts,
}

impl NamespaceKind {
    /// 种类总数，即每线程缓存单元数。
    pub const COUNT: usize = 7;

    /// 全部种类，顺序与 [`NamespaceKind::index`] 一致。
    pub const ALL: [NamespaceKind; Self::COUNT] = [
        NamespaceKind::Cgroup,
        NamespaceKind::Ipc,
        NamespaceKind::Mnt,
        NamespaceKind::Net,
        NamespaceKind::Pid,
        NamespaceKind::User,
        NamespaceKind::Uts,
    ];

    /// 在线程单元数组中的下标，与 [`NamespaceKind::ALL`] 的顺序一致。
    pub const fn index(self) -> usize {
        match self {
            NamespaceKind::Cgroup => 0,
            NamespaceKind::Ipc => 1,
            NamespaceKind::Mnt => 2,
            NamespaceKind::Net => 3,
            NamespaceKind::Pid => 4,
            NamespaceKind::User => 5,
            NamespaceKind::Uts => 6,
        }
    }

    /// `/proc/<..>/ns/` 目录下的条目名。
    pub const fn proc_entry(self) -> &'static str {
        match self {
            NamespaceKind::Cgroup => "cgroup",
            NamespaceKind::Ipc => "ipc",
            NamespaceKind::Mnt => "mnt",
            NamespaceKind::Net => "net",
            NamespaceKind::Pid => "pid",
            NamespaceKind::User => "user",
            NamespaceKind::Uts => "uts",
        }
    }

    /// 注册到上下文集合时使用的字段名，也是重名检测的键。
    pub const fn field_name(self) -> &'static str {
        match self {
            NamespaceKind::Cgroup => "cgroup_ns",
            NamespaceKind::Ipc => "ipc_ns",
            NamespaceKind::Mnt => "mnt_ns",
            NamespaceKind::Net => "net_ns",
            NamespaceKind::Pid => "pid_ns",
            NamespaceKind::User => "user_ns",
            NamespaceKind::Uts => "uts_ns",
        }
    }

    /// `clone(2)`/`unshare(2)` 中令本种类切换到新命名空间的标志位。
    pub const fn clone_flag(self) -> CloneFlags {
        match self {
            NamespaceKind::Cgroup => CloneFlags::CLONE_NEWCGROUP,
            NamespaceKind::Ipc => CloneFlags::CLONE_NEWIPC,
            NamespaceKind::Mnt => CloneFlags::CLONE_NEWNS,
            NamespaceKind::Net => CloneFlags::CLONE_NEWNET,
            NamespaceKind::Pid => CloneFlags::CLONE_NEWPID,
            NamespaceKind::User => CloneFlags::CLONE_NEWUSER,
            NamespaceKind::Uts => CloneFlags::CLONE_NEWUTS,
        }
    }

    /// 标志位集合中涉及的全部种类。
    pub fn affected_by(flags: CloneFlags) -> impl Iterator<Item = NamespaceKind> {
        Self::ALL
            .into_iter()
            .filter(move |kind| flags.contains(kind.clone_flag()))
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proc_entry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_and_ordered() {
        for (position, kind) in NamespaceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn uts_names_match_procfs_and_field_conventions() {
        assert_eq!(NamespaceKind::Uts.proc_entry(), "uts");
        assert_eq!(NamespaceKind::Uts.field_name(), "uts_ns");
        assert_eq!(NamespaceKind::Mnt.proc_entry(), "mnt");
    }

    #[test]
    fn clone_flags_select_only_matching_kinds() {
        let flags = CloneFlags::CLONE_NEWUTS | CloneFlags::CLONE_NEWNET | CloneFlags::CLONE_VM;
        let kinds: Vec<_> = NamespaceKind::affected_by(flags).collect();
        assert_eq!(kinds, vec![NamespaceKind::Net, NamespaceKind::Uts]);
        assert_eq!(NamespaceKind::affected_by(CloneFlags::empty()).count(), 0);
    }
}
