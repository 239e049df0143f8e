/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 端口（Port）与挂钩（Hook）
 *
 * 设计决策：
 * - Hook 是消费者输入端口对生产者输出端口的非持有反向引用，
 *   实现为竞技场（arena）内的 NodeId + 端口下标，而非所有权引用，
 *   图的所有权始终单根（arena），消费者到生产者的链接不会产生悬垂或环状所有权
 * - 端口形状以 `Option<Shape>` 表达"未解析"状态：组网时为 None，
 *   build 成功后恰好写入一次，此后直到整图重建都不再改变
 */

use super::nodes::NodeId;
use super::shape::Shape;

/// 挂钩：指向某生产者节点的某个输出端口
///
/// 每个输入端口组网后恰有一个挂钩；一个输出端口可被任意多个下游挂钩引用（扇出）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hook {
    /// 生产者节点（arena 内的句柄）
    pub node: NodeId,
    /// 生产者的输出端口下标
    pub port: usize,
}

impl Hook {
    pub const fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

/// 输入端口：归属于唯一一个层节点
#[derive(Clone, Debug, Default)]
pub(in crate::nn) struct InputPort {
    /// 解析后的输入形状（None 表示尚未推导）
    pub shape: Option<Shape>,
    /// 组网时建立的挂钩（None 表示尚未接线）
    pub hook: Option<Hook>,
}

impl InputPort {
    /// 创建一个未接线的输入端口
    pub fn unhooked() -> Self {
        Self::default()
    }
}

/// 输出端口：归属于唯一一个层节点
#[derive(Clone, Debug, Default)]
pub(in crate::nn) struct OutputPort {
    /// 解析后的输出形状（None 表示所属节点的 build 尚未成功执行）
    pub shape: Option<Shape>,
}

impl OutputPort {
    pub fn unresolved() -> Self {
        Self::default()
    }
}
