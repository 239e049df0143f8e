/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : Graph 模块的错误类型
 */

use crate::nn::nodes::NodeId;
use thiserror::Error;

/// Graph 操作错误类型
///
/// 失败必须以独立的错误值浮出，绝不以被污染的形状（如 (0,0,0)）暗示失败。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// 节点分配失败：图的节点容量已耗尽，未添加任何节点
    #[error("图{graph}的节点容量({capacity})已耗尽，无法再分配节点")]
    AllocationFailure { graph: String, capacity: usize },

    /// 拓扑前置条件被破坏：build 时上游生产者的输出形状尚未解析
    #[error("节点{consumer}的生产者{producer}的输出形状尚未解析，无法build")]
    UnresolvedDependency { consumer: NodeId, producer: NodeId },

    /// 单次解析不变式：已解析的节点不允许再次 build
    #[error("节点{0}已解析，重复build属于调用方的编程错误")]
    AlreadyResolved(NodeId),

    /// 图已编译，不允许再次编译或继续添加节点
    #[error("图{0}已编译")]
    AlreadyCompiled(String),

    /// 图尚未编译，无法执行 run
    #[error("图{0}尚未编译，无法执行推理")]
    NotCompiled(String),

    #[error("节点{0}不存在")]
    NodeNotFound(NodeId),

    #[error("节点名{0}在图中重复")]
    DuplicateNodeName(String),

    #[error("形状不匹配：期望{expected}，实际{got}（{message}）")]
    ShapeMismatch {
        expected: String,
        got: String,
        message: String,
    },

    #[error("非法操作：{0}")]
    InvalidOperation(String),
}
