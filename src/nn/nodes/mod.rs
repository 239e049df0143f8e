/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 层节点（Node）：变体分发 + 双阶段（build/run）接口
 *
 * 设计决策：
 * - 节点变体用 enum_dispatch 的封闭枚举分发，而非暴露可变函数指针槽位：
 *   原型（NNoM）在构造后覆写 run/build 函数指针来特化变体，
 *   这里以"变体标签 + 静态分发"表达同一语义
 * - 节点存在两个互斥状态："已声明"（参数未解析，可安全接线）与
 *   "已解析"（形状/参数/缓冲区大小固定，可安全run），以显式状态位承载
 */

mod input;
mod pooling;

pub(in crate::nn) use input::Input;
pub(in crate::nn) use pooling::{PoolKind, Pooling};

use super::graph::GraphError;
use super::port::{InputPort, OutputPort};
use super::shape::Shape;
use super::Tensor;
use enum_dispatch::enum_dispatch;
use std::fmt;

/// 节点句柄ID：竞技场（arena）内的唯一位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[enum_dispatch]
pub(in crate::nn) enum NodeType {
    Input(Input),
    Pooling(Pooling),
}

#[enum_dispatch(NodeType)]
pub(in crate::nn) trait TraitNode {
    /// 变体名（用于默认命名与日志）
    fn type_label(&self) -> &'static str;

    fn inputs(&self) -> &[InputPort];

    fn inputs_mut(&mut self) -> &mut [InputPort];

    fn outputs(&self) -> &[OutputPort];

    /// 本节点是否已完成一次性解析
    fn is_resolved(&self) -> bool;

    /// 一次性解析：由编译驱动在拓扑序中恰好调用一次。
    /// `input_shapes`按输入端口顺序给出经挂钩读取的生产者输出形状，
    /// 调用前已保证全部解析完毕（未解析的情形由 Graph 以 UnresolvedDependency 拦截）。
    fn build(&mut self, input_shapes: &[Shape]) -> Result<(), GraphError>;

    /// 计算缓冲区需求（元素个数，0 表示无需缓冲区）。
    /// 仅声明大小，实际供给由外部（Graph 编译尾声）完成。
    fn scratch_len(&self) -> usize {
        0
    }

    /// 按已声明的大小供给计算缓冲区（首次 run 之前由 Graph 调用）
    fn provision_scratch(&mut self) {}

    /// 重复执行阶段：用已定格的形状/参数/缓冲区计算本节点的值。
    /// 不得改动任何形状或参数（单次解析不变式）。
    fn run(&mut self, inputs: &[Tensor]) -> Result<(), GraphError>;

    fn value(&self) -> Option<&Tensor>;

    /// 仅输入类节点可手动设值，其余变体一律拒绝
    fn set_value(&mut self, _value: Option<&Tensor>) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(
            "该类型节点的值不应该被手动设置".to_string(),
        ))
    }
}

/// 节点句柄：arena 内的所有权包装（id + 名称 + 原始节点）
pub(in crate::nn) struct NodeHandle {
    id: NodeId,
    name: String,
    raw_node: NodeType,
    last_forward_pass_id: u64,
}

impl NodeHandle {
    pub fn new<T: Into<NodeType>>(id: NodeId, name: String, raw_node: T) -> Self {
        Self {
            id,
            name,
            raw_node: raw_node.into(),
            last_forward_pass_id: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub fn node_type_mut(&mut self) -> &mut NodeType {
        &mut self.raw_node
    }

    pub fn is_resolved(&self) -> bool {
        self.raw_node.is_resolved()
    }

    /// 读取某输出端口的已解析形状（None 表示尚未 build）
    pub fn output_shape(&self, port: usize) -> Option<Shape> {
        self.raw_node.outputs().get(port).and_then(|p| p.shape)
    }

    pub fn value(&self) -> Option<&Tensor> {
        self.raw_node.value()
    }

    pub fn has_value(&self) -> bool {
        self.raw_node.value().is_some()
    }

    pub fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.raw_node.set_value(value)
    }

    pub fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub fn set_last_forward_pass_id(&mut self, pass_id: u64) {
        self.last_forward_pass_id = pass_id;
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={})", self.name, self.id)
    }
}
