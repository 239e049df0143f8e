/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 负责推理网络（inference network）的构建与执行
 *
 * 模块划分：
 * - `shape`: 形状值类型（h, w, c）与池化算子参数
 * - `port`: 端口与挂钩（hook，消费者输入端口对生产者输出端口的非持有引用）
 * - `nodes`: 层节点（输入层、池化族）及其 build/run 双阶段接口
 * - `kernels`: 池化数值内核（max/avg/sum，有界与全局共用）
 * - `graph`: 节点竞技场（arena）+ 编译驱动 + 前向执行
 */

mod kernels;
mod port;
mod shape;

mod graph;
mod nodes;

pub use graph::{Graph, GraphError};
pub use nodes::NodeId;
pub use port::Hook;
pub use shape::{PaddingType, Shape};

/// 本crate统一的张量类型：(h, w, c) 三维 f32 数组
pub type Tensor = ndarray::Array3<f32>;

#[cfg(test)]
mod tests;
