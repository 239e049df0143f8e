/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : Graph 模块：节点竞技场 + 编译驱动 + 前向执行
 *
 * 公开 API：
 * - `Graph`: 节点竞技场（arena）与编译/执行入口
 * - `GraphError`: 错误类型
 */

mod core;
mod error;

pub use core::Graph;
pub use error::GraphError;
