/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : Graph 核心操作：节点分配、接线（挂钩）、编译（一次性解析）、前向执行
 *
 * 生命周期约定：
 * - 节点由变体构造器创建（"已声明"态），添加进图时完成接线（挂钩建立）
 * - compile() 以拓扑序对每个节点恰好调用一次 build，定格形状/参数/缓冲区大小，
 *   随后按声明大小供给各节点的计算缓冲区
 * - forward() 可反复调用，按"生产者先于消费者"的顺序执行各节点的 run
 * - 整图一体销毁：挂钩是 arena 内的下标引用，不决定任何析构顺序
 */

use super::error::GraphError;
use crate::nn::nodes::{Input, NodeHandle, NodeId, NodeType, PoolKind, Pooling, TraitNode};
use crate::nn::port::Hook;
use crate::nn::shape::{PaddingType, Shape};
use crate::nn::Tensor;
use log::{debug, trace};
use std::collections::HashMap;

pub struct Graph {
    name: String,
    nodes: HashMap<NodeId, NodeHandle>,
    forward_edges: HashMap<NodeId, Vec<NodeId>>,
    backward_edges: HashMap<NodeId, Vec<NodeId>>,
    next_id: u64,
    /// 节点容量上限（None 表示不设限）；超限的分配请求以 AllocationFailure 拒绝
    capacity: Option<usize>,
    compiled: bool,
    last_forward_pass_id: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            forward_edges: HashMap::new(),
            backward_edges: HashMap::new(),
            next_id: 0,
            capacity: None,
            compiled: false,
            last_forward_pass_id: 0,
        }
    }

    /// 创建一个节点容量受限的图（模拟资源受限硬件上的固定节点池）
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    // ========== 基础访问器 ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub(in crate::nn) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(&mut self, id: NodeId) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(id)?.name())
    }

    pub fn get_node_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        // 先检查节点是否存在
        let _ = self.get_node(id)?;
        Ok(self.backward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_children(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        // 先检查节点是否存在
        let _ = self.get_node(id)?;
        Ok(self.forward_edges.get(&id).cloned().unwrap_or_default())
    }

    /// 读取某节点输出端口0的已解析形状（None 表示该节点尚未 build）
    pub fn get_node_output_shape(&self, id: NodeId) -> Result<Option<Shape>, GraphError> {
        Ok(self.get_node(id)?.output_shape(0))
    }

    /// 读取某节点声明的计算缓冲区大小（元素个数；build 之前恒为0）
    pub fn get_node_scratch_len(&self, id: NodeId) -> Result<usize, GraphError> {
        Ok(self.get_node(id)?.node_type().scratch_len())
    }

    pub fn get_node_value(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(id)?.value())
    }

    pub fn set_node_value(&mut self, id: NodeId, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.get_node_mut(id)?.set_value(value)
    }

    // ========== ID/名称生成 ==========

    fn generate_valid_node_id(&mut self) -> NodeId {
        // 先递增再返回，所以第一个节点 ID 是 1
        self.next_id += 1;
        NodeId(self.next_id)
    }

    fn check_duplicate_node_name(&self, name: &str) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(name.to_string()));
        }
        Ok(())
    }

    fn generate_valid_new_node_name(
        &self,
        base_name: Option<&str>,
        type_label: &str,
    ) -> Result<String, GraphError> {
        if let Some(name) = base_name {
            self.check_duplicate_node_name(name)?;
            return Ok(name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{type_label}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 节点分配与接线 ==========

    /// 把一个"已声明"态的原始节点挂进图：容量检查 → 接线（挂钩建立）→ 入池。
    /// 任一步失败都不会留下半初始化的节点。
    fn add_node<T: Into<NodeType>>(
        &mut self,
        raw_node: T,
        name: Option<&str>,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        if self.compiled {
            return Err(GraphError::AlreadyCompiled(self.name.clone()));
        }
        if let Some(capacity) = self.capacity {
            if self.nodes.len() >= capacity {
                return Err(GraphError::AllocationFailure {
                    graph: self.name.clone(),
                    capacity,
                });
            }
        }
        // 生产者必须已在图中，否则无从挂钩
        for parent_id in parents {
            let _ = self.get_node(*parent_id)?;
        }

        let mut raw_node: NodeType = raw_node.into();
        let name = self.generate_valid_new_node_name(name, raw_node.type_label())?;

        if raw_node.inputs().len() != parents.len() {
            return Err(GraphError::InvalidOperation(format!(
                "节点{}需要{}个生产者，给定{}个",
                name,
                raw_node.inputs().len(),
                parents.len()
            )));
        }
        // 每个输入端口恰好接一个挂钩；生产者的输出端口可被多处挂钩（扇出）
        for (port, parent_id) in raw_node.inputs_mut().iter_mut().zip(parents.iter()) {
            port.hook = Some(Hook::new(*parent_id, 0));
        }

        let id = self.generate_valid_node_id();
        trace!("图{}：分配节点{}(id={})", self.name, name, id);
        self.nodes.insert(id, NodeHandle::new(id, name, raw_node));

        self.backward_edges.insert(id, parents.to_vec());
        for parent_id in parents {
            self.forward_edges.entry(*parent_id).or_default().push(id);
        }
        Ok(id)
    }

    /// 创建输入节点（整图的张量来源）
    pub fn new_input_node(&mut self, shape: Shape, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node(Input::new(shape), name, &[])
    }

    /// 创建有界最大池化节点
    pub fn new_max_pool_node(
        &mut self,
        input: NodeId,
        kernel_size: (usize, usize),
        stride: Option<(usize, usize)>,
        padding: PaddingType,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let raw = Pooling::bounded(PoolKind::Max, kernel_size, stride, padding)?;
        self.add_node(raw, name, &[input])
    }

    /// 创建有界平均池化节点
    pub fn new_avg_pool_node(
        &mut self,
        input: NodeId,
        kernel_size: (usize, usize),
        stride: Option<(usize, usize)>,
        padding: PaddingType,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let raw = Pooling::bounded(PoolKind::Avg, kernel_size, stride, padding)?;
        self.add_node(raw, name, &[input])
    }

    /// 创建有界求和池化节点
    pub fn new_sum_pool_node(
        &mut self,
        input: NodeId,
        kernel_size: (usize, usize),
        stride: Option<(usize, usize)>,
        padding: PaddingType,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let raw = Pooling::bounded(PoolKind::Sum, kernel_size, stride, padding)?;
        self.add_node(raw, name, &[input])
    }

    /// 创建全局最大池化节点：不接受形状参数，核在 build 阶段按输入回填
    pub fn new_global_max_pool_node(
        &mut self,
        input: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node(Pooling::global(PoolKind::Max), name, &[input])
    }

    /// 创建全局平均池化节点
    pub fn new_global_avg_pool_node(
        &mut self,
        input: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node(Pooling::global(PoolKind::Avg), name, &[input])
    }

    /// 创建全局求和池化节点
    pub fn new_global_sum_pool_node(
        &mut self,
        input: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node(Pooling::global(PoolKind::Sum), name, &[input])
    }

    // ========== 编译（一次性解析） ==========

    /// 对单个节点执行一次 build：经挂钩读穿生产者的输出形状，
    /// 推导本节点的输出形状、回填算子参数并定格缓冲区大小。
    ///
    /// 前置条件：所有生产者已解析完毕——否则返回 UnresolvedDependency，
    /// 且本节点的输出形状保持未解析（绝不默认兜底）。
    /// 对已解析节点的重复调用以 AlreadyResolved 拒绝。
    pub fn build_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.get_node(id)?;
        if node.is_resolved() {
            return Err(GraphError::AlreadyResolved(id));
        }

        let mut input_shapes = Vec::with_capacity(node.node_type().inputs().len());
        for port in node.node_type().inputs() {
            let hook = port.hook.ok_or_else(|| {
                GraphError::InvalidOperation(format!("节点{id}存在未接线的输入端口"))
            })?;
            let producer = self.get_node(hook.node)?;
            match producer.output_shape(hook.port) {
                Some(shape) => input_shapes.push(shape),
                None => {
                    return Err(GraphError::UnresolvedDependency {
                        consumer: id,
                        producer: hook.node,
                    });
                }
            }
        }

        let node = self.get_node_mut(id)?;
        node.node_type_mut().build(&input_shapes)?;
        trace!(
            "节点{}解析完毕：输出形状{:?}，缓冲区{}元素",
            id,
            node.output_shape(0),
            node.node_type().scratch_len()
        );
        Ok(())
    }

    fn build_node_recursive(&mut self, id: NodeId) -> Result<(), GraphError> {
        if self.get_node(id)?.is_resolved() {
            return Ok(());
        }
        for parent_id in self.get_node_parents(id)? {
            self.build_node_recursive(parent_id)?;
        }
        self.build_node(id)
    }

    /// 编译整图：以拓扑序对每个节点恰好调用一次 build，
    /// 全部解析成功后按声明大小供给各节点的计算缓冲区。
    ///
    /// 任一节点解析失败即中止整个编译过程（下游节点不会用未解析的输出继续解析）。
    /// 编译是一次性的：重复调用以 AlreadyCompiled 拒绝。
    pub fn compile(&mut self) -> Result<(), GraphError> {
        if self.compiled {
            return Err(GraphError::AlreadyCompiled(self.name.clone()));
        }

        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            self.build_node_recursive(id)?;
        }

        // 形状全部定格后，替外部分配器的角色供给缓冲区
        for node in self.nodes.values_mut() {
            node.node_type_mut().provision_scratch();
        }

        self.compiled = true;
        debug!("图{}编译完毕：{}个节点", self.name, self.nodes.len());
        Ok(())
    }

    // ========== 前向执行 ==========

    /// 执行到指定节点的一次前向推理
    ///
    /// 仅使用编译时定格的形状/参数/缓冲区；run 不会改动任何已解析状态，
    /// 故可反复调用而无需重新解析。
    pub fn forward(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.compiled {
            return Err(GraphError::NotCompiled(self.name.clone()));
        }
        let node = self.get_node(id)?;
        if let NodeType::Input(_) = node.node_type() {
            if node.has_value() {
                return Ok(());
            }
            return Err(GraphError::InvalidOperation(format!(
                "{node}是输入类型，其值应通过 set_value 设置，而非通过前向传播计算"
            )));
        }

        let new_pass_id = self.last_forward_pass_id + 1;
        self.forward_node_internal(id, new_pass_id)?;
        self.last_forward_pass_id = new_pass_id;
        Ok(())
    }

    fn forward_node_internal(&mut self, id: NodeId, pass_id: u64) -> Result<(), GraphError> {
        let node = self.get_node_mut(id)?;
        if let NodeType::Input(_) = node.node_type() {
            if node.has_value() {
                node.set_last_forward_pass_id(pass_id);
                return Ok(());
            }
            return Err(GraphError::InvalidOperation(format!(
                "{node}不能直接前向传播"
            )));
        }
        // 同一推理趟内已算过的节点不再重复计算
        if node.last_forward_pass_id() == pass_id {
            return Ok(());
        }

        let parent_ids = self.get_node_parents(id)?;
        for parent_id in &parent_ids {
            self.forward_node_internal(*parent_id, pass_id)?;
        }

        let mut parent_values = Vec::with_capacity(parent_ids.len());
        for parent_id in &parent_ids {
            let parent = self.get_node(*parent_id)?;
            let value = parent.value().ok_or_else(|| {
                GraphError::InvalidOperation(format!("生产者{parent}在run之后没有值"))
            })?;
            parent_values.push(value.clone());
        }

        let node = self.get_node_mut(id)?;
        node.node_type_mut().run(&parent_values)?;
        node.set_last_forward_pass_id(pass_id);
        Ok(())
    }
}
