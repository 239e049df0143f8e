/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : Graph 基础测试：节点分配、命名、容量、编译生命周期
 */

use crate::nn::{Graph, GraphError, Shape};

#[test]
fn test_graph_creation() {
    let graph = Graph::new();
    assert_eq!(graph.name(), "default_graph");
    assert_eq!(graph.nodes_count(), 0);
    assert!(!graph.is_compiled());

    let named = Graph::with_name("my_model");
    assert_eq!(named.name(), "my_model");
}

#[test]
fn test_node_default_naming() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let pool1 = graph.new_global_max_pool_node(input, None)?;
    let pool2 = graph.new_global_max_pool_node(input, None)?;

    assert_eq!(graph.get_node_name(input)?, "input_1");
    assert_eq!(graph.get_node_name(pool1)?, "global_max_pool_1");
    assert_eq!(graph.get_node_name(pool2)?, "global_max_pool_2");
    Ok(())
}

#[test]
fn test_duplicate_node_name_rejected() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    graph.new_input_node(Shape::new(4, 4, 1), Some("x"))?;
    let result = graph.new_input_node(Shape::new(4, 4, 1), Some("x"));
    assert_eq!(
        result,
        Err(GraphError::DuplicateNodeName("x".to_string()))
    );
    Ok(())
}

#[test]
fn test_parents_and_children_edges() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(8, 8, 4), None)?;
    let pool = graph.new_global_avg_pool_node(input, None)?;

    assert_eq!(graph.get_node_parents(pool)?, vec![input]);
    assert_eq!(graph.get_node_children(input)?, vec![pool]);
    assert!(graph.get_node_parents(input)?.is_empty());
    Ok(())
}

#[test]
fn test_hook_requires_existing_producer() {
    let mut graph = Graph::new();
    let mut other = Graph::new();
    let foreign = other.new_input_node(Shape::new(2, 2, 1), None).unwrap();

    // 本图中并不存在该id对应的生产者
    let result = graph.new_global_max_pool_node(foreign, None);
    assert_eq!(result, Err(GraphError::NodeNotFound(foreign)));
    assert_eq!(graph.nodes_count(), 0);
}

/// 容量耗尽时分配节点须返回独立的失败值，且不得把节点挂进图
#[test]
fn test_allocation_failure_when_capacity_exhausted() -> Result<(), GraphError> {
    let mut graph = Graph::with_capacity(1);
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    assert_eq!(graph.nodes_count(), 1);

    let result = graph.new_global_avg_pool_node(input, None);
    assert_eq!(
        result,
        Err(GraphError::AllocationFailure {
            graph: "default_graph".to_string(),
            capacity: 1,
        })
    );
    // 失败的分配不会留下半初始化节点
    assert_eq!(graph.nodes_count(), 1);
    assert!(graph.get_node_children(input)?.is_empty());
    Ok(())
}

#[test]
fn test_compile_twice_rejected() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let _pool = graph.new_global_max_pool_node(input, None)?;

    graph.compile()?;
    assert!(graph.is_compiled());
    assert_eq!(
        graph.compile(),
        Err(GraphError::AlreadyCompiled("default_graph".to_string()))
    );
    Ok(())
}

#[test]
fn test_add_node_after_compile_rejected() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    graph.compile()?;

    let result = graph.new_global_sum_pool_node(input, None);
    assert_eq!(
        result,
        Err(GraphError::AlreadyCompiled("default_graph".to_string()))
    );
    Ok(())
}

#[test]
fn test_forward_before_compile_rejected() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let pool = graph.new_global_max_pool_node(input, None)?;

    assert_eq!(
        graph.forward(pool),
        Err(GraphError::NotCompiled("default_graph".to_string()))
    );
    Ok(())
}

#[test]
fn test_output_shape_unresolved_until_compile() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(6, 6, 2), None)?;
    let pool = graph.new_global_avg_pool_node(input, None)?;

    // 编译前：形状未解析，缓冲区大小为0
    assert_eq!(graph.get_node_output_shape(pool)?, None);
    assert_eq!(graph.get_node_scratch_len(pool)?, 0);

    graph.compile()?;
    assert_eq!(graph.get_node_output_shape(pool)?, Some(Shape::new(1, 1, 2)));
    Ok(())
}
