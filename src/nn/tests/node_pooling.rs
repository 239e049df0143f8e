/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : 有界池化单元测试
 *
 * 测试策略：
 * 1. 形状推导（VALID / SAME、默认步长）
 * 2. 构造与解析阶段的失败路径（非法核、窗口超界）
 * 3. 数值内核（max / avg / sum 各自的归约语义）
 * 4. 缓冲区规划（有界情形的大小表）
 */

use crate::nn::{Graph, GraphError, PaddingType, Shape, Tensor};
use approx::assert_abs_diff_eq;

// ==================== 形状推导 ====================

#[test]
fn test_max_pool_output_shape_valid() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    // H' = (4 - 2) / 2 + 1 = 2
    let pool = graph.new_max_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    graph.compile()?;

    assert_eq!(graph.get_node_output_shape(pool)?, Some(Shape::new(2, 2, 1)));
    Ok(())
}

#[test]
fn test_pool_output_shape_with_stride() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(6, 6, 3), None)?;
    // H' = (6 - 3) / 2 + 1 = 2
    let pool = graph.new_avg_pool_node(input, (3, 3), Some((2, 2)), PaddingType::Valid, None)?;
    graph.compile()?;

    assert_eq!(graph.get_node_output_shape(pool)?, Some(Shape::new(2, 2, 3)));
    Ok(())
}

#[test]
fn test_pool_output_shape_same_padding() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(5, 5, 2), None)?;
    // SAME: out = ceil(5 / 2) = 3
    let pool = graph.new_max_pool_node(input, (3, 3), Some((2, 2)), PaddingType::Same, None)?;
    graph.compile()?;

    assert_eq!(graph.get_node_output_shape(pool)?, Some(Shape::new(3, 3, 2)));
    Ok(())
}

// ==================== 失败路径 ====================

#[test]
fn test_zero_kernel_rejected_at_construction() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None).unwrap();
    // 有界变体的核必须显式给定且非零（核置零是全局变体的内部约定）
    let result = graph.new_max_pool_node(input, (0, 0), None, PaddingType::Valid, None);
    assert!(matches!(result, Err(GraphError::InvalidOperation(_))));
    assert_eq!(graph.nodes_count(), 1);
}

#[test]
fn test_oversized_kernel_rejected_at_build() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    // 构造时尚不知输入形状，窗口超界要等到 build 阶段才可判定
    let pool = graph.new_max_pool_node(input, (5, 5), None, PaddingType::Valid, None)?;

    assert!(matches!(
        graph.compile(),
        Err(GraphError::ShapeMismatch { .. })
    ));
    // 解析失败的节点不得带着未解析的输出被下游使用
    assert_eq!(graph.get_node_output_shape(pool)?, None);
    assert!(!graph.is_compiled());
    Ok(())
}

// ==================== 数值执行 ====================

#[test]
fn test_max_pool_forward() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let pool = graph.new_max_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    graph.compile()?;

    #[rustfmt::skip]
    let input_val = Tensor::from_shape_vec((4, 4, 1), vec![
        1.0, 2.0, 3.0, 4.0,
        5.0, 6.0, 7.0, 8.0,
        9.0, 10.0, 11.0, 12.0,
        13.0, 14.0, 15.0, 16.0,
    ]).unwrap();
    graph.set_node_value(input, Some(&input_val))?;
    graph.forward(pool)?;

    // 窗口 [0:2, 0:2]: max(1,2,5,6) = 6
    // 窗口 [0:2, 2:4]: max(3,4,7,8) = 8
    // 窗口 [2:4, 0:2]: max(9,10,13,14) = 14
    // 窗口 [2:4, 2:4]: max(11,12,15,16) = 16
    let output = graph.get_node_value(pool)?.unwrap();
    assert_eq!(output.dim(), (2, 2, 1));
    assert_abs_diff_eq!(output[[0, 0, 0]], 6.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1, 0]], 8.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[1, 0, 0]], 14.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[1, 1, 0]], 16.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_avg_pool_forward() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let pool = graph.new_avg_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    graph.compile()?;

    #[rustfmt::skip]
    let input_val = Tensor::from_shape_vec((4, 4, 1), vec![
        1.0, 2.0, 3.0, 4.0,
        5.0, 6.0, 7.0, 8.0,
        9.0, 10.0, 11.0, 12.0,
        13.0, 14.0, 15.0, 16.0,
    ]).unwrap();
    graph.set_node_value(input, Some(&input_val))?;
    graph.forward(pool)?;

    let output = graph.get_node_value(pool)?.unwrap();
    assert_abs_diff_eq!(output[[0, 0, 0]], 3.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1, 0]], 5.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[1, 0, 0]], 11.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[1, 1, 0]], 13.5, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_sum_pool_forward() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let pool = graph.new_sum_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    graph.compile()?;

    #[rustfmt::skip]
    let input_val = Tensor::from_shape_vec((4, 4, 1), vec![
        1.0, 2.0, 3.0, 4.0,
        5.0, 6.0, 7.0, 8.0,
        9.0, 10.0, 11.0, 12.0,
        13.0, 14.0, 15.0, 16.0,
    ]).unwrap();
    graph.set_node_value(input, Some(&input_val))?;
    graph.forward(pool)?;

    let output = graph.get_node_value(pool)?.unwrap();
    assert_abs_diff_eq!(output[[0, 0, 0]], 14.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1, 0]], 22.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[1, 0, 0]], 46.0, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[1, 1, 0]], 54.0, epsilon = 1e-6);
    Ok(())
}

/// SAME 补零下的平均池化：补零区域不计入分母，全1输入的输出处处为1
#[test]
fn test_avg_pool_same_padding_excludes_pad() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(5, 5, 1), None)?;
    let pool = graph.new_avg_pool_node(input, (3, 3), Some((2, 2)), PaddingType::Same, None)?;
    graph.compile()?;

    let input_val = Tensor::from_elem((5, 5, 1), 1.0);
    graph.set_node_value(input, Some(&input_val))?;
    graph.forward(pool)?;

    let output = graph.get_node_value(pool)?.unwrap();
    assert_eq!(output.dim(), (3, 3, 1));
    for oh in 0..3 {
        for ow in 0..3 {
            assert_abs_diff_eq!(output[[oh, ow, 0]], 1.0, epsilon = 1e-6);
        }
    }
    Ok(())
}

/// run 输入与解析时的形状不一致须被拒绝
#[test]
fn test_forward_with_mismatched_input_shape() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(4, 4, 1), None)?;
    let _pool = graph.new_max_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    graph.compile()?;

    let bad_val = Tensor::from_elem((3, 3, 1), 1.0);
    assert!(matches!(
        graph.set_node_value(input, Some(&bad_val)),
        Err(GraphError::ShapeMismatch { .. })
    ));
    Ok(())
}

// ==================== 缓冲区规划（有界情形） ====================

#[test]
fn test_bounded_pool_scratch_sizes() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(Shape::new(8, 6, 4), None)?;
    // VALID, 核2x2步长2x2：输出 (4, 3, 4)
    let max = graph.new_max_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    let avg = graph.new_avg_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    let sum = graph.new_sum_pool_node(input, (2, 2), None, PaddingType::Valid, None)?;
    graph.compile()?;

    assert_eq!(graph.get_node_scratch_len(max)?, 0);
    // avg: 2 * max(out.w=3, out.h=4) * in.c=4
    assert_eq!(graph.get_node_scratch_len(avg)?, 2 * 4 * 4);
    // sum: 4 * out.h * out.w * out.c = 4 * 4 * 3 * 4
    assert_eq!(graph.get_node_scratch_len(sum)?, 4 * 4 * 3 * 4);
    Ok(())
}
