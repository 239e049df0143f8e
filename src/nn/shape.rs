/*
 * Shape: 嵌入式推理引擎的三元形状值类型
 *
 * 与通用框架的任意维形状不同，嵌入式引擎的张量统一约定为 (h, w, c) 三元组：
 * 高、宽、通道数。形状是纯值类型（Copy），自身不携带"未解析"语义——
 * 端口层面用 `Option<Shape>` 表达"尚未推导"，绝不用 (0,0,0) 之类的哨兵值。
 *
 * # 示例
 * ```
 * use only_infer::nn::Shape;
 *
 * let shape = Shape::new(28, 28, 3);
 * assert_eq!(shape.elements(), 28 * 28 * 3);
 * assert_eq!(shape.to_string(), "(28, 28, 3)");
 * ```
 */

use std::fmt;

/// 三元形状：(高, 宽, 通道数)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    pub h: usize,
    pub w: usize,
    pub c: usize,
}

impl Shape {
    /// 创建一个形状
    pub const fn new(h: usize, w: usize, c: usize) -> Self {
        Self { h, w, c }
    }

    /// 元素总数（h * w * c）
    pub const fn elements(&self) -> usize {
        self.h * self.w * self.c
    }

    /// 空间平面大小（h * w），不含通道
    pub const fn plane(&self) -> usize {
        self.h * self.w
    }

    /// 高宽中的较大者（计算缓冲区按行/列累加时取较长边）
    pub const fn max_hw(&self) -> usize {
        if self.w > self.h { self.w } else { self.h }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.h, self.w, self.c)
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((h, w, c): (usize, usize, usize)) -> Self {
        Self::new(h, w, c)
    }
}

/// 池化的补零方式
///
/// - `Valid`: 不补零，窗口完全落在输入内
/// - `Same`: 按步长向上取整保持输出尺寸（out = ceil(in / stride)）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaddingType {
    #[default]
    Valid,
    Same,
}
