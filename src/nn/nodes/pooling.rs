/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 池化节点族：{max, avg, sum} × {有界, 全局}，六个变体共用一套节点布局
 *
 * 设计决策：
 * - 全局池化不是独立算法：它复用有界池化的布局与数值内核，
 *   只是构造时参数留空（核/步长置零），等接线后由 build 阶段"远程"回填——
 *   核 = 整个输入形状，步长 = (1,1,1)，补零 = (0,0,0)，VALID
 * - 解析是一次性的：resolved 状态位落定后，形状/参数/缓冲区大小即不可变，
 *   run 阶段只读取这些定格状态
 * - avg / sum 需要计算缓冲区，max 不需要：max 归约每通道只要一个滑动最大值，
 *   而 avg / sum 的中间累加空间与输出平面和输入通道数成正比
 */

use super::{GraphError, TraitNode};
use crate::nn::kernels;
use crate::nn::port::{InputPort, OutputPort};
use crate::nn::shape::{PaddingType, Shape};
use crate::nn::Tensor;

/// 归约种类：决定 run 阶段绑定哪个数值内核
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::nn) enum PoolKind {
    Max,
    Avg,
    Sum,
}

impl PoolKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Max => "max_pool",
            Self::Avg => "avg_pool",
            Self::Sum => "sum_pool",
        }
    }

    const fn global_label(self) -> &'static str {
        match self {
            Self::Max => "global_max_pool",
            Self::Avg => "global_avg_pool",
            Self::Sum => "global_sum_pool",
        }
    }
}

/// 池化范围：有界（显式核参数）或全局（核待 build 回填）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::nn) enum PoolScope {
    Bounded,
    Global,
}

pub(in crate::nn) struct Pooling {
    kind: PoolKind,
    scope: PoolScope,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,

    // 算子参数：有界变体构造时给定；全局变体构造时留空，build 阶段回填
    kernel: Shape,
    stride: Shape,
    pad: Shape,
    padding: PaddingType,

    /// 计算缓冲区需求（元素个数），build 阶段按归约种类定格
    scratch_len: usize,
    /// 实际缓冲区由 Graph 在编译尾声按 scratch_len 供给
    scratch: Vec<f32>,

    resolved: bool,
    value: Option<Tensor>,
}

impl Pooling {
    /// 通用池化布局：端口齐备、参数按调用方给定、一律未解析
    fn with_params(
        kind: PoolKind,
        scope: PoolScope,
        kernel: Shape,
        stride: Shape,
        padding: PaddingType,
    ) -> Self {
        Self {
            kind,
            scope,
            inputs: vec![InputPort::unhooked()],
            outputs: vec![OutputPort::unresolved()],
            kernel,
            stride,
            pad: Shape::new(0, 0, 0),
            padding,
            scratch_len: 0,
            scratch: Vec::new(),
            resolved: false,
            value: None,
        }
    }

    /// 有界池化变体：核/步长/补零方式在构造时显式给定
    ///
    /// `stride`为 None 时默认等于 kernel_size。
    pub fn bounded(
        kind: PoolKind,
        kernel_size: (usize, usize),
        stride: Option<(usize, usize)>,
        padding: PaddingType,
    ) -> Result<Self, GraphError> {
        let (k_h, k_w) = kernel_size;
        if k_h == 0 || k_w == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "池化窗口{k_h}x{k_w}非法：各维须至少为1"
            )));
        }
        let (s_h, s_w) = stride.unwrap_or(kernel_size);
        if s_h == 0 || s_w == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "池化步长{s_h}x{s_w}非法：各维须至少为1"
            )));
        }
        Ok(Self::with_params(
            kind,
            PoolScope::Bounded,
            Shape::new(k_h, k_w, 1),
            Shape::new(s_h, s_w, 1),
            padding,
        ))
    }

    /// 全局池化变体：不接受任何形状参数
    ///
    /// 先按常规池化布局创建、参数留空（核/步长置零），
    /// 待接线后由 build 阶段根据生产者的输出形状回填。
    pub fn global(kind: PoolKind) -> Self {
        Self::with_params(
            kind,
            PoolScope::Global,
            Shape::new(0, 0, 0),
            Shape::new(0, 0, 0),
            PaddingType::Valid,
        )
    }

    pub fn kernel(&self) -> Shape {
        self.kernel
    }

    pub fn stride(&self) -> Shape {
        self.stride
    }

    pub fn pad(&self) -> Shape {
        self.pad
    }

    pub fn padding(&self) -> PaddingType {
        self.padding
    }

    pub fn scratch_capacity(&self) -> usize {
        self.scratch.len()
    }

    /// 有界变体的输出空间尺寸推导
    fn resolve_bounded(&mut self, input: Shape) -> Result<Shape, GraphError> {
        let (k_h, k_w) = (self.kernel.h, self.kernel.w);
        let (s_h, s_w) = (self.stride.h, self.stride.w);
        match self.padding {
            PaddingType::Valid => {
                if k_h > input.h || k_w > input.w {
                    return Err(GraphError::ShapeMismatch {
                        expected: format!("窗口不超过({}, {})", input.h, input.w),
                        got: format!("({k_h}, {k_w})"),
                        message: "VALID池化窗口超出输入平面".to_string(),
                    });
                }
                self.pad = Shape::new(0, 0, 0);
                Ok(Shape::new(
                    (input.h - k_h) / s_h + 1,
                    (input.w - k_w) / s_w + 1,
                    input.c,
                ))
            }
            PaddingType::Same => {
                let out_h = input.h.div_ceil(s_h);
                let out_w = input.w.div_ceil(s_w);
                let pad_h = ((out_h - 1) * s_h + k_h).saturating_sub(input.h) / 2;
                let pad_w = ((out_w - 1) * s_w + k_w).saturating_sub(input.w) / 2;
                self.pad = Shape::new(pad_h, pad_w, 0);
                Ok(Shape::new(out_h, out_w, input.c))
            }
        }
    }

    /// 全局变体的解析：输出收缩为 (1, 1, c)，并回填被构造阶段留空的参数
    fn resolve_global(&mut self, input: Shape) -> Shape {
        // run 阶段走的是常规池化内核，故这里必须把核/步长/补零补齐成
        // "窗口恰好等于整个输入"的有界池化参数
        self.kernel = input;
        self.stride = Shape::new(1, 1, 1);
        self.pad = Shape::new(0, 0, 0);
        self.padding = PaddingType::Valid;
        Shape::new(1, 1, input.c)
    }

    /// 计算缓冲区大小：输出形状解析后才可计算
    ///
    /// avg 的公式取 max(out.w, out.h)，对全局池化退化为 2*c——
    /// 该公式本为有界池化设计、对全局情形原样复用，此处保留不"修正"。
    const fn plan_scratch(kind: PoolKind, output: Shape, in_c: usize) -> usize {
        match kind {
            PoolKind::Max => 0,
            PoolKind::Avg => 2 * output.max_hw() * in_c,
            PoolKind::Sum => 4 * output.h * output.w * output.c,
        }
    }
}

impl TraitNode for Pooling {
    fn type_label(&self) -> &'static str {
        match self.scope {
            PoolScope::Bounded => self.kind.label(),
            PoolScope::Global => self.kind.global_label(),
        }
    }

    fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut [InputPort] {
        &mut self.inputs
    }

    fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn build(&mut self, input_shapes: &[Shape]) -> Result<(), GraphError> {
        if input_shapes.len() != 1 {
            return Err(GraphError::InvalidOperation(format!(
                "池化节点需要恰好1个输入，得到{}个",
                input_shapes.len()
            )));
        }
        let input = input_shapes[0];
        if input.h == 0 || input.w == 0 || input.c == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "池化的输入形状{input}非法：各维须至少为1"
            )));
        }
        self.inputs[0].shape = Some(input);

        let output = match self.scope {
            PoolScope::Bounded => self.resolve_bounded(input)?,
            PoolScope::Global => self.resolve_global(input),
        };
        self.outputs[0].shape = Some(output);

        // 缓冲区大小依赖已解析的输出形状，必须在形状落定之后计算
        self.scratch_len = Self::plan_scratch(self.kind, output, input.c);
        self.resolved = true;
        Ok(())
    }

    fn scratch_len(&self) -> usize {
        self.scratch_len
    }

    fn provision_scratch(&mut self) {
        self.scratch = vec![0.0; self.scratch_len];
    }

    fn run(&mut self, inputs: &[Tensor]) -> Result<(), GraphError> {
        if !self.resolved {
            return Err(GraphError::InvalidOperation(
                "池化节点尚未解析，不能run".to_string(),
            ));
        }
        let input = inputs.first().ok_or_else(|| {
            GraphError::InvalidOperation("池化节点run时缺少输入张量".to_string())
        })?;

        let (h, w, c) = input.dim();
        let got = Shape::new(h, w, c);
        let expected = self.inputs[0].shape.ok_or_else(|| {
            GraphError::InvalidOperation("池化节点的输入形状未解析".to_string())
        })?;
        if got != expected {
            return Err(GraphError::ShapeMismatch {
                expected: expected.to_string(),
                got: got.to_string(),
                message: "run输入与解析时的形状不一致".to_string(),
            });
        }
        let output = self.outputs[0].shape.ok_or_else(|| {
            GraphError::InvalidOperation("池化节点的输出形状未解析".to_string())
        })?;

        if self.scratch.len() < self.scratch_len {
            return Err(GraphError::InvalidOperation(
                "计算缓冲区尚未供给，不能run".to_string(),
            ));
        }

        // 有界与全局变体共用同一内核，差别只在参数
        let result = match self.kind {
            PoolKind::Max => kernels::pool_max(input, output, self.kernel, self.stride, self.pad),
            PoolKind::Avg => kernels::pool_avg(
                input,
                output,
                self.kernel,
                self.stride,
                self.pad,
                &mut self.scratch,
            ),
            PoolKind::Sum => kernels::pool_sum(
                input,
                output,
                self.kernel,
                self.stride,
                self.pad,
                &mut self.scratch,
            ),
        };
        self.value = Some(result);
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }
}
