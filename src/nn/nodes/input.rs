/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 输入节点：整图的张量来源
 *
 * 输入节点在构造时即声明形状，build 阶段只是把声明的形状落到输出端口上；
 * 其值由用户在每次推理前通过 set_value 提供，而非由父节点计算。
 */

use super::{GraphError, TraitNode};
use crate::nn::port::{InputPort, OutputPort};
use crate::nn::shape::Shape;
use crate::nn::Tensor;

pub(in crate::nn) struct Input {
    /// 构造时声明的形状
    declared: Shape,
    outputs: Vec<OutputPort>,
    resolved: bool,
    value: Option<Tensor>,
}

impl Input {
    pub fn new(shape: Shape) -> Self {
        Self {
            declared: shape,
            outputs: vec![OutputPort::unresolved()],
            resolved: false,
            value: None,
        }
    }
}

impl TraitNode for Input {
    fn type_label(&self) -> &'static str {
        "input"
    }

    fn inputs(&self) -> &[InputPort] {
        &[]
    }

    fn inputs_mut(&mut self) -> &mut [InputPort] {
        &mut []
    }

    fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn build(&mut self, _input_shapes: &[Shape]) -> Result<(), GraphError> {
        self.outputs[0].shape = Some(self.declared);
        self.resolved = true;
        Ok(())
    }

    fn run(&mut self, _inputs: &[Tensor]) -> Result<(), GraphError> {
        // 输入节点的值由 set_value 提供，run 只检查其存在
        if self.value.is_none() {
            return Err(GraphError::InvalidOperation(
                "输入节点的值尚未设置".to_string(),
            ));
        }
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        if let Some(tensor) = value {
            let (h, w, c) = tensor.dim();
            let got = Shape::new(h, w, c);
            if got != self.declared {
                return Err(GraphError::ShapeMismatch {
                    expected: self.declared.to_string(),
                    got: got.to_string(),
                    message: "输入张量与声明形状不一致".to_string(),
                });
            }
        }
        self.value = value.cloned();
        Ok(())
    }
}
