//! # Only Infer
//!
//! `only_infer`项目旨在用纯rust仿造[NNoM](https://github.com/majianjia/nnom)这类
//! 面向资源受限硬件的嵌入式推理引擎：先以不完整参数声明各层节点，组网（挂钩）后
//! 由编译过程统一推导各层的输入/输出形状、算子参数与计算缓冲区大小，
//! 之后即可反复执行推理而无需再次解析。
//!

pub mod nn;
