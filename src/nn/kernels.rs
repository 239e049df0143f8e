/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 池化数值内核（max / avg / sum）
 *
 * 设计决策：
 * - 三个内核都是通用的窗口化归约：全局池化不是独立算法，
 *   只是"窗口恰好覆盖整个输入平面"的一组特殊参数，故有界与全局变体共用内核
 * - avg / sum 内核通过外部供给的计算缓冲区累加中间结果；
 *   max 只需每通道一个滑动最大值，无需缓冲区
 * - 补零（SAME）区域不参与归约：窗口先裁剪到输入范围内再归约，
 *   avg 按裁剪后的实际元素数取均值
 */

use super::shape::Shape;
use super::Tensor;
use ndarray::Array3;

/// 单个输出位置对应的输入窗口（已裁剪到输入范围内）
///
/// 返回 (h_start, h_end, w_start, w_end)，半开区间。
fn clipped_window(
    oh: usize,
    ow: usize,
    input: Shape,
    kernel: Shape,
    stride: Shape,
    pad: Shape,
) -> (usize, usize, usize, usize) {
    let h_from = (oh * stride.h) as isize - pad.h as isize;
    let w_from = (ow * stride.w) as isize - pad.w as isize;
    let h_start = h_from.max(0) as usize;
    let w_start = w_from.max(0) as usize;
    let h_end = ((h_from + kernel.h as isize) as usize).min(input.h);
    let w_end = ((w_from + kernel.w as isize) as usize).min(input.w);
    (h_start, h_end, w_start, w_end)
}

/// 最大值池化内核
pub(in crate::nn) fn pool_max(
    input: &Tensor,
    out: Shape,
    kernel: Shape,
    stride: Shape,
    pad: Shape,
) -> Tensor {
    let (in_h, in_w, in_c) = input.dim();
    let in_shape = Shape::new(in_h, in_w, in_c);
    let mut output = Array3::zeros((out.h, out.w, out.c));

    for oh in 0..out.h {
        for ow in 0..out.w {
            let (h0, h1, w0, w1) = clipped_window(oh, ow, in_shape, kernel, stride, pad);
            for ch in 0..out.c {
                let mut max_val = f32::NEG_INFINITY;
                for ih in h0..h1 {
                    for iw in w0..w1 {
                        let val = input[[ih, iw, ch]];
                        if val > max_val {
                            max_val = val;
                        }
                    }
                }
                output[[oh, ow, ch]] = max_val;
            }
        }
    }
    output
}

/// 平均池化内核
///
/// 逐输出行累加：每行占用 `out.w * c` 个缓冲元素，行写出后缓冲区复用。
pub(in crate::nn) fn pool_avg(
    input: &Tensor,
    out: Shape,
    kernel: Shape,
    stride: Shape,
    pad: Shape,
    scratch: &mut [f32],
) -> Tensor {
    let (in_h, in_w, in_c) = input.dim();
    let in_shape = Shape::new(in_h, in_w, in_c);
    let mut output = Array3::zeros((out.h, out.w, out.c));
    let row_len = out.w * out.c;

    for oh in 0..out.h {
        let row = &mut scratch[..row_len];
        row.fill(0.0);

        for ow in 0..out.w {
            let (h0, h1, w0, w1) = clipped_window(oh, ow, in_shape, kernel, stride, pad);
            for ih in h0..h1 {
                for iw in w0..w1 {
                    for ch in 0..out.c {
                        row[ow * out.c + ch] += input[[ih, iw, ch]];
                    }
                }
            }
            // 补零区域不计入均值分母
            let count = ((h1 - h0) * (w1 - w0)).max(1) as f32;
            for ch in 0..out.c {
                output[[oh, ow, ch]] = row[ow * out.c + ch] / count;
            }
        }
    }
    output
}

/// 求和池化内核
///
/// 整个输出平面的累加器都落在缓冲区里，归约完成后一次性写出。
pub(in crate::nn) fn pool_sum(
    input: &Tensor,
    out: Shape,
    kernel: Shape,
    stride: Shape,
    pad: Shape,
    scratch: &mut [f32],
) -> Tensor {
    let (in_h, in_w, in_c) = input.dim();
    let in_shape = Shape::new(in_h, in_w, in_c);
    let acc_len = out.elements();
    let acc = &mut scratch[..acc_len];
    acc.fill(0.0);

    for oh in 0..out.h {
        for ow in 0..out.w {
            let (h0, h1, w0, w1) = clipped_window(oh, ow, in_shape, kernel, stride, pad);
            for ih in h0..h1 {
                for iw in w0..w1 {
                    for ch in 0..out.c {
                        acc[(oh * out.w + ow) * out.c + ch] += input[[ih, iw, ch]];
                    }
                }
            }
        }
    }

    let mut output = Array3::zeros((out.h, out.w, out.c));
    for oh in 0..out.h {
        for ow in 0..out.w {
            for ch in 0..out.c {
                output[[oh, ow, ch]] = acc[(oh * out.w + ow) * out.c + ch];
            }
        }
    }
    output
}
