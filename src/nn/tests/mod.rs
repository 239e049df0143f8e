mod graph_basic;
mod node_pooling; // 有界池化测试（形状推导 + 数值内核）
