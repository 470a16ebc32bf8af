// 对比预测：同一局面先按 depth 搜索（预测），再按 depth + 1 搜索（标准答案）
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::search::{root_search, Score, SearchPosition, Window};

#[derive(Clone, Debug)]
pub struct Prediction<M> {
    pub predicted: Option<M>,
    pub predicted_score: Score,
    pub ground_truth: Option<M>,
    pub ground_truth_score: Score,
    /// 只统计预测那一轮的节点数与耗时
    pub nodes: u64,
    pub elapsed: Duration,
}

impl<M: PartialEq> Prediction<M> {
    pub fn is_correct(&self) -> bool {
        self.predicted == self.ground_truth
    }
}

// 两次搜索互不共享状态；标准答案一轮总是使用独立窗口
pub fn predict<P: SearchPosition>(pos: &mut P, depth: u32, window: Window) -> Result<Prediction<P::Move>> {
    let shallow = root_search(pos, depth, window)?;
    let deep = root_search(pos, depth + 1, Window::Isolated)?;
    debug!(
        depth,
        shallow_nodes = shallow.nodes,
        deep_nodes = deep.nodes,
        agree = shallow.best_move == deep.best_move,
        "prediction finished"
    );
    Ok(Prediction {
        predicted: shallow.best_move,
        predicted_score: shallow.score,
        ground_truth: deep.best_move,
        ground_truth_score: deep.score,
        nodes: shallow.nodes,
        elapsed: shallow.elapsed,
    })
}
