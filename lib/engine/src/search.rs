/*
 * 搜索模块 - 深度受限的 minimax + Alpha-Beta 剪枝
 *
 * - SearchPosition：搜索对局面的全部要求（走法枚举、成对的落子/悔棋、终局判定、静态评估）
 * - alpha_beta：递归搜索，返回 (分数, 访问节点数)，节点计数不依赖任何共享状态
 * - minimax：不剪枝的全宽搜索，用来核对 alpha_beta 的结果
 * - root_search：根节点选着，支持两种窗口策略，选出的走法和分数相同，只是剪枝效率不同
 */

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{EngineError, Result};

/// 白方视角的分数，一个兵约等于 1.0
pub type Score = f64;

pub trait SearchPosition {
    type Move: Copy + PartialEq;

    /// 顺序有意义：同分时取先出现的走法，剪枝也按此顺序进行
    fn legal_moves(&self) -> Vec<Self::Move>;
    fn apply_move(&mut self, mv: Self::Move);
    fn undo_move(&mut self);
    fn is_game_over(&self) -> bool;
    fn evaluate(&self) -> Score;
    fn white_to_move(&self) -> bool;

    // 落子、执行 f、悔棋，三者成对出现
    fn with_move<R>(&mut self, mv: Self::Move, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        self.apply_move(mv);
        let result = f(self);
        self.undo_move();
        result
    }
}

/// 根节点兄弟之间的窗口策略
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Window {
    /// 每个根走法都用 (-inf, +inf) 重新搜索
    #[default]
    Isolated,
    /// alpha/beta 在根走法之间延续
    Threaded,
}

#[derive(Clone, Debug)]
pub struct RootResult<M> {
    pub best_move: Option<M>,
    pub score: Score,
    pub nodes: u64,
    pub elapsed: Duration,
}

// Alpha-Beta 搜索
// 深度为 0 或对局结束时返回静态评估；每次调用（包括叶子）计一个节点
pub fn alpha_beta<P: SearchPosition>(
    pos: &mut P,
    depth: u32,
    mut alpha: Score,
    mut beta: Score,
    maximizing: bool,
) -> (Score, u64) {
    let mut nodes = 1;
    if depth == 0 || pos.is_game_over() {
        return (pos.evaluate(), nodes);
    }

    let mut best = if maximizing { Score::NEG_INFINITY } else { Score::INFINITY };
    for mv in pos.legal_moves() {
        let (value, child_nodes) = pos.with_move(mv, |pos| alpha_beta(pos, depth - 1, alpha, beta, !maximizing));
        nodes += child_nodes;
        if maximizing {
            best = best.max(value);
            alpha = alpha.max(best);
        } else {
            best = best.min(value);
            beta = beta.min(best);
        }
        if alpha >= beta {
            break;
        }
    }
    (best, nodes)
}

/// 不剪枝的全宽 minimax
pub fn minimax<P: SearchPosition>(pos: &mut P, depth: u32, maximizing: bool) -> (Score, u64) {
    let mut nodes = 1;
    if depth == 0 || pos.is_game_over() {
        return (pos.evaluate(), nodes);
    }

    let mut best = if maximizing { Score::NEG_INFINITY } else { Score::INFINITY };
    for mv in pos.legal_moves() {
        let (value, child_nodes) = pos.with_move(mv, |pos| minimax(pos, depth - 1, !maximizing));
        nodes += child_nodes;
        best = if maximizing { best.max(value) } else { best.min(value) };
    }
    (best, nodes)
}

// 根节点选着：白方取最大、黑方取最小，严格比较保证同分时保留先枚举到的走法
pub fn root_search<P: SearchPosition>(pos: &mut P, depth: u32, window: Window) -> Result<RootResult<P::Move>> {
    if depth == 0 {
        return Err(EngineError::InvalidGameConfiguration(
            "search depth must be at least 1".to_owned(),
        ));
    }

    let start = Instant::now();
    let maximizing = pos.white_to_move();
    let mut best_move = None;
    let mut best_value = if maximizing { Score::NEG_INFINITY } else { Score::INFINITY };
    let mut alpha = Score::NEG_INFINITY;
    let mut beta = Score::INFINITY;
    let mut nodes = 0;

    for mv in pos.legal_moves() {
        if window == Window::Isolated {
            alpha = Score::NEG_INFINITY;
            beta = Score::INFINITY;
        }
        let (value, child_nodes) = pos.with_move(mv, |pos| alpha_beta(pos, depth - 1, alpha, beta, !maximizing));
        nodes += child_nodes;

        let improved = if maximizing { value > best_value } else { value < best_value };
        if improved {
            best_value = value;
            best_move = Some(mv);
        }
        if maximizing {
            alpha = alpha.max(best_value);
        } else {
            beta = beta.min(best_value);
        }
    }

    let elapsed = start.elapsed();
    debug!(depth, ?window, nodes, score = best_value, ?elapsed, "root search finished");
    Ok(RootResult {
        best_move,
        score: best_value,
        nodes,
        elapsed,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::board::Board;
    use crate::eval::evaluate;

    /// 用数组描述的博弈树：内部节点按顺序列出子节点，叶子给出分数
    #[derive(Clone, Debug)]
    pub(crate) enum Tree {
        Leaf(Score),
        Node(Vec<Tree>),
    }

    /// 在 Tree 上行走的局面，path 记录从根出发的子节点下标
    pub(crate) struct TreePosition {
        pub root: Tree,
        pub path: Vec<usize>,
        pub white_to_move: bool,
    }

    impl TreePosition {
        pub fn new(root: Tree) -> Self {
            TreePosition {
                root,
                path: vec![],
                white_to_move: true,
            }
        }

        fn current(&self) -> &Tree {
            let mut node = &self.root;
            for &i in &self.path {
                if let Tree::Node(children) = node {
                    node = &children[i];
                }
            }
            node
        }
    }

    impl SearchPosition for TreePosition {
        type Move = usize;

        fn legal_moves(&self) -> Vec<usize> {
            match self.current() {
                Tree::Leaf(_) => vec![],
                Tree::Node(children) => (0..children.len()).collect(),
            }
        }

        fn apply_move(&mut self, mv: usize) {
            self.path.push(mv);
            self.white_to_move = !self.white_to_move;
        }

        fn undo_move(&mut self) {
            self.path.pop();
            self.white_to_move = !self.white_to_move;
        }

        fn is_game_over(&self) -> bool {
            matches!(self.current(), Tree::Leaf(_))
        }

        fn evaluate(&self) -> Score {
            match self.current() {
                Tree::Leaf(v) => *v,
                Tree::Node(_) => 0.0,
            }
        }

        fn white_to_move(&self) -> bool {
            self.white_to_move
        }
    }

    fn leaf(v: Score) -> Tree {
        Tree::Leaf(v)
    }

    fn node(children: Vec<Tree>) -> Tree {
        Tree::Node(children)
    }

    // 确定性的伪随机树，分数带重复值以覆盖同分的情况
    pub(crate) fn synthetic_tree(depth: u32, width: usize, seed: &mut u64) -> Tree {
        if depth == 0 {
            *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            return leaf(((*seed >> 33) % 11) as Score - 5.0);
        }
        node((0..width).map(|_| synthetic_tree(depth - 1, width, seed)).collect())
    }

    #[test]
    fn test_alpha_beta_matches_minimax_on_trees() {
        let mut seed = 7;
        for _ in 0..20 {
            let mut pos = TreePosition::new(synthetic_tree(4, 3, &mut seed));
            for depth in 0..=4 {
                for maximizing in [true, false] {
                    let (full, full_nodes) = minimax(&mut pos, depth, maximizing);
                    let (pruned, pruned_nodes) =
                        alpha_beta(&mut pos, depth, Score::NEG_INFINITY, Score::INFINITY, maximizing);
                    assert_eq!(pruned, full);
                    assert!(pruned_nodes <= full_nodes);
                    assert!(pos.path.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_pruning_skips_siblings() {
        // 经典例子：第二个子树的第一个叶子 2 小于已知的 3，剩下的 9 不必再看
        let mut pos = TreePosition::new(node(vec![
            node(vec![leaf(3.0), leaf(5.0)]),
            node(vec![leaf(2.0), leaf(9.0)]),
        ]));
        let (value, nodes) = alpha_beta(&mut pos, 2, Score::NEG_INFINITY, Score::INFINITY, true);
        assert_eq!(value, 3.0);
        assert_eq!(nodes, 6);
        let (value, nodes) = minimax(&mut pos, 2, true);
        assert_eq!(value, 3.0);
        assert_eq!(nodes, 7);
    }

    #[test]
    fn test_depth_zero_is_static_eval() {
        let mut board = Board::init();
        let (value, nodes) = alpha_beta(&mut board, 0, Score::NEG_INFINITY, Score::INFINITY, true);
        assert_eq!(value, evaluate(&board));
        assert_eq!(nodes, 1);
    }

    #[test]
    fn test_alpha_beta_matches_minimax_on_board() {
        let mut board = Board::init();
        let before = board.fen();
        for depth in 1..=3 {
            let (full, full_nodes) = minimax(&mut board, depth, true);
            let (pruned, pruned_nodes) = alpha_beta(&mut board, depth, Score::NEG_INFINITY, Score::INFINITY, true);
            assert_eq!(pruned, full);
            assert!(pruned_nodes <= full_nodes);
            assert_eq!(board.fen(), before);
            assert_eq!(board.ply(), 0);
        }
    }

    #[test]
    fn test_tie_keeps_first_move() {
        let tree = node(vec![
            node(vec![leaf(1.0), leaf(4.0)]),
            node(vec![leaf(4.0), leaf(7.0)]),
            node(vec![leaf(4.0), leaf(6.0)]),
            node(vec![leaf(0.0)]),
        ]);
        for window in [Window::Isolated, Window::Threaded] {
            for _ in 0..3 {
                let mut pos = TreePosition::new(tree.clone());
                let result = root_search(&mut pos, 2, window).unwrap();
                assert_eq!(result.best_move, Some(1));
                assert_eq!(result.score, 4.0);
            }
        }

        // 黑方取最小，同样保留第一个
        let mut pos = TreePosition::new(node(vec![leaf(2.0), leaf(-1.0), leaf(-1.0)]));
        pos.white_to_move = false;
        let result = root_search(&mut pos, 1, Window::Isolated).unwrap();
        assert_eq!(result.best_move, Some(1));
        assert_eq!(result.score, -1.0);
    }

    #[test]
    fn test_windows_agree() {
        let mut seed = 11;
        for _ in 0..20 {
            let tree = synthetic_tree(4, 4, &mut seed);
            // 白方取最大与黑方取最小两种根节点
            for white_to_move in [true, false] {
                let mut pos = TreePosition::new(tree.clone());
                pos.white_to_move = white_to_move;
                let isolated = root_search(&mut pos, 4, Window::Isolated).unwrap();
                let threaded = root_search(&mut pos, 4, Window::Threaded).unwrap();
                assert_eq!(isolated.best_move, threaded.best_move);
                assert_eq!(isolated.score, threaded.score);
                assert!(pos.path.is_empty());
            }
        }

        let mut board = Board::init();
        for text in ["", "e2e4", "d7d5"] {
            if !text.is_empty() {
                let mv = board.resolve_move(text).unwrap();
                board.apply_move(mv);
            }
            let isolated = root_search(&mut board, 3, Window::Isolated).unwrap();
            let threaded = root_search(&mut board, 3, Window::Threaded).unwrap();
            assert_eq!(isolated.best_move, threaded.best_move, "{}", board.fen());
            assert_eq!(isolated.score, threaded.score);
        }
    }

    #[test]
    fn test_depth_one_is_best_static_eval() {
        let mut board = Board::init();
        let mut best: Option<(Score, cozy_chess::Move)> = None;
        for mv in board.legal_moves() {
            board.apply_move(mv);
            let value = evaluate(&board);
            board.undo_move();
            if best.map_or(true, |(v, _)| value > v) {
                best = Some((value, mv));
            }
        }
        let (value, mv) = best.unwrap();

        let result = root_search(&mut board, 1, Window::Isolated).unwrap();
        assert_eq!(result.best_move, Some(mv));
        assert_eq!(result.score, value);
    }

    #[test]
    fn test_root_node_count() {
        let mut board = Board::init();
        let legal = board.legal_moves().len() as u64;
        for window in [Window::Isolated, Window::Threaded] {
            let result = root_search(&mut board, 1, window).unwrap();
            assert_eq!(result.nodes, legal);
        }
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut board = Board::init();
        assert!(matches!(
            root_search(&mut board, 0, Window::Isolated),
            Err(EngineError::InvalidGameConfiguration(_))
        ));
    }

    #[test]
    fn test_no_root_moves() {
        let mut board = Board::from_fen("k7/8/1Q6/8/8/8/8/7K b - - 0 1").unwrap();
        let result = root_search(&mut board, 2, Window::Threaded).unwrap();
        assert_eq!(result.best_move, None);
        assert_eq!(result.nodes, 0);
    }
}
