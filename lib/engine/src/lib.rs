/**
 * 详细中文注释 - 引擎核心库入口
 *
 * 说明
 * - board：对 cozy_chess 的适配，负责落子/悔棋、终局判定、UCI 走法文本
 * - constant：开局 FEN、评估权重、准确率阈值等常量
 * - error：库内统一的错误类型
 * - eval：白方视角的静态评估
 * - search：Alpha-Beta 搜索与根节点选着
 * - predict：浅层预测与深一层标准答案的对比
 * - selfplay：自对弈评测、混淆矩阵与 CSV 输出
 */
pub mod board;
pub mod constant;
pub mod error;
pub mod eval;
pub mod predict;
pub mod search;
pub mod selfplay;
