pub mod animation_flow;
pub mod cancel;
pub mod choice_flow;
pub mod short_answer_flow;
pub mod solve_ctx;
pub mod solver;

pub use animation_flow::AnimationSolver;
pub use cancel::CancellationSignal;
pub use choice_flow::ChoiceSolver;
pub use short_answer_flow::ShortAnswerSolver;
pub use solve_ctx::SolveCtx;
pub use solver::{solve_batch, SolveOutcome, Solver};
