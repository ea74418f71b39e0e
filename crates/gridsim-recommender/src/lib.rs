//! gridsim-recommender — the simulation-driven recommendation engine.
//!
//! Scale-up advice is produced by a round-based loop: every round
//! fans out one isolated trial per eligible worker pool against the
//! shared sandbox, waits for the sandbox scheduler to place the trial's
//! copy of the pending workload, scores the outcomes, and commits the
//! cheapest winner. Rounds repeat until all pending workload is placed
//! or no further progress is possible.
//!
//! # Components
//!
//! - **`eligibility`** — pools with remaining headroom (`current < max`)
//! - **`trial`** — one round: fan-out, isolation labels, fan-in, winner
//! - **`scorer`** — waste/cost trial scoring
//! - **`scaleup`** — the round loop and accumulated recommendation
//! - **`scaledown`** — cost-ranked removal candidates

pub mod eligibility;
pub mod error;
pub mod scaledown;
pub mod scaleup;
pub mod scorer;
pub mod trial;

pub use eligibility::eligible_pools;
pub use error::{RecommenderError, RecommenderResult};
pub use scaledown::scale_down_candidates;
pub use scaleup::{Recommendation, RunOutcome, ScaleUpRecommender, TerminalReason};
pub use scorer::StrategyWeights;
pub use trial::{RoundWinner, TrialResult, run_round};
