pub mod algorithms;
pub mod engine;
pub mod evaluation;
pub mod model;
pub mod pipeline;
pub mod scenario;
pub mod stats;

pub use engine::{DetectionSummary, LoadStatus, ModelStatus, RiskContext};
pub use evaluation::{evaluate, ForecastEvaluation};
pub use model::{ModelSet, RegionModel};
pub use pipeline::features::preprocess;
pub use pipeline::ranking::{RegionRanking, RiskAnalysis};
pub use pipeline::risk::RiskRow;
pub use scenario::inject_leak;
