//! Intelligence layer: mines the history store to pre-seed
//! the next debate's focus areas and adjust its post-debate severity.

mod decision_learner;
mod pattern_detector;
mod risk_predictor;
mod safe_eval;
mod smart_recommender;

pub use decision_learner::{learn_rules, LearnedRule, RuleType};
pub use pattern_detector::{detect_patterns, Pattern, PatternType};
pub use risk_predictor::{predict_risk, PredictedRisk, RiskPrediction};
pub use safe_eval::evaluate_condition;
pub use smart_recommender::{
    analyze_pre_debate, enhance_debate_result, EnhancedDebateResult, LearningAdjustments,
    PreDebateAnalysis,
};
