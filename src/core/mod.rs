mod analyzer;
mod engine;
mod naming;
mod parser;
mod registry;
mod renderer;
mod requirement;
mod validator;
mod writer;

pub use analyzer::{
    Recommendation, RequirementAnalysis, ReusabilityAnalyzer, ReuseDecision, StepMatch,
    StepSummary,
};
pub use parser::RequirementParser;
pub use registry::{PatternRegistry, RegistryStats, StepCategory, StepRecord};
pub use renderer::{ArtifactRenderer, GeneratedArtifactSet};
pub use requirement::{
    ArtifactIdentity, ParsedRequirement, Scenario, ScenarioStep, StepKeyword, UiElements,
    UserStory,
};
pub use validator::{ArtifactValidator, ValidationResult};
pub use writer::ArtifactWriter;

// Export the main engine
pub use engine::Engine;
