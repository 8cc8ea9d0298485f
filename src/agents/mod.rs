pub mod decision;
pub mod prompts;
pub mod registry;

pub use decision::{DecisionAgent, DecisionStream, DECISION_FALLBACK};
pub use prompts::{PromptTemplate, PromptTemplates};
pub use registry::ModelRegistry;
