use serde::{Deserialize, Serialize};

use super::naming::{to_kebab_case, to_pascal_case};

/// Cucumber step keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
}

impl StepKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::And => "And",
        }
    }

    /// Parse a keyword prefix, case-insensitively.
    pub fn from_prefix(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "given" => Some(StepKeyword::Given),
            "when" => Some(StepKeyword::When),
            "then" => Some(StepKeyword::Then),
            "and" => Some(StepKeyword::And),
            _ => None,
        }
    }
}

/// A single parsed step, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub keyword: StepKeyword,
    pub text: String,
}

/// One scenario with its ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

/// User story extracted from `As a / I want / So that` lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    pub as_a: String,
    pub i_want: String,
    pub so_that: String,
}

impl Default for UserStory {
    fn default() -> Self {
        Self {
            as_a: "user".to_string(),
            i_want: "to complete the described workflow".to_string(),
            so_that: "the business requirement is satisfied".to_string(),
        }
    }
}

/// UI element names extracted via quoted-phrase patterns, deduplicated
/// within each category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiElements {
    pub buttons: Vec<String>,
    pub links: Vec<String>,
    pub pages: Vec<String>,
}

impl UiElements {
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.links.is_empty() && self.pages.is_empty()
    }
}

/// The single source of truth for cross-file naming. Derived exactly once
/// per generation run and threaded through every renderer, so the feature,
/// steps, and page artifacts can never disagree about names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIdentity {
    /// Kebab-case base for file names (`login` -> `login.feature`,
    /// `login-steps.js`, `login-page.js`).
    pub file_base_name: String,

    /// Exported page-object class name (`LoginPage`).
    pub class_name: String,
}

impl ArtifactIdentity {
    /// Derive an identity from a free-text name fragment.
    pub fn derive(name: &str) -> Self {
        let file_base_name = to_kebab_case(name);
        let class_name = format!("{}Page", to_pascal_case(&file_base_name));
        Self {
            file_base_name,
            class_name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_base_name.is_empty()
    }

    /// Relative import of the page object from the steps file.
    pub fn page_import_path(&self) -> String {
        format!("../pages/{}-page", self.file_base_name)
    }
}

/// Structured intermediate representation of one requirement document.
/// Created once per generation run, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRequirement {
    pub title: String,
    pub user_story: UserStory,
    pub scenarios: Vec<Scenario>,
    pub acceptance_criteria: Vec<String>,
    pub tags: Vec<String>,
    pub ui_elements: UiElements,
    pub examples_table: Option<Vec<String>>,
    pub identity: ArtifactIdentity,
}

impl ParsedRequirement {
    /// All steps across scenarios, in document order.
    pub fn steps(&self) -> impl Iterator<Item = &ScenarioStep> {
        self.scenarios.iter().flat_map(|s| s.steps.iter())
    }

    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }
}
