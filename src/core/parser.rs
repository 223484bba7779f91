use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::Result;

use super::naming::to_kebab_case;
use super::requirement::{
    ArtifactIdentity, ParsedRequirement, Scenario, ScenarioStep, StepKeyword, UiElements,
    UserStory,
};

/// Lines starting with these markers are template instructions, not content.
const INSTRUCTIONAL_MARKERS: &[&str] = &["📝", "💡", "⚠️", "✅", "❗", "👉", "🔹", "🚨"];

/// Trimmed lines equal to these (case-insensitive) are template filler.
const PLACEHOLDER_LINES: &[&str] = &["tbd", "n/a", "todo", "to be defined"];

/// Trimmed lines containing these fragments (case-insensitive) are filler.
const PLACEHOLDER_FRAGMENTS: &[&str] = &["[insert", "<insert", "placeholder", "add your"];

/// Which bucket free-form lines currently land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionMode {
    Prose,
    AcceptanceCriteria,
    BddSteps,
}

/// Tolerant parser for loosely structured requirement documents (JIRA
/// stories, BDD templates). Never fails: absent sections default to empty
/// collections, an absent title defaults to a placeholder, malformed
/// `Examples:` blocks are dropped.
pub struct RequirementParser {
    heading_regex: Regex,
    title_regex: Regex,
    scenario_regex: Regex,
    section_ac_regex: Regex,
    section_bdd_regex: Regex,
    examples_regex: Regex,
    as_a_regex: Regex,
    i_want_regex: Regex,
    so_that_regex: Regex,
    button_regex: Regex,
    link_regex: Regex,
    page_regex: Regex,
    title_abbrev_regex: Regex,
    html_comment_regex: Regex,
    generation: GenerationConfig,
}

impl RequirementParser {
    pub fn new(generation: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            heading_regex: Regex::new(r"^#+\s*(.+)$")?,
            title_regex: Regex::new(r"(?i)^title:\s*(.+)$")?,
            scenario_regex: Regex::new(r"(?i)^scenario(?:\s+outline)?:\s*(.+)$")?,
            section_ac_regex: Regex::new(r"(?i)^acceptance\s+criteria:")?,
            section_bdd_regex: Regex::new(r"(?i)^bdd\s+steps:")?,
            examples_regex: Regex::new(r"(?i)^examples:\s*$")?,
            as_a_regex: Regex::new(r"(?i)^as\s+an?\s+(.+)$")?,
            i_want_regex: Regex::new(r"(?i)^i\s+want\s+(.+)$")?,
            so_that_regex: Regex::new(r"(?i)^so\s+that\s+(.+)$")?,
            button_regex: Regex::new(r#"(?i)"([^"]+)"\s+button"#)?,
            link_regex: Regex::new(r#"(?i)"([^"]+)"\s+link"#)?,
            page_regex: Regex::new(r#"(?i)"([^"]+)"\s+page"#)?,
            title_abbrev_regex: Regex::new(r"\(([A-Z][A-Z0-9]{1,9})\)")?,
            html_comment_regex: Regex::new(r"(?s)<!--.*?-->")?,
            generation: generation.clone(),
        })
    }

    /// Parse a requirement document. `source_name` is the document's file
    /// name (or any stable label); it drives the artifact base name.
    pub fn parse(&self, raw_text: &str, source_name: &str) -> ParsedRequirement {
        let cleaned = self.strip_boilerplate(raw_text);

        let mut title: Option<String> = None;
        let mut user_story = UserStory::default();
        let mut scenarios: Vec<Scenario> = Vec::new();
        let mut acceptance_criteria: Vec<String> = Vec::new();
        let mut examples_table: Option<Vec<String>> = None;
        let mut mode = SectionMode::Prose;

        let lines: Vec<&str> = cleaned.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;

            if line.is_empty() {
                continue;
            }

            // Section headers switch the active bucket.
            if self.section_bdd_regex.is_match(line) {
                mode = SectionMode::BddSteps;
                continue;
            }
            if self.section_ac_regex.is_match(line) {
                mode = SectionMode::AcceptanceCriteria;
                continue;
            }

            // Title: first heading or `Title:` line wins.
            if title.is_none() {
                if let Some(caps) = self
                    .heading_regex
                    .captures(line)
                    .or_else(|| self.title_regex.captures(line))
                {
                    title = Some(caps[1].trim().to_string());
                    continue;
                }
            }

            // User story fragments can appear anywhere.
            if let Some(caps) = self.as_a_regex.captures(line) {
                user_story.as_a = caps[1].trim().to_string();
                continue;
            }
            if let Some(caps) = self.i_want_regex.captures(line) {
                user_story.i_want = caps[1].trim().to_string();
                continue;
            }
            if let Some(caps) = self.so_that_regex.captures(line) {
                user_story.so_that = caps[1].trim().to_string();
                continue;
            }

            // Scenario headers open a new step bucket.
            if let Some(caps) = self.scenario_regex.captures(line) {
                scenarios.push(Scenario {
                    name: caps[1].trim().to_string(),
                    steps: Vec::new(),
                });
                continue;
            }

            // Examples table: contiguous `|` lines after an `Examples:` line;
            // needs at least a header and one data row to count.
            if self.examples_regex.is_match(line) {
                let mut block = Vec::new();
                while i < lines.len() && lines[i].contains('|') {
                    block.push(lines[i].trim().to_string());
                    i += 1;
                }
                if block.len() >= 2 {
                    examples_table = Some(block);
                } else {
                    debug!("Dropping malformed Examples block ({} rows)", block.len());
                }
                continue;
            }

            // Step lines are recognized anywhere, regardless of section.
            if let Some(step) = self.parse_step_line(line) {
                if scenarios.is_empty() {
                    let name = title
                        .clone()
                        .unwrap_or_else(|| self.generation.default_title.clone());
                    scenarios.push(Scenario {
                        name,
                        steps: Vec::new(),
                    });
                }
                if let Some(current) = scenarios.last_mut() {
                    current.steps.push(step);
                }
                continue;
            }

            // Anything unrecognized outside a BDD section is criteria prose.
            if mode != SectionMode::BddSteps {
                acceptance_criteria.push(line.to_string());
            }
        }

        let title = title.unwrap_or_else(|| self.generation.default_title.clone());
        let tags = self.derive_tags(&title);
        let ui_elements = self.extract_ui_elements(&cleaned);
        let identity = self.derive_identity(source_name, &title);

        ParsedRequirement {
            title,
            user_story,
            scenarios,
            acceptance_criteria,
            tags,
            ui_elements,
            examples_table,
            identity,
        }
    }

    /// Remove template noise before structural parsing: HTML comments,
    /// emoji-marked instructional lines, known filler phrases.
    fn strip_boilerplate(&self, raw: &str) -> String {
        let without_comments = self.html_comment_regex.replace_all(raw, "");

        without_comments
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                if INSTRUCTIONAL_MARKERS
                    .iter()
                    .any(|m| trimmed.starts_with(m))
                {
                    return false;
                }
                let lower = trimmed.to_lowercase();
                if PLACEHOLDER_LINES.iter().any(|p| lower == *p) {
                    return false;
                }
                if PLACEHOLDER_FRAGMENTS.iter().any(|p| lower.contains(p)) {
                    return false;
                }
                true
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse_step_line(&self, line: &str) -> Option<ScenarioStep> {
        let mut parts = line.splitn(2, char::is_whitespace);
        let keyword = StepKeyword::from_prefix(parts.next()?)?;
        let text = parts.next()?.trim();
        if text.is_empty() {
            return None;
        }
        Some(ScenarioStep {
            keyword,
            text: text.to_string(),
        })
    }

    fn derive_tags(&self, title: &str) -> Vec<String> {
        let mut tags: Vec<String> = self.generation.base_tags.clone();
        for caps in self.title_abbrev_regex.captures_iter(title) {
            let tag = format!("@{}", &caps[1]);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    fn extract_ui_elements(&self, text: &str) -> UiElements {
        let mut elements = UiElements::default();
        for caps in self.button_regex.captures_iter(text) {
            push_unique(&mut elements.buttons, caps[1].trim());
        }
        for caps in self.link_regex.captures_iter(text) {
            push_unique(&mut elements.links, caps[1].trim());
        }
        for caps in self.page_regex.captures_iter(text) {
            push_unique(&mut elements.pages, caps[1].trim());
        }
        elements
    }

    /// The artifact base name comes from the document name with known
    /// prefixes stripped; the title is only a fallback. Computed exactly
    /// once here and threaded through every renderer via the identity.
    fn derive_identity(&self, source_name: &str, title: &str) -> ArtifactIdentity {
        let stem = Path::new(source_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut stripped = stem.as_str();
        loop {
            let lower = stripped.to_lowercase();
            let mut changed = false;
            for prefix in &self.generation.strip_prefixes {
                if lower.starts_with(&prefix.to_lowercase()) {
                    stripped = &stripped[prefix.len()..];
                    changed = true;
                    break;
                }
            }
            if !changed {
                break;
            }
        }

        let base = to_kebab_case(stripped);
        if base.is_empty() {
            ArtifactIdentity::derive(title)
        } else {
            ArtifactIdentity::derive(&base)
        }
    }
}

fn push_unique(bucket: &mut Vec<String>, value: &str) {
    if !bucket.iter().any(|v| v == value) {
        bucket.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn parser() -> RequirementParser {
        RequirementParser::new(&Config::default().generation).unwrap()
    }

    const SAMPLE: &str = r#"# Employee Profile Update (EPU)

As a payroll admin
I want to update employee profiles
So that records stay accurate

Acceptance Criteria:
Profile changes must be audited
Only admins may edit salary fields

BDD Steps:
Scenario: Update an employee profile
Given Alex is on the "Employee Profile" page
When Alex clicks "Edit" button
And Alex clicks "Details" link
Then Alex verifies "Save" button is visible
"#;

    #[test]
    fn parses_title_story_and_sections() {
        let req = parser().parse(SAMPLE, "story-employee-profile.md");

        assert_eq!(req.title, "Employee Profile Update (EPU)");
        assert_eq!(req.user_story.as_a, "payroll admin");
        assert_eq!(req.user_story.i_want, "to update employee profiles");
        assert_eq!(req.acceptance_criteria.len(), 2);
        assert_eq!(req.scenarios.len(), 1);
        assert_eq!(req.scenarios[0].name, "Update an employee profile");
        assert_eq!(req.scenarios[0].steps.len(), 4);
        assert_eq!(req.scenarios[0].steps[0].keyword, StepKeyword::Given);
        assert_eq!(req.scenarios[0].steps[3].keyword, StepKeyword::Then);
    }

    #[test]
    fn extracts_tags_and_ui_elements() {
        let req = parser().parse(SAMPLE, "story-employee-profile.md");

        assert!(req.tags.contains(&"@EPU".to_string()));
        assert!(req.tags.contains(&"@Generated".to_string()));
        assert_eq!(req.ui_elements.buttons, vec!["Edit", "Save"]);
        assert_eq!(req.ui_elements.links, vec!["Details"]);
        assert_eq!(req.ui_elements.pages, vec!["Employee Profile"]);
    }

    #[test]
    fn file_name_strips_prefix_and_is_kebab() {
        let req = parser().parse(SAMPLE, "story-Employee Profile.md");
        assert_eq!(req.identity.file_base_name, "employee-profile");
        assert_eq!(req.identity.class_name, "EmployeeProfilePage");
    }

    #[test]
    fn steps_without_scenario_header_open_implicit_scenario() {
        let text = "# Login\n\nBDD Steps:\nGiven Alex is on the login page\nWhen Alex submits credentials\n";
        let req = parser().parse(text, "login.md");
        assert_eq!(req.scenarios.len(), 1);
        assert_eq!(req.scenarios[0].name, "Login");
        assert_eq!(req.scenarios[0].steps.len(), 2);
    }

    #[test]
    fn missing_title_defaults_to_placeholder() {
        let req = parser().parse("Given something happens\n", "doc.md");
        assert_eq!(req.title, "Untitled Requirement");
    }

    #[test]
    fn examples_block_requires_header_and_row() {
        let valid = "# T\nBDD Steps:\nGiven a <role> user\nExamples:\n| role |\n| admin |\n";
        let req = parser().parse(valid, "t.md");
        let table = req.examples_table.expect("table parsed");
        assert_eq!(table, vec!["| role |", "| admin |"]);

        let invalid = "# T\nExamples:\n| role |\n";
        let req = parser().parse(invalid, "t.md");
        assert!(req.examples_table.is_none());
    }

    #[test]
    fn boilerplate_is_stripped_before_parsing() {
        let text = "<!-- template instructions\nGiven hidden step -->\n# Real Title\n📝 Fill in the sections below\nTBD\nGiven a visible step\n";
        let req = parser().parse(text, "doc.md");
        assert_eq!(req.title, "Real Title");
        assert_eq!(req.step_count(), 1);
        assert_eq!(req.scenarios[0].steps[0].text, "a visible step");
        assert!(req.acceptance_criteria.is_empty());
    }

    #[test]
    fn step_lines_outside_bdd_section_are_still_steps() {
        let text = "# T\nSome prose first\nWhen Alex clicks \"Run\" button\n";
        let req = parser().parse(text, "t.md");
        assert_eq!(req.step_count(), 1);
        assert_eq!(req.acceptance_criteria, vec!["Some prose first"]);
    }
}
