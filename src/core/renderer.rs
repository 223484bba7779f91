use regex::Regex;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::GenerationConfig;
use crate::error::{Result, StepsmithError};

use super::analyzer::{Recommendation, RequirementAnalysis};
use super::naming::{to_kebab_case, to_method_name, to_pascal_case};
use super::registry::StepRecord;
use super::requirement::{ArtifactIdentity, ParsedRequirement, StepKeyword};

const FEATURE_TEMPLATE: &str = "\
{{ tags }}
Feature: {{ title }}

  As a {{ story.as_a }}
  I want {{ story.i_want }}
  So that {{ story.so_that }}

  Background:
{% for line in background %}    {{ line }}
{% endfor %}{% for scenario in scenarios %}
  {% if scenario.outline %}Scenario Outline:{% else %}Scenario:{% endif %} {{ scenario.name }}
{% for step in scenario.steps %}    {{ step.keyword }} {{ step.text }}
{% endfor %}{% if scenario.examples %}
    Examples:
{% for row in scenario.examples %}      {{ row }}
{% endfor %}{% endif %}{% endfor %}";

const STEPS_TEMPLATE: &str = "\
const { assert } = require('chai');
const { Given, When, Then } = require('@cucumber/cucumber');
const {{ class_name }} = require('{{ page_import }}');
{% for entry in entries %}
{% if entry.reused %}// Covered by an existing definition in {{ entry.source }}:
//   {{ entry.keyword }}('{{ entry.text }}')
{% else %}{{ entry.keyword }}('{{ entry.text }}', async function () {
{{ entry.body }}
});
{% endif %}{% endfor %}";

const PAGE_TEMPLATE: &str = "\
const BasePage = require('./base-page');

{% for locator in locators %}const {{ locator.name }} = \"{{ locator.selector }}\";
{% endfor %}
class {{ class_name }} extends BasePage {
  constructor(page) {
    super(page);
    this.page = page;
  }
{% for method in methods %}
  async {{ method.name }}() {
{{ method.body }}
  }
{% endfor %}}

module.exports = {{ class_name }};
";

/// The three coupled artifacts plus the shared identifiers that must appear
/// consistently across all of them.
#[derive(Debug, Clone)]
pub struct GeneratedArtifactSet {
    pub feature_text: String,
    pub steps_text: String,
    pub page_text: String,
    pub class_name: String,
    pub file_base_name: String,
}

impl GeneratedArtifactSet {
    pub fn feature_file_name(&self) -> String {
        format!("{}.feature", self.file_base_name)
    }

    pub fn steps_file_name(&self) -> String {
        format!("{}-steps.js", self.file_base_name)
    }

    pub fn page_file_name(&self) -> String {
        format!("{}-page.js", self.file_base_name)
    }
}

// Template context models. Identifiers flow into these only from the single
// ArtifactIdentity, never re-derived per artifact.

#[derive(Serialize)]
struct StoryModel {
    as_a: String,
    i_want: String,
    so_that: String,
}

#[derive(Serialize)]
struct StepLineModel {
    keyword: &'static str,
    text: String,
}

#[derive(Serialize)]
struct ScenarioModel {
    name: String,
    outline: bool,
    steps: Vec<StepLineModel>,
    examples: Vec<String>,
}

#[derive(Serialize)]
struct StepEntryModel {
    reused: bool,
    keyword: &'static str,
    text: String,
    body: String,
    source: String,
}

#[derive(Serialize)]
struct LocatorModel {
    name: String,
    selector: String,
}

#[derive(Serialize)]
struct MethodModel {
    name: String,
    body: String,
}

/// Renders a `ParsedRequirement` plus its reuse analysis into the coupled
/// feature / steps / page triple.
pub struct ArtifactRenderer {
    tera: Tera,
    generation: GenerationConfig,
    click_regex: Regex,
    verify_regex: Regex,
    displayed_regex: Regex,
    navigate_regex: Regex,
}

impl ArtifactRenderer {
    pub fn new(generation: &GenerationConfig) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("feature", FEATURE_TEMPLATE)?;
        tera.add_raw_template("steps", STEPS_TEMPLATE)?;
        tera.add_raw_template("page", PAGE_TEMPLATE)?;

        Ok(Self {
            tera,
            generation: generation.clone(),
            click_regex: Regex::new(
                r#"(?i)clicks?(?:\s+on)?(?:\s+the)?\s+"([^"]+)"(?:\s+(button|link))?"#,
            )?,
            verify_regex: Regex::new(r#"(?i)verif(?:y|ies)(?:\s+that)?\s+"([^"]+)""#)?,
            displayed_regex: Regex::new(r#"(?i)"([^"]+)"(?:\s+\w+)?\s+is\s+(?:displayed|visible)"#)?,
            navigate_regex: Regex::new(r#"(?i)navigates?\s+to\s+(?:the\s+)?"?([^"]+?)"?\s*$"#)?,
        })
    }

    /// Render all three artifacts. Missing fields get defaults; an empty
    /// artifact identity is the one fatal condition, because every
    /// cross-file reference depends on it.
    pub fn render(
        &self,
        req: &ParsedRequirement,
        analysis: &RequirementAnalysis,
    ) -> Result<GeneratedArtifactSet> {
        let identity = &req.identity;
        if identity.is_empty() {
            return Err(StepsmithError::Renderer(
                "artifact identity has an empty file base name".to_string(),
            ));
        }

        let feature_text = self.render_feature(req)?;
        let (steps_text, referenced_methods) = self.render_steps(req, analysis, identity)?;
        let page_text = self.render_page(req, identity, &referenced_methods)?;

        Ok(GeneratedArtifactSet {
            feature_text,
            steps_text,
            page_text,
            class_name: identity.class_name.clone(),
            file_base_name: identity.file_base_name.clone(),
        })
    }

    fn render_feature(&self, req: &ParsedRequirement) -> Result<String> {
        let mut scenarios: Vec<ScenarioModel> = req
            .scenarios
            .iter()
            .map(|scenario| ScenarioModel {
                name: scenario.name.clone(),
                outline: false,
                steps: scenario
                    .steps
                    .iter()
                    .map(|step| StepLineModel {
                        keyword: step.keyword.as_str(),
                        text: step.text.clone(),
                    })
                    .collect(),
                examples: Vec::new(),
            })
            .collect();

        // Scenarios may legitimately be absent (a criteria-only document);
        // the feature still needs one block to hang the workflow on.
        if scenarios.is_empty() {
            scenarios.push(ScenarioModel {
                name: req.title.clone(),
                outline: false,
                steps: Vec::new(),
                examples: Vec::new(),
            });
        }

        // A parsed Examples table attaches to the final scenario, which
        // then renders as a Scenario Outline.
        if let Some(table) = &req.examples_table {
            if let Some(last) = scenarios.last_mut() {
                last.outline = true;
                last.examples = table.clone();
            }
        }

        let mut context = Context::new();
        context.insert("tags", &req.tags.join(" "));
        context.insert("title", &req.title);
        context.insert(
            "story",
            &StoryModel {
                as_a: req.user_story.as_a.clone(),
                i_want: req.user_story.i_want.clone(),
                so_that: req.user_story.so_that.clone(),
            },
        );
        context.insert("background", &self.generation.background_steps);
        context.insert("scenarios", &scenarios);

        Ok(self.tera.render("feature", &context)?)
    }

    /// Render the steps file and collect every page-object method it calls,
    /// so the page renderer can guarantee none of them dangle.
    fn render_steps(
        &self,
        req: &ParsedRequirement,
        analysis: &RequirementAnalysis,
        identity: &ArtifactIdentity,
    ) -> Result<(String, Vec<String>)> {
        let mut entries: Vec<StepEntryModel> = Vec::new();
        let mut referenced: Vec<String> = Vec::new();
        let mut emitted_texts: std::collections::HashSet<String> = std::collections::HashSet::new();

        // Cucumber-js has no And(); an And step registers under the keyword
        // of the step it continues.
        let mut effective = StepKeyword::Given;

        let call_regex = Regex::new(&format!(
            r"new\s+{}\(this\.page\)\.(\w+)\s*\(",
            regex::escape(&identity.class_name)
        ))?;

        for step in req.steps() {
            if step.keyword != StepKeyword::And {
                effective = step.keyword;
            }
            if !emitted_texts.insert(step.text.clone()) {
                continue;
            }

            let decision = if analysis.adaptive {
                analysis.decision_for(&step.text)
            } else {
                None
            };

            let best = decision.and_then(|d| d.best_match().map(|m| (d.recommendation, m)));
            let entry = match best {
                Some((Recommendation::UseExistingExact, m))
                | Some((Recommendation::UseExistingSimilar, m)) => StepEntryModel {
                    reused: true,
                    keyword: effective.as_str(),
                    text: escape_js(&step.text),
                    body: String::new(),
                    source: m.record.import_path.clone(),
                },
                Some((Recommendation::AdaptExisting, m)) => {
                    let body = self.adapt_implementation(&m.record, identity);
                    for caps in call_regex.captures_iter(&body) {
                        push_unique(&mut referenced, &caps[1]);
                    }
                    StepEntryModel {
                        reused: false,
                        keyword: effective.as_str(),
                        text: escape_js(&step.text),
                        body,
                        source: String::new(),
                    }
                }
                _ => {
                    let method = self.derive_method_name(&step.text);
                    push_unique(&mut referenced, &method);
                    StepEntryModel {
                        reused: false,
                        keyword: effective.as_str(),
                        text: escape_js(&step.text),
                        body: format!(
                            "  await new {}(this.page).{}();",
                            identity.class_name, method
                        ),
                        source: String::new(),
                    }
                }
            };
            entries.push(entry);
        }

        let mut context = Context::new();
        context.insert("class_name", &identity.class_name);
        context.insert("page_import", &identity.page_import_path());
        context.insert("entries", &entries);

        let text = self.tera.render("steps", &context)?;
        Ok((text, referenced))
    }

    fn render_page(
        &self,
        req: &ParsedRequirement,
        identity: &ArtifactIdentity,
        referenced_methods: &[String],
    ) -> Result<String> {
        let mut locators: Vec<LocatorModel> = vec![
            LocatorModel {
                name: "PAGE_TITLE".to_string(),
                selector: "[data-test-id='page-title']".to_string(),
            },
            LocatorModel {
                name: "MAIN_CONTENT".to_string(),
                selector: "[data-test-id='main-content']".to_string(),
            },
        ];
        let mut methods: Vec<MethodModel> = Vec::new();
        let mut method_names: std::collections::HashSet<String> = std::collections::HashSet::new();

        let mut add_method = |methods: &mut Vec<MethodModel>,
                              names: &mut std::collections::HashSet<String>,
                              name: String,
                              body: String| {
            if names.insert(name.clone()) {
                methods.push(MethodModel { name, body });
            }
        };

        for button in &req.ui_elements.buttons {
            let locator = locator_name(button, "BUTTON");
            locators.push(LocatorModel {
                name: locator.clone(),
                selector: format!("//button[contains(text(), '{}')]", button),
            });
            let pascal = to_pascal_case(button);
            add_method(
                &mut methods,
                &mut method_names,
                format!("click{}", pascal),
                format!("    await this.page.click({});", locator),
            );
            add_method(
                &mut methods,
                &mut method_names,
                format!("verify{}IsVisible", pascal),
                format!("    return await this.page.isVisible({});", locator),
            );
        }

        for link in &req.ui_elements.links {
            let locator = locator_name(link, "LINK");
            locators.push(LocatorModel {
                name: locator.clone(),
                selector: format!("//a[contains(text(), '{}')]", link),
            });
            let pascal = to_pascal_case(link);
            add_method(
                &mut methods,
                &mut method_names,
                format!("click{}Link", pascal),
                format!("    await this.page.click({});", locator),
            );
            add_method(
                &mut methods,
                &mut method_names,
                format!("verify{}LinkIsVisible", pascal),
                format!("    return await this.page.isVisible({});", locator),
            );
        }

        for page in &req.ui_elements.pages {
            let locator = locator_name(page, "PAGE");
            locators.push(LocatorModel {
                name: locator.clone(),
                selector: format!("[data-test-id='{}-page']", to_kebab_case(page)),
            });
            let pascal = to_pascal_case(page);
            add_method(
                &mut methods,
                &mut method_names,
                format!("verify{}PageIsVisible", pascal),
                format!("    return await this.page.isVisible({});", locator),
            );
        }

        // Every method the steps file calls must exist here, stubbed when
        // nothing better is known.
        for method in referenced_methods {
            if method.is_empty() {
                continue;
            }
            add_method(
                &mut methods,
                &mut method_names,
                method.clone(),
                format!(
                    "    // TODO: replace this stub with the real page interaction\n    throw new Error('{} is pending implementation');",
                    method
                ),
            );
        }

        // Two elements can normalize to the same locator name; the first wins.
        let mut seen_locators: std::collections::HashSet<String> =
            std::collections::HashSet::new();
        locators.retain(|l| seen_locators.insert(l.name.clone()));

        let mut context = Context::new();
        context.insert("class_name", &identity.class_name);
        context.insert("locators", &locators);
        context.insert("methods", &methods);

        Ok(self.tera.render("page", &context)?)
    }

    /// Deterministic method name for a create-new step. Recognized action
    /// shapes get purpose-built names; everything else goes through the
    /// generic naming deriver with the actor stripped.
    fn derive_method_name(&self, step_text: &str) -> String {
        let stripped = self.strip_actor(step_text);

        if let Some(caps) = self.click_regex.captures(stripped) {
            let pascal = to_pascal_case(&caps[1]);
            let suffix = caps.get(2).map(|m| m.as_str().to_lowercase());
            return match suffix.as_deref() {
                Some("link") => format!("click{}Link", pascal),
                _ => format!("click{}", pascal),
            };
        }
        if let Some(caps) = self
            .verify_regex
            .captures(stripped)
            .or_else(|| self.displayed_regex.captures(stripped))
        {
            return format!("verify{}IsVisible", to_pascal_case(&caps[1]));
        }
        if let Some(caps) = self.navigate_regex.captures(stripped) {
            return format!("navigateTo{}", to_pascal_case(&caps[1]));
        }

        to_method_name(stripped)
    }

    fn strip_actor<'a>(&self, text: &'a str) -> &'a str {
        let lower = text.to_lowercase();
        for actor in &self.generation.actor_names {
            let prefix = format!("{} ", actor.to_lowercase());
            if lower.starts_with(&prefix) {
                return text[actor.len()..].trim_start();
            }
        }
        text
    }

    /// Clone a matched implementation and rename its page-object identifiers
    /// to the new context. Substitutions are bounded to the class name and
    /// the page import base derived from the record's source file.
    fn adapt_implementation(&self, record: &StepRecord, identity: &ArtifactIdentity) -> String {
        let source_base = record
            .source_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let source_base = source_base
            .strip_suffix("-steps")
            .or_else(|| source_base.strip_suffix("-step"))
            .unwrap_or(&source_base)
            .to_string();

        let old_class = format!("{}Page", to_pascal_case(&source_base));
        let old_page_base = format!("{}-page", source_base);
        let new_page_base = format!("{}-page", identity.file_base_name);

        let substituted = record
            .implementation
            .replace(&old_class, &identity.class_name)
            .replace(&old_page_base, &new_page_base);

        substituted
            .lines()
            .map(|line| format!("  {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Methods invoked on the page class within a steps file. Shared with the
/// validator so both sides agree on what "referenced" means.
pub(crate) fn called_page_methods(steps_text: &str, class_name: &str) -> Vec<String> {
    let Ok(regex) = Regex::new(&format!(
        r"new\s+{}\(this\.page\)\.(\w+)\s*\(",
        regex::escape(class_name)
    )) else {
        return Vec::new();
    };
    let mut methods = Vec::new();
    for caps in regex.captures_iter(steps_text) {
        push_unique(&mut methods, &caps[1]);
    }
    methods
}

/// Methods defined on a rendered page object.
pub(crate) fn defined_page_methods(page_text: &str) -> Vec<String> {
    let Ok(regex) = Regex::new(r"(?m)^\s*async\s+(\w+)\s*\(") else {
        return Vec::new();
    };
    let mut methods = Vec::new();
    for caps in regex.captures_iter(page_text) {
        push_unique(&mut methods, &caps[1]);
    }
    methods
}

fn locator_name(element: &str, suffix: &str) -> String {
    let base = to_kebab_case(element).replace('-', "_").to_uppercase();
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{}_{}", base, suffix)
    }
}

fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

fn push_unique(bucket: &mut Vec<String>, value: &str) {
    if !bucket.iter().any(|v| v == value) {
        bucket.push(value.to_string());
    }
}
