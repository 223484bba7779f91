use regex::Regex;

use crate::error::Result;

use super::renderer::{called_page_methods, defined_page_methods, GeneratedArtifactSet};

/// Outcome of a cross-artifact consistency check. Errors are referential
/// breaks that would fail at runtime; warnings are oddities worth a look.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks that a rendered triple agrees with itself: the steps file imports
/// the right page module, instantiates the right class, and calls only
/// methods the page object actually defines.
pub struct ArtifactValidator {
    import_regex: Regex,
    instantiation_regex: Regex,
    class_decl_regex: Regex,
    export_regex: Regex,
}

impl ArtifactValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            import_regex: Regex::new(r"require\('\.\./pages/([\w-]+)'\)")?,
            instantiation_regex: Regex::new(r"new\s+(\w+)\(this\.page\)")?,
            class_decl_regex: Regex::new(r"class\s+(\w+)\s+extends")?,
            export_regex: Regex::new(r"module\.exports\s*=\s*(\w+);")?,
        })
    }

    pub fn validate(&self, set: &GeneratedArtifactSet) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.check_import(set, &mut result);
        self.check_class_names(set, &mut result);
        self.check_method_coverage(set, &mut result);

        if !set.feature_text.contains("Scenario") {
            result
                .warnings
                .push("feature file contains no scenario block".to_string());
        }

        result
    }

    fn check_import(&self, set: &GeneratedArtifactSet, result: &mut ValidationResult) {
        let expected = format!("{}-page", set.file_base_name);
        match self.import_regex.captures(&set.steps_text) {
            Some(caps) if caps[1] == expected => {}
            Some(caps) => result.errors.push(format!(
                "steps file imports '../pages/{}' but the page artifact is '{}'",
                &caps[1], expected
            )),
            None => result
                .errors
                .push("steps file has no page-object import".to_string()),
        }
    }

    fn check_class_names(&self, set: &GeneratedArtifactSet, result: &mut ValidationResult) {
        for caps in self.instantiation_regex.captures_iter(&set.steps_text) {
            if caps[1] != set.class_name {
                result.errors.push(format!(
                    "steps file instantiates '{}' instead of '{}'",
                    &caps[1], set.class_name
                ));
            }
        }

        match self.class_decl_regex.captures(&set.page_text) {
            Some(caps) if caps[1] == set.class_name => {}
            Some(caps) => result.errors.push(format!(
                "page file declares class '{}' instead of '{}'",
                &caps[1], set.class_name
            )),
            None => result
                .errors
                .push("page file declares no class".to_string()),
        }

        match self.export_regex.captures(&set.page_text) {
            Some(caps) if caps[1] == set.class_name => {}
            Some(caps) => result.errors.push(format!(
                "page file exports '{}' instead of '{}'",
                &caps[1], set.class_name
            )),
            None => result
                .errors
                .push("page file exports nothing".to_string()),
        }
    }

    fn check_method_coverage(&self, set: &GeneratedArtifactSet, result: &mut ValidationResult) {
        let called = called_page_methods(&set.steps_text, &set.class_name);
        let defined = defined_page_methods(&set.page_text);

        for method in &called {
            if !defined.contains(method) {
                result.errors.push(format!(
                    "steps file calls '{}' which '{}' does not define",
                    method, set.class_name
                ));
            }
        }

        if called.is_empty() && set.steps_text.contains("async function") {
            result
                .warnings
                .push("steps file defines steps but never touches the page object".to_string());
        }
    }
}
