use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::error::Result;

use super::requirement::StepKeyword;

/// Action vocabulary indexed as standalone search keys when present.
const ACTION_WORDS: &[&str] = &[
    "click", "verify", "login", "navigate", "upload", "download", "fill", "submit", "switch",
];

/// Articles/prepositions removed for the de-worded search key.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "in", "on", "at", "for", "with", "is", "are", "and", "that",
];

/// Semantic category a step can belong to. Membership tests are independent,
/// so one step can carry several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Login,
    Navigation,
    Verification,
    Interaction,
    DataEntry,
    Upload,
    EmployeeManagement,
    Payroll,
}

impl StepCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepCategory::Login => "login",
            StepCategory::Navigation => "navigation",
            StepCategory::Verification => "verification",
            StepCategory::Interaction => "interaction",
            StepCategory::DataEntry => "data_entry",
            StepCategory::Upload => "upload",
            StepCategory::EmployeeManagement => "employee_management",
            StepCategory::Payroll => "payroll",
        }
    }
}

/// One step declaration extracted from an existing step-definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub keyword: StepKeyword,

    /// The Cucumber expression; may contain `{string}` / `<param>` holes.
    pub text: String,

    /// Function body, kept as a transplant template for adaptation.
    pub implementation: String,

    pub source_file: PathBuf,

    /// Require path relative to the scan root, extension stripped.
    pub import_path: String,

    pub categories: Vec<StepCategory>,

    /// Background preconditions never compete as per-scenario candidates.
    pub is_background: bool,
}

/// Summary counters for the `scan` subcommand.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub records: usize,
    pub background_steps: usize,
    pub category_counts: HashMap<String, usize>,
}

/// A static snapshot of previously written step definitions, indexed under
/// multiple normalized keys so lookups can be fuzzy rather than exact.
/// Built once per generation run and read-only afterwards; the next run
/// rebuilds it wholesale.
pub struct PatternRegistry {
    records: Vec<StepRecord>,
    key_index: HashMap<String, Vec<usize>>,
    stats: RegistryStats,
}

impl PatternRegistry {
    /// Scan `root` for step-definition files. A missing root yields an empty
    /// registry; unreadable or oversized files are skipped with a warning.
    /// Failure in one file never aborts the scan of the rest.
    pub fn build(root: &Path, config: &RegistryConfig) -> Result<Self> {
        let classifier = StepClassifier::new()?;
        let mut registry = Self {
            records: Vec::new(),
            key_index: HashMap::new(),
            stats: RegistryStats::default(),
        };

        if !root.exists() {
            warn!(
                "Registry root {} does not exist; every step will be generated fresh",
                root.display()
            );
            return Ok(registry);
        }

        let mut seen_hashes: HashSet<String> = HashSet::new();
        let walker = WalkBuilder::new(root).hidden(false).git_ignore(true).build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    registry.stats.files_skipped += 1;
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !is_step_file(path, config) {
                continue;
            }

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable step file {}: {}", path.display(), e);
                    registry.stats.files_skipped += 1;
                    continue;
                }
            };

            if content.len() > config.max_file_size {
                warn!(
                    "Skipping oversized step file {} ({} bytes)",
                    path.display(),
                    content.len()
                );
                registry.stats.files_skipped += 1;
                continue;
            }

            let hash = content_hash(&content);
            if !seen_hashes.insert(hash) {
                debug!("Skipping duplicate step file content: {}", path.display());
                continue;
            }

            registry.stats.files_scanned += 1;
            let import_path = derive_import_path(root, path);

            for raw in extract_declarations(&content) {
                let categories = classifier.categorize(&raw.text);
                let is_background = classifier.is_background(&raw.text);
                registry.insert(StepRecord {
                    keyword: raw.keyword,
                    text: raw.text,
                    implementation: raw.implementation,
                    source_file: path.to_path_buf(),
                    import_path: import_path.clone(),
                    categories,
                    is_background,
                });
            }
        }

        registry.finish_stats();
        Ok(registry)
    }

    /// All records whose search keys overlap the query's, deduplicated by
    /// `(source_file, text)`. Similarity ranking is the analyzer's job.
    pub fn lookup(&self, step_text: &str) -> Vec<&StepRecord> {
        let mut indices: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();

        for key in search_keys(step_text) {
            if let Some(hits) = self.key_index.get(&key) {
                for &idx in hits {
                    if seen.insert(idx) {
                        indices.push(idx);
                    }
                }
            }
        }

        let mut dedup: HashSet<(&Path, &str)> = HashSet::new();
        indices
            .into_iter()
            .map(|idx| &self.records[idx])
            .filter(|r| dedup.insert((r.source_file.as_path(), r.text.as_str())))
            .collect()
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    fn insert(&mut self, record: StepRecord) {
        let idx = self.records.len();
        for key in search_keys(&record.text) {
            self.key_index.entry(key).or_default().push(idx);
        }
        self.records.push(record);
    }

    fn finish_stats(&mut self) {
        self.stats.records = self.records.len();
        self.stats.background_steps = self.records.iter().filter(|r| r.is_background).count();
        for record in &self.records {
            for category in &record.categories {
                *self
                    .stats
                    .category_counts
                    .entry(category.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
    }
}

/// Regex-driven semantic classification of step texts.
struct StepClassifier {
    categories: Vec<(StepCategory, Regex)>,
    background: Regex,
}

impl StepClassifier {
    fn new() -> Result<Self> {
        let categories = vec![
            (
                StepCategory::Login,
                Regex::new(r"(?i)(log\s?in|sign\s?in|logged\s?in|credentials|password|authenticat)")?,
            ),
            (
                StepCategory::Navigation,
                Regex::new(r"(?i)(navigat|go(es)?\s+to|opens?\b|\bpage\b|landing)")?,
            ),
            (
                StepCategory::Verification,
                Regex::new(r"(?i)(verif|should|displayed|visible|asserts?\b|checks?\b)")?,
            ),
            (
                StepCategory::Interaction,
                Regex::new(r"(?i)(click|select|choose|press|toggle)")?,
            ),
            (
                StepCategory::DataEntry,
                Regex::new(r"(?i)(enters?\b|types?\b|fills?\b|input)")?,
            ),
            (
                StepCategory::Upload,
                Regex::new(r"(?i)(upload|attach|download)")?,
            ),
            (
                StepCategory::EmployeeManagement,
                Regex::new(r"(?i)(employee|worker|staff|new\s+hire)")?,
            ),
            (
                StepCategory::Payroll,
                Regex::new(r"(?i)(payroll|salary|wage|pay\s?run|compensation|deduction)")?,
            ),
        ];
        let background = Regex::new(
            r"(?i)(is\s+logged\s+in(to)?|logs\s+in\s+to|homepage\s+is\s+(displayed|loaded)|is\s+on\s+the\s+home\s?page|authenticated)",
        )?;
        Ok(Self {
            categories,
            background,
        })
    }

    fn categorize(&self, text: &str) -> Vec<StepCategory> {
        self.categories
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(category, _)| *category)
            .collect()
    }

    fn is_background(&self, text: &str) -> bool {
        self.background.is_match(text)
    }
}

struct RawDeclaration {
    keyword: StepKeyword,
    text: String,
    implementation: String,
}

/// Structural scan for `Keyword('step text', async function(...) { body })`
/// declarations. Any content not matching the shape contributes nothing.
fn extract_declarations(content: &str) -> Vec<RawDeclaration> {
    let mut declarations = Vec::new();
    let chars: Vec<char> = content.chars().collect();

    for keyword_name in ["Given", "When", "Then"] {
        let keyword = match keyword_name {
            "Given" => StepKeyword::Given,
            "When" => StepKeyword::When,
            _ => StepKeyword::Then,
        };

        let mut search_from = 0;
        while let Some(rel) = find_call(&chars, keyword_name, search_from) {
            let after_keyword = rel + keyword_name.len();
            search_from = after_keyword;

            let Some(open_paren) = next_non_ws(&chars, after_keyword) else {
                break;
            };
            if chars[open_paren] != '(' {
                continue;
            }
            let Some(quote_pos) = next_non_ws(&chars, open_paren + 1) else {
                break;
            };
            let quote = chars[quote_pos];
            if quote != '\'' && quote != '"' && quote != '`' {
                continue;
            }
            let Some((text, text_end)) = read_quoted(&chars, quote_pos) else {
                continue;
            };
            let Some((body, body_end)) = read_brace_body(&chars, text_end) else {
                continue;
            };

            declarations.push(RawDeclaration {
                keyword,
                text,
                implementation: body,
            });
            search_from = body_end;
        }
    }

    // Restore document order: steps were collected keyword-by-keyword.
    declarations.sort_by_key(|d| content.find(d.text.as_str()).unwrap_or(usize::MAX));
    declarations
}

/// Find `name` at `from` or later, at a word boundary.
fn find_call(chars: &[char], name: &str, from: usize) -> Option<usize> {
    let name_chars: Vec<char> = name.chars().collect();
    let mut i = from;
    while i + name_chars.len() <= chars.len() {
        if chars[i..i + name_chars.len()] == name_chars[..] {
            let boundary_before = i == 0 || !chars[i - 1].is_alphanumeric();
            let after = i + name_chars.len();
            let boundary_after = after >= chars.len() || !chars[after].is_alphanumeric();
            if boundary_before && boundary_after {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn next_non_ws(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len()).find(|&i| !chars[i].is_whitespace())
}

/// Read a quoted string starting at `quote_pos`; returns the unescaped text
/// and the index just past the closing quote.
fn read_quoted(chars: &[char], quote_pos: usize) -> Option<(String, usize)> {
    let quote = chars[quote_pos];
    let mut text = String::new();
    let mut i = quote_pos + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            text.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == quote {
            return Some((text, i + 1));
        }
        text.push(c);
        i += 1;
    }
    None
}

/// Capture the function body between the first `{` after `from` and its
/// matching `}`, depth-counted and string-aware.
fn read_brace_body(chars: &[char], from: usize) -> Option<(String, usize)> {
    let open = (from..chars.len()).find(|&i| chars[i] == '{')?;
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut i = open;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = in_string {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                in_string = None;
            }
        } else {
            match c {
                '\'' | '"' | '`' => in_string = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String = chars[open + 1..i].iter().collect();
                        return Some((body.trim().to_string(), i + 1));
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Search keys for one step text: verbatim lowercase, de-worded variant,
/// tokens longer than two chars, adjacent bigrams, and any member of the
/// fixed action vocabulary present in the text.
pub fn search_keys(text: &str) -> HashSet<String> {
    let mut keys = HashSet::new();
    let lower = text.to_lowercase();
    keys.insert(lower.clone());

    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let deworded: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| !STOPWORDS.contains(t))
        .collect();
    if !deworded.is_empty() {
        keys.insert(deworded.join(" "));
    }

    for token in &tokens {
        if token.len() > 2 {
            keys.insert((*token).to_string());
        }
    }
    for pair in tokens.windows(2) {
        keys.insert(format!("{} {}", pair[0], pair[1]));
    }
    for action in ACTION_WORDS {
        if tokens.iter().any(|t| t == action) {
            keys.insert((*action).to_string());
        }
    }

    keys
}

fn is_step_file(path: &Path, config: &RegistryConfig) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    config
        .step_file_suffixes
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

fn derive_import_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let trimmed = relative.with_extension("");
    trimmed
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
