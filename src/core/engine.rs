use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::Config;

use super::{
    ArtifactRenderer, ArtifactValidator, ArtifactWriter, PatternRegistry, RequirementParser,
    ReusabilityAnalyzer,
};

/// Main orchestration engine: requirement text in, consistent artifact
/// triple plus analysis report out.
pub struct Engine {
    config: Config,
    parser: RequirementParser,
    analyzer: ReusabilityAnalyzer,
    renderer: ArtifactRenderer,
    validator: ArtifactValidator,
}

impl Engine {
    /// Create a new engine instance from an optional config file.
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        let parser = RequirementParser::new(&config.generation)?;
        let analyzer = ReusabilityAnalyzer::new(&config.analysis);
        let renderer = ArtifactRenderer::new(&config.generation)?;
        let validator = ArtifactValidator::new()?;

        Ok(Self {
            config,
            parser,
            analyzer,
            renderer,
            validator,
        })
    }

    /// Scaffold a project: default config file plus the registry and output
    /// directories it points at.
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let root = path.unwrap_or_else(|| PathBuf::from("."));
        let config_path = root.join("Stepsmith.toml");

        if config_path.exists() && !force {
            warn!(
                "{} already exists, keeping it (use --force to overwrite)",
                config_path.display()
            );
        } else {
            tokio::fs::create_dir_all(&root).await?;
            Config::default().save(&config_path)?;
            info!("📝 Wrote default configuration to {}", config_path.display());
        }

        for dir in [
            root.join(&self.config.project.registry_dir),
            root.join(&self.config.project.output_dir),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
            info!("📁 Ensured {}", dir.display());
        }

        info!("🎉 Project initialized at {}", root.display());
        Ok(())
    }

    /// Scan the registry directory and report what it knows.
    pub async fn scan(&self, registry_dir: Option<PathBuf>) -> Result<()> {
        let root = registry_dir.unwrap_or_else(|| self.config.project.registry_dir.clone());

        info!("🔎 Scanning step definitions under {}", root.display());
        let registry = PatternRegistry::build(&root, &self.config.registry)?;

        let stats = registry.stats();
        info!(
            "📊 {} step(s) from {} file(s) ({} skipped, {} background)",
            stats.records, stats.files_scanned, stats.files_skipped, stats.background_steps
        );
        println!("{}", serde_json::to_string_pretty(stats)?);
        Ok(())
    }

    /// Analyze a requirement against the registry without writing artifacts.
    /// The JSON report goes to stdout, or to `report` when given.
    pub async fn analyze(
        &self,
        input: PathBuf,
        registry_dir: Option<PathBuf>,
        report: Option<PathBuf>,
    ) -> Result<()> {
        let (req, registry) = self.load_inputs(&input, registry_dir).await?;
        let analysis = self.analyzer.analyze_requirement(&req, &registry);

        info!(
            "📊 Reusability {:.1}% over {} step(s)",
            analysis.reusability_score,
            analysis.steps.len()
        );

        let json = serde_json::to_string_pretty(&analysis)?;
        match report {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &json).await?;
                info!("Report written to {}", path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    }

    /// Full pipeline: parse, analyze, render, validate, write.
    pub async fn generate(
        &self,
        input: PathBuf,
        output: Option<PathBuf>,
        registry_dir: Option<PathBuf>,
        force: bool,
    ) -> Result<()> {
        let output_dir = output.unwrap_or_else(|| self.config.project.output_dir.clone());
        let (req, registry) = self.load_inputs(&input, registry_dir).await?;

        let analysis = self.analyzer.analyze_requirement(&req, &registry);
        if analysis.adaptive {
            info!(
                "♻️ Reusability {:.1}%: adapting existing step patterns",
                analysis.reusability_score
            );
        } else {
            info!(
                "🆕 Reusability {:.1}% below the {:.0}% floor: generating everything fresh",
                analysis.reusability_score, self.config.analysis.adaptive_floor
            );
        }

        let set = self.renderer.render(&req, &analysis)?;

        let validation = self.validator.validate(&set);
        for warning in &validation.warnings {
            warn!("{}", warning);
        }
        if !validation.is_valid() {
            for e in &validation.errors {
                error!("{}", e);
            }
            anyhow::bail!("generated artifacts failed consistency validation");
        }

        let writer = ArtifactWriter::new(&output_dir);
        let written = writer.write_set(&set, force)?;
        info!("📝 Wrote {} artifact(s):", written.len());
        for path in &written {
            info!("  - {}", path.display());
        }

        let report_path = output_dir.join(format!("{}-analysis.json", set.file_base_name));
        tokio::fs::write(&report_path, serde_json::to_string_pretty(&analysis)?).await?;
        info!("📊 Analysis report: {}", report_path.display());

        info!("🎉 Generation complete for '{}'", req.title);
        Ok(())
    }

    /// Regenerate in memory and run the consistency checks, without touching
    /// the output directory.
    pub async fn validate(&self, input: PathBuf, registry_dir: Option<PathBuf>) -> Result<()> {
        let (req, registry) = self.load_inputs(&input, registry_dir).await?;
        let analysis = self.analyzer.analyze_requirement(&req, &registry);
        let set = self.renderer.render(&req, &analysis)?;

        let result = self.validator.validate(&set);
        for warning in &result.warnings {
            warn!("{}", warning);
        }
        if !result.is_valid() {
            for e in &result.errors {
                error!("{}", e);
            }
            anyhow::bail!("artifacts for '{}' are not internally consistent", req.title);
        }

        info!(
            "✅ '{}' renders to a consistent artifact triple ({} steps)",
            req.title,
            req.step_count()
        );
        Ok(())
    }

    async fn load_inputs(
        &self,
        input: &Path,
        registry_dir: Option<PathBuf>,
    ) -> Result<(super::ParsedRequirement, PatternRegistry)> {
        info!("📄 Reading requirement from {}", input.display());
        let raw = tokio::fs::read_to_string(input).await?;
        let source_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let req = self.parser.parse(&raw, &source_name);
        info!(
            "Parsed '{}': {} scenario(s), {} step(s), {} criteria",
            req.title,
            req.scenarios.len(),
            req.step_count(),
            req.acceptance_criteria.len()
        );

        let registry_root =
            registry_dir.unwrap_or_else(|| self.config.project.registry_dir.clone());
        let registry = PatternRegistry::build(&registry_root, &self.config.registry)?;
        info!(
            "🔎 Registry: {} known step(s) from {} file(s)",
            registry.len(),
            registry.stats().files_scanned
        );

        Ok((req, registry))
    }
}
