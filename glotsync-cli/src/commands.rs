//! Command handlers

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use glotsync_app::adapters::SqliteStore;
use glotsync_app::{AppConfig, AppState, AppStateBuilder};
use glotsync_core::diff;
use glotsync_core::services::GlossaryService;
use glotsync_core::types::{
    CallerIdentity, ChangePatch, DispatchReport, GlossaryRule, Language, Namespace,
    PaginationParams, Project, TargetLanguages, UsageScope, Workspace,
};

use crate::cli::{Cli, Command, GlossaryAddArgs, GlossaryCommand, ScopeKind, SetupArgs};
use crate::model::load_model;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()
            .context("This platform has no config directory; pass --config")?,
    };

    // Commands that never touch the store
    let command = match cli.command {
        Command::InitConfig { force } => return init_config(&config_path, force),
        Command::Diff { old, new } => {
            let patch = diff::diff(&read_tree(&old)?, &read_tree(&new)?);
            tracing::info!("{} change(s)", patch.len());
            return print_json(&patch);
        }
        Command::Apply {
            base,
            patch: patch_path,
        } => {
            let raw = std::fs::read_to_string(&patch_path)
                .with_context(|| format!("Failed to read {}", patch_path.display()))?;
            let patch: ChangePatch = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a change patch", patch_path.display()))?;
            return print_json(&diff::apply(&read_tree(&base)?, &patch));
        }
        other => other,
    };

    let config = AppConfig::load(&config_path)?;
    let identity = cli.org.map(|org| CallerIdentity::new("cli", org));
    let session = Session::open(&config, identity).await?;
    let result = session.execute(command).await;

    // Queued translations run before the process exits
    session.app.drain().await;
    session.log_reports();
    result
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(&AppConfig::default())?;
    std::fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

struct Session {
    app: AppState,
    identity: Option<CallerIdentity>,
    reports: std::sync::Mutex<mpsc::UnboundedReceiver<DispatchReport>>,
}

impl Session {
    async fn open(
        config: &AppConfig,
        identity: Option<CallerIdentity>,
    ) -> anyhow::Result<Self> {
        let db_path = config.database_path();
        let store = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );
        let (sink, reports) = mpsc::unbounded_channel();

        let app = AppStateBuilder::new()
            .config(config)
            .sqlite_store(store)
            .model(load_model(config)?)
            .report_sink(sink)
            .build()?;
        app.run_startup().await?;

        Ok(Self {
            app,
            identity,
            reports: std::sync::Mutex::new(reports),
        })
    }

    async fn execute(&self, command: Command) -> anyhow::Result<()> {
        let app = &self.app;
        match command {
            Command::Setup(args) => self.setup(args).await,
            Command::CreateKey {
                project,
                namespace,
                key,
                text,
            } => {
                self.authorize(&project).await?;
                let namespace_id = self.namespace_id(&project, &namespace).await?;
                let key_id = app
                    .key_store
                    .create_key(&project, &namespace_id, &key, &text)
                    .await?;
                println!("{key_id}");
                Ok(())
            }
            Command::Set {
                key_id,
                language,
                text,
            } => {
                let key = app.key_store.get_key(&key_id).await?;
                self.authorize(&key.project_id).await?;
                let language_id = self.language_id(&key.project_id, &language).await?;
                let updated = app
                    .key_store
                    .update_value(&key_id, &language_id, &text)
                    .await?;
                print_json(&updated)
            }
            Command::Clear { key_id, language } => {
                let key = app.key_store.get_key(&key_id).await?;
                self.authorize(&key.project_id).await?;
                let language_id = self.language_id(&key.project_id, &language).await?;
                let updated = app.key_store.clear_value(&key_id, &language_id).await?;
                print_json(&updated)
            }
            Command::Delete { key_ids } => {
                if self.identity.is_some() {
                    for key in app.ctx.key_repository().find_by_ids(&key_ids).await? {
                        self.authorize(&key.project_id).await?;
                    }
                }
                let deleted = app.key_store.delete_keys(&key_ids).await?;
                println!("{deleted}");
                Ok(())
            }
            Command::Translate {
                project,
                keys,
                languages,
            } => {
                self.authorize(&project).await?;
                self.translate(&project, keys, &languages).await
            }
            Command::Status { key_id } => {
                let key = app.key_store.get_key(&key_id).await?;
                self.authorize(&key.project_id).await?;
                print_json(&app.key_store.language_states(&key_id).await?)
            }
            Command::List { project, namespace } => {
                self.authorize(&project).await?;
                let namespace_id = match namespace {
                    Some(ns) => Some(self.namespace_id(&project, &ns).await?),
                    None => None,
                };
                let keys = app
                    .key_store
                    .list_keys(&project, namespace_id.as_deref())
                    .await?;
                print_json(&keys)
            }
            Command::Search {
                project,
                query,
                page,
                page_size,
            } => {
                self.authorize(&project).await?;
                let params = PaginationParams { page, page_size };
                print_json(&app.key_store.search_keys(&project, &query, &params).await?)
            }
            Command::Usage { scope, id } => {
                let scope = match scope {
                    ScopeKind::Workspace => UsageScope::Workspace(id),
                    ScopeKind::Project => UsageScope::Project(id),
                    ScopeKind::Namespace => UsageScope::Namespace(id),
                };
                println!("{}", app.key_store.usage(&scope).await?);
                Ok(())
            }
            Command::Export {
                project,
                namespace,
                language,
                output,
            } => {
                self.authorize(&project).await?;
                let namespace_id = self.namespace_id(&project, &namespace).await?;
                let language_id = self.language_id(&project, &language).await?;
                let tree = app
                    .content_sync
                    .snapshot(&project, &namespace_id, &language_id)
                    .await?;
                let raw = serde_json::to_string_pretty(&tree)?;
                match output {
                    Some(path) => std::fs::write(&path, raw)
                        .with_context(|| format!("Failed to write {}", path.display()))?,
                    None => println!("{raw}"),
                }
                Ok(())
            }
            Command::Import {
                project,
                namespace,
                language,
                file,
            } => {
                self.authorize(&project).await?;
                let namespace_id = self.namespace_id(&project, &namespace).await?;
                let language_id = self.language_id(&project, &language).await?;
                let incoming = read_tree(&file)?;
                let current = app
                    .content_sync
                    .snapshot(&project, &namespace_id, &language_id)
                    .await?;
                let report = app
                    .content_sync
                    .reconcile(&project, &namespace_id, &language_id, &current, &incoming)
                    .await?;
                print_json(&report)?;
                if !report.is_clean() {
                    bail!("{} entry(ies) could not be applied", report.failures.len());
                }
                Ok(())
            }
            Command::Glossary(command) => self.glossary(command).await,
            Command::InitConfig { .. } | Command::Diff { .. } | Command::Apply { .. } => {
                unreachable!("handled before the store is opened")
            }
        }
    }

    async fn setup(&self, args: SetupArgs) -> anyhow::Result<()> {
        let repo = self.app.ctx.project_repository();
        let SetupArgs {
            workspace,
            organization,
            key_limit,
            project,
            project_name,
            primary,
            languages,
            namespaces,
            style_rules,
        } = args;

        repo.save_workspace(&Workspace {
            id: workspace.clone(),
            organization_id: organization,
            name: workspace.clone(),
            key_limit,
        })
        .await?;

        let project_record = Project {
            id: project.clone(),
            workspace_id: workspace,
            name: project_name.unwrap_or_else(|| project.clone()),
            primary_language_id: language_record_id(&project, &primary),
            style_rules,
        };
        repo.save_project(&project_record).await?;

        let mut specs = vec![primary];
        specs.extend(languages);
        for spec in &specs {
            let (code, name) = spec.split_once('=').unwrap_or((spec.as_str(), spec.as_str()));
            repo.save_language(&Language {
                id: language_record_id(&project, code),
                project_id: project.clone(),
                code: code.to_string(),
                name: name.to_string(),
                deleted: false,
            })
            .await?;
        }

        for name in &namespaces {
            repo.save_namespace(&Namespace {
                id: format!("{project}-{name}"),
                project_id: project.clone(),
                name: name.clone(),
            })
            .await?;
        }

        tracing::info!(
            "Project {project}: {} language(s), {} namespace(s)",
            specs.len(),
            namespaces.len()
        );
        print_json(&project_record)
    }

    async fn translate(
        &self,
        project: &str,
        keys: Vec<String>,
        languages: &[String],
    ) -> anyhow::Result<()> {
        let key_ids = if keys.is_empty() {
            self.app
                .key_store
                .list_keys(project, None)
                .await?
                .into_iter()
                .map(|k| k.id)
                .collect()
        } else {
            keys
        };
        if key_ids.is_empty() {
            tracing::info!("Project {project} has no keys");
            return Ok(());
        }

        let targets = if languages.is_empty() {
            TargetLanguages::All
        } else {
            let mut ids = Vec::with_capacity(languages.len());
            for language in languages {
                ids.push(self.language_id(project, language).await?);
            }
            TargetLanguages::Only(ids)
        };

        let chunks = self
            .app
            .dispatcher
            .trigger_batch_translation(project, &key_ids, targets)
            .await?;
        tracing::info!("Scheduled {} chunk(s) for {} key(s)", chunks.len(), key_ids.len());

        self.app.drain().await;
        let reports = self.take_reports();
        print_json(&reports)?;
        if reports.iter().any(|r| !r.is_complete_success()) {
            bail!("Some languages failed to translate; they stay stale");
        }
        Ok(())
    }

    async fn glossary(&self, command: GlossaryCommand) -> anyhow::Result<()> {
        let glossary = &self.app.glossary;
        match command {
            GlossaryCommand::Add(args) => {
                let GlossaryAddArgs {
                    project,
                    term,
                    id,
                    language,
                    description,
                    non_translatable,
                    forbidden,
                    case_sensitive,
                    translation,
                } = args;
                self.authorize(&project).await?;
                let language_id = match language {
                    Some(language) => Some(self.language_id(&project, &language).await?),
                    None => None,
                };
                let rule = glossary
                    .save_rule(GlossaryRule {
                        id: id.unwrap_or_default(),
                        project_id: project,
                        language_id,
                        term,
                        description,
                        non_translatable,
                        forbidden,
                        case_sensitive,
                        forced_translation: translation,
                    })
                    .await?;
                print_json(&rule)
            }
            GlossaryCommand::List { project } => {
                self.authorize(&project).await?;
                print_json(&glossary.list_rules(&project).await?)
            }
            GlossaryCommand::Resolve { project, language } => {
                self.authorize(&project).await?;
                let language_id = self.language_id(&project, &language).await?;
                let rules = glossary.resolve(&project, &language_id).await?;
                for line in GlossaryService::render_directives(&rules) {
                    println!("{line}");
                }
                Ok(())
            }
            GlossaryCommand::Remove { rule_id } => {
                glossary.delete_rule(&rule_id).await?;
                Ok(())
            }
        }
    }

    async fn authorize(&self, project_id: &str) -> anyhow::Result<()> {
        if let Some(identity) = &self.identity {
            self.app.ctx.authorize_project(identity, project_id).await?;
        }
        Ok(())
    }

    /// Accept a language id or its code.
    async fn language_id(&self, project_id: &str, language: &str) -> anyhow::Result<String> {
        self.app
            .ctx
            .live_languages(project_id)
            .await?
            .into_iter()
            .find(|l| l.id == language || l.code.eq_ignore_ascii_case(language))
            .map(|l| l.id)
            .with_context(|| format!("Language '{language}' not found in project {project_id}"))
    }

    /// Accept a namespace id or its name.
    async fn namespace_id(&self, project_id: &str, namespace: &str) -> anyhow::Result<String> {
        self.app
            .ctx
            .project_repository()
            .list_namespaces(project_id)
            .await?
            .into_iter()
            .find(|ns| ns.id == namespace || ns.name == namespace)
            .map(|ns| ns.id)
            .with_context(|| format!("Namespace '{namespace}' not found in project {project_id}"))
    }

    fn take_reports(&self) -> Vec<DispatchReport> {
        let mut reports = Vec::new();
        if let Ok(mut rx) = self.reports.lock() {
            while let Ok(report) = rx.try_recv() {
                reports.push(report);
            }
        }
        reports
    }

    fn log_reports(&self) {
        for report in self.take_reports() {
            if report.is_complete_success() {
                tracing::info!(
                    "Chunk {}: {} value(s) translated",
                    report.chunk_id,
                    report.translated_count()
                );
            } else {
                tracing::warn!(
                    "Chunk {}: {} value(s) translated, failed: {}",
                    report.chunk_id,
                    report.translated_count(),
                    report.failed_languages().join(", ")
                );
            }
        }
    }
}

fn language_record_id(project_id: &str, code: &str) -> String {
    format!("{project_id}-{code}")
}

fn read_tree(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str::<Value>(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?
    {
        Value::Object(tree) => Ok(tree),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
