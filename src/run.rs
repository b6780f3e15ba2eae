//
// run.rs
// Dicom-Deid-rs
//
// Drives one de-identification run: builds the identifier map and policy, traverses every
// input/output pair, then archives the output folders that were produced.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use crate::archive::{archive_and_relocate, ArchiveReport};
use crate::config::{Config, IoPair};
use crate::editor::MetadataEditor;
use crate::error::{DeidError, Result};
use crate::identifiers::IdentifierMap;
use crate::models::{RunSummary, UnknownSubject};
use crate::mount::ArchiveMounter;
use crate::policy::ScrubPolicy;
use crate::runlog::RunLog;
use crate::storage::{ensure_directory, OutputRegistry};
use crate::traverse::Traversal;

/// State threaded through every recursive call of one run.
pub struct RunContext<'a> {
    pub policy: &'a ScrubPolicy,
    pub ids: &'a IdentifierMap,
    pub emit_sidecar: bool,
    /// Output root of the input/output pair being traversed
    pub out_dir: PathBuf,
    pub log: RunLog,
    pub outputs: OutputRegistry,
    pub unknown: Vec<UnknownSubject>,
    pub summary: RunSummary,
}

impl<'a> RunContext<'a> {
    pub fn new(
        policy: &'a ScrubPolicy,
        ids: &'a IdentifierMap,
        emit_sidecar: bool,
        out_dir: PathBuf,
        log: RunLog,
    ) -> Self {
        Self {
            policy,
            ids,
            emit_sidecar,
            out_dir,
            log,
            outputs: OutputRegistry::new(),
            unknown: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Point the context at the next pair's output root and log. Accumulators carry over.
    pub fn switch_output(&mut self, out_dir: PathBuf, log: RunLog) {
        self.out_dir = out_dir;
        self.log = log;
    }
}

/// Where the inputs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One input path cleaned into one output directory
    Paths { input: PathBuf, output: PathBuf },
    /// The `io_pairs` listed in the configuration
    Configured,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub emit_sidecar: bool,
    pub subject_override: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: RunSummary,
    pub unknown: Vec<UnknownSubject>,
    pub outputs: Vec<PathBuf>,
    /// `None` when no archive destination is configured
    pub archives: Option<ArchiveReport>,
}

/// Execute a whole run. Only configuration problems and an unusable top-level output
/// directory are returned as errors; everything else is logged per item.
pub fn execute<E, M>(
    config: &Config,
    target: &Target,
    options: &RunOptions,
    editor: &E,
    mounter: &M,
) -> Result<RunReport>
where
    E: MetadataEditor + ?Sized,
    M: ArchiveMounter + ?Sized,
{
    let ids = IdentifierMap::build(options.subject_override.as_deref(), config.id_table.as_deref())?;
    let policy = ScrubPolicy::from_config(config)?;
    let pairs = match target {
        Target::Paths { input, output } => vec![IoPair {
            input: input.clone(),
            output: output.clone(),
        }],
        Target::Configured => config.resolved_pairs()?,
    };

    let (first, rest) = pairs
        .split_first()
        .ok_or_else(|| DeidError::Config("nothing to clean".into()))?;

    let traversal = Traversal::new(editor, mounter);
    let log = open_output(first, &ids)?;
    let mut ctx = RunContext::new(
        &policy,
        &ids,
        options.emit_sidecar,
        first.output.clone(),
        log,
    );
    traverse_pair(&traversal, first, &mut ctx);

    for pair in rest {
        let log = open_output(pair, &ids)?;
        ctx.switch_output(pair.output.clone(), log);
        traverse_pair(&traversal, pair, &mut ctx);
    }

    let archives = match &config.archive_dir {
        Some(destination) => Some(archive_and_relocate(&ctx.outputs, destination, &ctx.log)),
        None => {
            ctx.log
                .record("No archive destination configured; skipping archival");
            None
        }
    };

    Ok(RunReport {
        summary: ctx.summary,
        unknown: ctx.unknown,
        outputs: ctx.outputs.iter().cloned().collect(),
        archives,
    })
}

/// Create the pair's output root and its log. Failure here is fatal for the run.
fn open_output(pair: &IoPair, ids: &IdentifierMap) -> Result<RunLog> {
    ensure_directory(&pair.output)?;
    let log = RunLog::create_in(&pair.output)?;
    log.record(format!(
        "Cleaning {} into {}",
        pair.input.display(),
        pair.output.display()
    ));
    if ids.is_override() {
        log.record("Using one override subject id for every item");
    } else {
        log.record(format!("Loaded {} subject id pairs", ids.len()));
    }
    Ok(log)
}

fn traverse_pair<E, M>(traversal: &Traversal<'_, E, M>, pair: &IoPair, ctx: &mut RunContext<'_>)
where
    E: MetadataEditor + ?Sized,
    M: ArchiveMounter + ?Sized,
{
    let before = ctx.unknown.len();
    traversal.visit(&pair.input, ctx);
    let skipped = ctx.unknown.len() - before;
    if skipped > 0 {
        ctx.log.failure(format!(
            "{skipped} item(s) skipped because their subject id is not in the identifier table"
        ));
    }
}
