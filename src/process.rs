//
// process.rs
// Dicom-Deid-rs
//
// Cleans a single input file: load, scrub, pick the subject folder, save. Errors and panics raised
// while handling the item become a logged outcome.
//
// Thales Matheus Mendonça Santos - November 2025

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::editor::{MetadataEditor, ScrubOutcome};
use crate::error::Result;
use crate::models::{ItemOutcome, UnknownSubject};
use crate::run::RunContext;
use crate::storage::ensure_directory;

/// Clean one input file. Never fails: every error, and any panic inside the editor,
/// becomes a logged `Failed` outcome.
pub fn process_item<E: MetadataEditor + ?Sized>(
    editor: &E,
    path: &Path,
    ctx: &mut RunContext<'_>,
) -> ItemOutcome {
    let name = base_name(path);
    ctx.log.record(format!("Working on {name}"));

    let cleaned = catch_unwind(AssertUnwindSafe(|| clean(editor, path, &name, ctx)));
    let outcome = match cleaned {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => ItemOutcome::Failed {
            reason: e.to_string(),
        },
        Err(payload) => ItemOutcome::Failed {
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        },
    };

    match &outcome {
        ItemOutcome::Saved { destination } => {
            ctx.log
                .record(format!("Saved to {}", destination.display()));
        }
        ItemOutcome::UnknownSubject { source_id } => {
            ctx.log.failure(format!(
                "{name} skipped: subject id has no entry in the identifier table"
            ));
            ctx.unknown.push(UnknownSubject {
                path: path.to_path_buf(),
                source_id: source_id.clone(),
            });
        }
        ItemOutcome::Failed { reason } => {
            ctx.log.failure(format!("{name} failed\n{reason}"));
        }
    }

    ctx.summary.count(&outcome);
    outcome
}

fn clean<E: MetadataEditor + ?Sized>(
    editor: &E,
    path: &Path,
    name: &str,
    ctx: &mut RunContext<'_>,
) -> Result<ItemOutcome> {
    let mut image = editor.load(path)?;

    if let ScrubOutcome::UnknownSubject { source_id } =
        editor.scrub(&mut image, ctx.policy, ctx.ids, &ctx.log)?
    {
        return Ok(ItemOutcome::UnknownSubject { source_id });
    }

    let folder = ctx.out_dir.join(editor.folder_name(&image, ctx.policy)?);
    if ensure_directory(&folder)? {
        ctx.log.trace(format!("Created {}", folder.display()));
    }
    ctx.outputs.register(&folder);

    editor.save_output(&image, &folder, name, ctx.emit_sidecar)?;
    Ok(ItemOutcome::Saved {
        destination: folder,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
