//! Knowledge base management commands
//!
//! Base create and delete go through the knowledge store, which owns
//! the server round-trip. Document upload and removal are composed
//! here: the file endpoints move bytes, the store keeps the books.

use crate::api::ApiClient;
use crate::cli::KbCommand;
use crate::commands::confirm;
use crate::config::Config;
use crate::error::{QaChatError, Result};
use crate::store::{DeleteOutcome, Document, KnowledgeStore, LocalStore};
use colored::Colorize;
use prettytable::{format, Table};
use std::path::Path;

/// Handle knowledge base commands
pub async fn handle_kb(config: &Config, command: KbCommand) -> Result<()> {
    let local = LocalStore::open_configured(&config.storage)?;
    let mut store = KnowledgeStore::load(local);
    let api = ApiClient::new(&config.server)?;

    match command {
        KbCommand::List => {
            print_kb_table(&store);
        }
        KbCommand::Create { name, description } => {
            let base = store
                .create_knowledge_base(&api, &name, &description)
                .await?;
            println!(
                "{}",
                format!("Created knowledge base {} ({})", base.name, base.id).green()
            );
        }
        KbCommand::Delete { id, yes } => {
            let outcome = store
                .delete_knowledge_base(&api, &id, || {
                    yes || confirm(&format!("Delete knowledge base {}?", id))
                })
                .await?;
            match outcome {
                DeleteOutcome::Deleted => {
                    println!("{}", format!("Deleted knowledge base {}", id).green());
                }
                DeleteOutcome::Cancelled => {
                    println!("Cancelled.");
                }
            }
        }
        KbCommand::Docs { id } => {
            print_document_table(&store, &id)?;
        }
        KbCommand::Upload { kb, file } => {
            upload_document(&mut store, &api, &kb, &file).await?;
        }
        KbCommand::Remove { kb, doc } => {
            remove_document(&mut store, &api, &kb, &doc).await?;
        }
    }

    Ok(())
}

/// Upload a file to the server and record it in the local store
async fn upload_document(
    store: &mut KnowledgeStore,
    api: &ApiClient,
    kb_id: &str,
    file: &Path,
) -> Result<()> {
    if store.base(kb_id).is_none() {
        return Err(QaChatError::Knowledge(format!("No knowledge base with id {}", kb_id)).into());
    }

    let record = api.upload_file(file).await?;
    let document = Document::from_upload(&record, api.origin());
    let document_id = document.id.clone();
    store.register_document(kb_id, document)?;

    println!(
        "{}",
        format!(
            "Uploaded {} ({} bytes) into knowledge base {}",
            record.original_name, record.size, kb_id
        )
        .green()
    );
    println!("Document id: {}", document_id.cyan());

    if record.processing {
        if let Some(task_id) = record.task_id {
            report_processing(api, task_id).await;
        }
    }

    Ok(())
}

/// One-shot probe of a background processing task after an upload
async fn report_processing(api: &ApiClient, task_id: i64) {
    match api.task_status(task_id).await {
        Ok(status) if status.is_alive => {
            println!(
                "{}",
                format!(
                    "The server is still indexing this PDF (task {}); it becomes searchable once that finishes.",
                    task_id
                )
                .yellow()
            );
        }
        Ok(status) => {
            println!("Processing task {}: {}", task_id, status.status);
        }
        Err(e) => {
            tracing::debug!("Task status probe failed: {}", e);
        }
    }
}

/// Delete the stored file on the server, then drop the local record
async fn remove_document(
    store: &mut KnowledgeStore,
    api: &ApiClient,
    kb_id: &str,
    document_id: &str,
) -> Result<()> {
    if store.base(kb_id).is_none() {
        return Err(QaChatError::Knowledge(format!("No knowledge base with id {}", kb_id)).into());
    }

    let document = store
        .documents_for(kb_id)
        .iter()
        .find(|d| d.id == document_id)
        .cloned()
        .ok_or_else(|| {
            QaChatError::Knowledge(format!(
                "No document {} in knowledge base {}",
                document_id, kb_id
            ))
        })?;

    if !document.saved_name.is_empty() {
        match api.delete_file(&document.saved_name).await {
            Ok(()) => {}
            // The file may have been cleaned up server-side already;
            // the local record should still go.
            Err(e) if is_not_found(&e) => {
                tracing::warn!("File {} already gone on the server", document.saved_name);
            }
            Err(e) => return Err(e),
        }
    }

    store.remove_document(kb_id, document_id)?;
    println!(
        "{}",
        format!("Removed {} from knowledge base {}", document.name, kb_id).green()
    );
    Ok(())
}

fn is_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<QaChatError>(),
        Some(QaChatError::NotFound(_))
    )
}

fn print_kb_table(store: &KnowledgeStore) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Description".bold(),
        "Documents".bold(),
        "Created".bold()
    ]);

    for base in store.bases() {
        table.add_row(prettytable::row![
            base.id.cyan(),
            base.name,
            base.description,
            base.document_count,
            super::format_timestamp(&base.created_at)
        ]);
    }

    println!("\nKnowledge Bases:");
    table.printstd();
    println!();
    println!(
        "Use {} to see a base's documents.",
        "qachat kb docs --id <ID>".cyan()
    );
    println!();
}

fn print_document_table(store: &KnowledgeStore, kb_id: &str) -> Result<()> {
    let base = store
        .base(kb_id)
        .ok_or_else(|| QaChatError::Knowledge(format!("No knowledge base with id {}", kb_id)))?;
    let documents = store.documents_for(kb_id);

    if documents.is_empty() {
        println!(
            "{}",
            format!("Knowledge base {} has no documents.", base.name).yellow()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Size".bold(),
        "Uploaded".bold()
    ]);

    for document in documents {
        table.add_row(prettytable::row![
            document.id.cyan(),
            document.name,
            format_size(document.size),
            super::format_timestamp(&document.uploaded_at)
        ]);
    }

    println!("\nDocuments in {}:", base.name);
    table.printstd();
    println!();
    println!(
        "Use {} to remove a document.",
        format!("qachat kb remove --kb {} --doc <ID>", kb_id).cyan()
    );
    println!();
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
