//! `baseapp` operator CLI.
//!
//! # Responsibility
//! - Expose record creation, cascade linking, soft delete, undelete and
//!   view listing over the database named in a settings file.
//! - Keep output line-oriented for shell pipelines.

use anyhow::{anyhow, bail, Context, Result};
use baseapp_core::{
    init_logging, ModelRegistry, Processed, Record, RecordId, RecordStatus, RecordStore,
    RecordView, Settings, SoftDeleteService, SqliteRecordStore,
};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;
use uuid::Uuid;

/// Soft-delete lifecycle operations on baseapp records.
#[derive(Parser, Debug)]
#[command(name = "baseapp", version, about)]
struct Cli {
    /// Settings document (JSON).
    #[arg(long, short, global = true, default_value = "baseapp.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create one record of a registered model.
    Create {
        label: String,
        display: String,
        #[arg(long, value_enum, default_value_t = StatusArg::Online)]
        status: StatusArg,
    },
    /// Point a record's foreign key at an owner record.
    Link {
        child: Uuid,
        foreign_key: String,
        owner: Uuid,
    },
    /// Soft-delete a record and its cascade dependents.
    Delete { id: Uuid },
    /// Restore a soft-deleted record and its cascade dependents.
    Undelete { id: Uuid },
    /// List records of one model in one view.
    List {
        label: String,
        #[arg(long, value_enum, default_value_t = ViewArg::All)]
        view: ViewArg,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Online,
    Offline,
    Draft,
}

impl From<StatusArg> for RecordStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Online => RecordStatus::Online,
            StatusArg::Offline => RecordStatus::Offline,
            StatusArg::Draft => RecordStatus::Draft,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ViewArg {
    All,
    Deleted,
    Offlined,
    Drafted,
    Everything,
}

impl From<ViewArg> for RecordView {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::All => RecordView::Visible,
            ViewArg::Deleted => RecordView::Deleted,
            ViewArg::Offlined => RecordView::Offlined,
            ViewArg::Drafted => RecordView::Drafted,
            ViewArg::Everything => RecordView::Everything,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    if let Some(log_dir) = settings.log_dir.as_deref() {
        init_logging(&settings.log_level, log_dir)?;
    }

    let registry = settings.model_registry()?;
    let conn = settings.open_database()?;
    let store = SqliteRecordStore::new(&conn);
    let service = SoftDeleteService::new(&store, &registry);

    match cli.command {
        Command::Create {
            label,
            display,
            status,
        } => {
            if !registry.is_registered(&label) {
                return Err(anyhow!("model not registered: {label}"));
            }
            let mut record = Record::new(label, display);
            record.set_status(status.into())?;
            let id = store.create_record(&record)?;
            info!("event=record_create module=cli status=ok label={} id={id}", record.label);
            println!("{id}");
        }
        Command::Link {
            child,
            foreign_key,
            owner,
        } => {
            let child_record = load_record(&store, child)?;
            let owner_record = load_record(&store, owner)?;
            check_link(&registry, &child_record, &foreign_key, &owner_record)?;
            store.link_record(child, &foreign_key, owner)?;
            println!("{child} {foreign_key} -> {owner}");
        }
        Command::Delete { id } => print_processed(&service.delete_by_id(id)?),
        Command::Undelete { id } => print_processed(&service.undelete_by_id(id)?),
        Command::List { label, view } => {
            let records = match RecordView::from(view) {
                RecordView::Visible => service.all(&label)?,
                RecordView::Deleted => service.deleted(&label)?,
                RecordView::Offlined => service.offlined(&label)?,
                RecordView::Drafted => service.drafted(&label)?,
                RecordView::Everything => service.everything(&label)?,
            };
            for record in records {
                println!("{}\t{}\t{}", record.id, record.status, record.display);
            }
        }
    }

    Ok(())
}

fn load_record(store: &impl RecordStore, id: RecordId) -> Result<Record> {
    store
        .get_record(id)?
        .ok_or_else(|| anyhow!("record not found: {id}"))
}

/// Rejects links no relation on the owner's model would ever follow.
fn check_link(
    registry: &ModelRegistry,
    child: &Record,
    foreign_key: &str,
    owner: &Record,
) -> Result<()> {
    if registry
        .find_relation(&owner.label, &child.label, foreign_key)
        .is_none()
    {
        bail!(
            "no relation `{}.{foreign_key}` declared on `{}`",
            child.label,
            owner.label
        );
    }
    Ok(())
}

fn print_processed(processed: &Processed) {
    println!("processed total={}", processed.total());
    for (label, count) in processed.by_label() {
        println!("  {label}={count}");
    }
}
