use std::path::PathBuf;
use std::sync::Arc;

use clap::{Subcommand, ValueEnum};
use eyre::{Context as _, Result};
use greencard_core::events::{SignedResponse, TestEventDetails, VaccinationEventDetails};
use greencard_core::store::{
    BlobEventGroupStore, EventGroup, EventGroupStore, EventSaver, EventType, SavePolicy,
};
use greencard_core::{AppConfig, RemoteEvents, SignedResponseWithModel};

use super::cached_config;
use crate::fs_store::FsBlobStore;
use crate::DataDir;

#[derive(Subcommand, Debug)]
pub enum EventsCommand {
    /// Store a signed provider response read from a file.
    ///
    /// The signature is not checked: only import responses you fetched yourself.
    Import {
        /// Kind of events in the response
        #[arg(long, value_enum)]
        r#type: ImportType,
        /// Path to the raw response body
        #[arg(long)]
        file: PathBuf,
        /// Replace the stored groups of the same provider and type
        #[arg(long)]
        replace: bool,
    },
    /// List stored event groups.
    List,
    /// Print the events of one group.
    Show {
        /// Group id as printed by `list`
        id: String,
    },
    /// Delete every stored group.
    Clear,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ImportType {
    Test,
    Vaccination,
}

impl From<ImportType> for EventType {
    fn from(value: ImportType) -> Self {
        match value {
            ImportType::Test => Self::Test,
            ImportType::Vaccination => Self::Vaccination,
        }
    }
}

pub async fn run(command: EventsCommand, data_dir: &DataDir) -> Result<()> {
    let store = Arc::new(BlobEventGroupStore::new(Arc::new(FsBlobStore::new(
        data_dir.blobs_dir(),
    ))));

    match command {
        EventsCommand::Import {
            r#type,
            file,
            replace,
        } => {
            let raw =
                std::fs::read(&file).wrap_err_with(|| format!("reading {}", file.display()))?;
            let payload = SignedResponse::from_bytes(&raw)?.payload_bytes()?;
            let events = RemoteEvents::parse(r#type.into(), &payload)?;
            let policy = if replace {
                SavePolicy::Replace
            } else {
                SavePolicy::Append
            };

            let saver = EventSaver::new(store);
            let saved = saver
                .save_events(vec![SignedResponseWithModel::new(raw, events)], policy)
                .await?;
            for group in &saved {
                println!("saved {}", summary(group));
            }
        }
        EventsCommand::List => {
            let groups = store.list()?;
            if groups.is_empty() {
                println!("no stored events");
            }
            for group in &groups {
                println!("{}", summary(group));
            }
        }
        EventsCommand::Show { id } => {
            let group = store
                .list()?
                .into_iter()
                .find(|group| group.id().to_string() == id)
                .ok_or_else(|| eyre::eyre!("no event group {id}"))?;
            let config = cached_config(data_dir).get();
            println!("{}", summary(&group));
            for line in describe(&group.events()?, &config) {
                println!("  {line}");
            }
        }
        EventsCommand::Clear => {
            store.clear()?;
            println!("cleared stored events");
        }
    }
    Ok(())
}

fn summary(group: &EventGroup) -> String {
    format!(
        "{} {} {} {} {}",
        group.id(),
        group.provider_identifier(),
        group.event_type(),
        group.max_issued_at().to_rfc3339(),
        &group.digest()[..12]
    )
}

fn describe(events: &RemoteEvents, config: &AppConfig) -> Vec<String> {
    match events {
        RemoteEvents::NegativeTestV2(result) => result
            .result
            .iter()
            .map(|result| {
                let details = TestEventDetails::for_test_v2(result, config);
                format!("test {} ({})", details.unique, details.test_type)
            })
            .collect(),
        RemoteEvents::NegativeTestV3(result) => result
            .events
            .iter()
            .flatten()
            .map(|event| {
                let details = TestEventDetails::for_test_v3(event, config);
                format!(
                    "test {} ({}, {})",
                    details.unique, details.test_type, details.manufacturer
                )
            })
            .collect(),
        RemoteEvents::Vaccination(result) => result
            .events
            .iter()
            .flatten()
            .map(|event| {
                let details = VaccinationEventDetails::for_vaccination(event, config);
                let doses = details
                    .doses
                    .map(|(dose, total)| format!(", dose {dose}/{total}"))
                    .unwrap_or_default();
                format!(
                    "vaccination {} on {} ({}{doses})",
                    details.unique, details.date, details.vaccine
                )
            })
            .collect(),
    }
}
