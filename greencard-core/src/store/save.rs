//! Validates fetched event batches and appends them to the event group log.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::traits::EventGroupStore;
use super::types::{EventGroup, EventGroupKey, SavePolicy};
use crate::error::GreenCardError;
use crate::events::{RemoteEvents, SignedResponseWithModel};

/// Saves signed event batches, serializing writes per `(provider, type)` key.
pub struct EventSaver {
    store: Arc<dyn EventGroupStore>,
    locks: DashMap<EventGroupKey, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for EventSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSaver")
            .field("locked_keys", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl EventSaver {
    /// Creates a saver writing into `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventGroupStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventGroupStore> {
        &self.store
    }

    /// Turns every batch into an [`EventGroup`] and persists them.
    ///
    /// All batches are validated before anything is written, so one bad batch rejects
    /// the whole call.
    ///
    /// # Errors
    /// - `MissingProviderIdentifier` when a batch does not name its provider.
    /// - `MissingRequiredDate` when a batch holds no dated event.
    /// - Store errors from the write.
    pub async fn save_events(
        &self,
        batches: Vec<SignedResponseWithModel<RemoteEvents>>,
        policy: SavePolicy,
    ) -> Result<Vec<EventGroup>, GreenCardError> {
        let groups = batches
            .into_iter()
            .map(event_group)
            .collect::<Result<Vec<_>, _>>()?;

        let mut by_key: BTreeMap<EventGroupKey, Vec<EventGroup>> = BTreeMap::new();
        for group in &groups {
            by_key.entry(group.key()).or_default().push(group.clone());
        }

        for (key, key_groups) in by_key {
            let lock = self.lock_for(&key);
            let _guard = lock.lock().await;
            log::debug!(
                "saving {} event group(s) for {} {}",
                key_groups.len(),
                key.provider_identifier,
                key.event_type
            );
            match policy {
                SavePolicy::Append => self.store.insert_all(key_groups)?,
                SavePolicy::Replace => self.store.replace(&key, key_groups)?,
            }
        }

        Ok(groups)
    }

    fn lock_for(&self, key: &EventGroupKey) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}

fn event_group(batch: SignedResponseWithModel<RemoteEvents>) -> Result<EventGroup, GreenCardError> {
    let (events, raw) = batch.into_parts();
    let provider_identifier = events
        .provider_identifier()
        .ok_or(GreenCardError::MissingProviderIdentifier)?
        .to_string();
    let max_issued_at =
        events
            .max_issued_at()
            .ok_or_else(|| GreenCardError::MissingRequiredDate {
                provider_identifier: provider_identifier.clone(),
            })?;
    Ok(EventGroup::new(
        provider_identifier,
        events.event_type(),
        max_issued_at,
        raw,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::events::test_support::sign;
    use crate::store::memory::InMemoryEventGroupStore;
    use crate::store::EventType;

    fn test_batch(provider: &str, dates: &[&str]) -> SignedResponseWithModel<RemoteEvents> {
        let payload = serde_json::json!({
            "providerIdentifier": provider,
            "protocolVersion": "3.0",
            "status": "complete",
            "events": dates.iter().map(|date| serde_json::json!({
                "type": "negativetest",
                "unique": format!("{provider}-{date}"),
                "isSpecimen": false,
                "negativetest": {"sampleDate": date, "negativeResult": true}
            })).collect::<Vec<_>>()
        });
        let model =
            RemoteEvents::parse(EventType::Test, &serde_json::to_vec(&payload).unwrap()).unwrap();
        SignedResponseWithModel::new(sign(&payload), model)
    }

    fn saver() -> (Arc<InMemoryEventGroupStore>, EventSaver) {
        let store = Arc::new(InMemoryEventGroupStore::new());
        let saver = EventSaver::new(store.clone());
        (store, saver)
    }

    #[tokio::test]
    async fn test_max_issued_at_is_latest_event() {
        let (_, saver) = saver();
        let groups = saver
            .save_events(
                vec![test_batch(
                    "GGD",
                    &["2021-06-01T00:00:00Z", "2021-06-03T00:00:00Z"],
                )],
                SavePolicy::Append,
            )
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].max_issued_at(),
            Utc.with_ymd_and_hms(2021, 6, 3, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_batch_without_dates_is_rejected() {
        let (store, saver) = saver();
        let err = saver
            .save_events(
                vec![
                    test_batch("GGD", &["2021-06-01T00:00:00Z"]),
                    test_batch("GGD", &[]),
                ],
                SavePolicy::Append,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GreenCardError::MissingRequiredDate { ref provider_identifier } if provider_identifier == "GGD"
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_without_provider_is_rejected() {
        let (store, saver) = saver();
        let err = saver
            .save_events(
                vec![test_batch("", &["2021-06-01T00:00:00Z"])],
                SavePolicy::Append,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GreenCardError::MissingProviderIdentifier));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_accumulates_and_replace_supersedes() {
        let (store, saver) = saver();
        let key = EventGroupKey::new("GGD", EventType::Test);

        for date in ["2021-06-01T00:00:00Z", "2021-06-02T00:00:00Z"] {
            saver
                .save_events(vec![test_batch("GGD", &[date])], SavePolicy::Append)
                .await
                .unwrap();
        }
        saver
            .save_events(
                vec![test_batch("RIVM", &["2021-06-02T00:00:00Z"])],
                SavePolicy::Append,
            )
            .await
            .unwrap();
        assert_eq!(store.list_for_key(&key).unwrap().len(), 2);

        let replaced = saver
            .save_events(
                vec![test_batch("GGD", &["2021-06-05T00:00:00Z"])],
                SavePolicy::Replace,
            )
            .await
            .unwrap();
        assert_eq!(store.list_for_key(&key).unwrap(), replaced);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stored_group_rehydrates_from_raw_bytes() {
        let (store, saver) = saver();
        let batch = test_batch("GGD", &["2021-06-01T00:00:00Z"]);
        let raw = batch.raw().to_vec();
        let model = batch.model().clone();
        saver
            .save_events(vec![batch], SavePolicy::Append)
            .await
            .unwrap();

        let stored = store.list().unwrap().remove(0);
        assert_eq!(stored.raw_signed_bytes(), raw.as_slice());
        assert_eq!(stored.events().unwrap(), model);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_on_one_key_all_land() {
        let (store, saver) = saver();
        let saver = Arc::new(saver);
        let handles = (1..=8)
            .map(|day| {
                let saver = Arc::clone(&saver);
                tokio::spawn(async move {
                    let date = format!("2021-06-{day:02}T00:00:00Z");
                    saver
                        .save_events(vec![test_batch("GGD", &[date.as_str()])], SavePolicy::Append)
                        .await
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 8);
    }
}
