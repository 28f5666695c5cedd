//! Integration tests for the credential flow.

mod common;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use greencard_core::credential::HolderSecretKey;
use greencard_core::green_card::{active_green_cards, Credential, DomesticSlot};
use greencard_core::qr::{QrCodeData, QrCodeDataAssembler};
use greencard_core::store::{
    EventGroupStore, EventSaver, EventType, InMemoryEventGroupStore, SavePolicy,
};
use greencard_core::verifier::{QrVerifier, VerifiedQrResultState};
use greencard_core::{GreenCard, GreenCardType, Origin, OriginType};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 2, 12, 0, 0).unwrap()
}

fn origin(origin_type: OriginType, valid_from: DateTime<Utc>, hours: i64) -> Origin {
    Origin {
        origin_type,
        event_time: valid_from,
        valid_from,
        expiration_time: valid_from + Duration::hours(hours),
    }
}

#[tokio::test]
async fn test_stored_events_are_selected_for_issuance() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::persisted_config(dir.path(), now());
    let engine = common::engine(Arc::new(common::StubPrimitive::new(0)), config);

    let store = Arc::new(InMemoryEventGroupStore::new());
    let saver = EventSaver::new(store.clone());
    let recent = common::negative_tests("GGD", &["2021-06-02T08:00:00Z"]);
    saver
        .save_events(
            vec![
                common::signed_batch(EventType::Test, &recent),
                // same signed batch fetched twice
                common::signed_batch(EventType::Test, &recent),
                common::signed_batch(
                    EventType::Test,
                    &common::negative_tests("ZZZ", &["2021-05-20T08:00:00Z"]),
                ),
                common::signed_batch(
                    EventType::Vaccination,
                    &common::vaccinations("RIVM", &["2021-05-01"]),
                ),
            ],
            SavePolicy::Append,
        )
        .await
        .unwrap();

    let eligible = engine
        .eligible_event_groups(&store.list().unwrap(), GreenCardType::Domestic, now())
        .unwrap();

    let providers: Vec<_> = eligible.iter().map(|g| g.provider_identifier()).collect();
    assert_eq!(providers, ["GGD", "RIVM"]);
}

#[test]
fn test_domestic_card_from_qr_to_verifier() {
    let dir = tempfile::tempdir().unwrap();
    let valid_from = now() - Duration::hours(1);
    let primitive = Arc::new(common::StubPrimitive::new(valid_from.timestamp()));
    let config = common::persisted_config(dir.path(), now());
    let engine = Arc::new(common::engine(primitive.clone(), config));

    let mut card = GreenCard::new(
        GreenCardType::Domestic,
        vec![
            origin(OriginType::Test, valid_from, 40),
            origin(OriginType::Vaccination, now() + Duration::days(10), 24 * 365),
        ],
    )
    .unwrap();
    let credential = b"domestic-credential".to_vec();
    card.set_credential(Credential::new(
        credential.clone(),
        valid_from,
        valid_from + Duration::hours(24),
        2,
    ));

    let cards = [card];
    let active = active_green_cards(&cards, now());
    assert_eq!(active.len(), 1);
    let slots: Vec<_> = active[0]
        .domestic_slots(now())
        .into_iter()
        .map(|(slot, _)| slot)
        .collect();
    assert_eq!(slots, [DomesticSlot::Vaccination, DomesticSlot::Test]);

    let assembler = QrCodeDataAssembler::new(engine, Arc::new(common::EchoEncoder));
    let sk = HolderSecretKey::from_bytes(b"holder-sk".to_vec());
    let data = assembler
        .assemble(GreenCardType::Domestic, &credential, &sk, true, 400, 400)
        .unwrap();
    assert_eq!(primitive.read.lock().unwrap().as_slice(), [credential.clone()]);
    let QrCodeData::Domestic { image, attributes } = data else {
        panic!("expected a domestic payload");
    };
    assert_eq!(attributes.valid_from, valid_from);

    let verifier = QrVerifier::new(primitive);
    match verifier.verify(&image, now()) {
        VerifiedQrResultState::Valid(verified) => {
            assert_eq!(verified.attributes.first_name_initial, "B");
        }
        other => panic!("expected Valid, got {other:?}"),
    }
    assert!(matches!(
        verifier.verify(&image, now() + Duration::hours(24)),
        VerifiedQrResultState::Invalid(_)
    ));
}

#[test]
fn test_expired_cards_are_hidden_not_deleted() {
    let cards = vec![
        GreenCard::new(
            GreenCardType::Eu,
            vec![origin(OriginType::Test, now() - Duration::hours(50), 40)],
        )
        .unwrap(),
        GreenCard::new(
            GreenCardType::Domestic,
            vec![origin(OriginType::Test, now() - Duration::hours(38), 40)],
        )
        .unwrap(),
    ];

    let active = active_green_cards(&cards, now());
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].card_type(), GreenCardType::Domestic);
    assert_eq!(cards.len(), 2);

    let countdown = active[0].expire_countdown(now()).expect("countdown");
    assert_eq!((countdown.hours, countdown.minutes), (2, 0));
}
