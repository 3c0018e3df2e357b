use std::convert::Infallible;

use serde_json::json;

use crate::{
    backend::{
        BatchBackend, BatchResponse,
        memory::{Call, Reply},
    },
    bulk::{BulkCoordinator, BulkEditDraft, BulkError},
    row::{Record, Row, RowId},
    tests::{fixture, id, ids},
};

/// Backend whose mutations never answer.
struct Stalled;

impl BatchBackend for Stalled {
    type Row = Record;
    type Error = Infallible;

    async fn load(&self) -> Result<Vec<Record>, Infallible> {
        Ok(Vec::new())
    }

    async fn batch_update(&self, _: &[BulkEditDraft]) -> Result<BatchResponse, Infallible> {
        std::future::pending().await
    }

    async fn batch_delete(&self, _: &[RowId]) -> Result<BatchResponse, Infallible> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn blank_required_rows_are_left_out() {
    let mut fixture = fixture("employees").await;
    let mut bulk = BulkCoordinator::default();
    bulk.open_drafts(
        vec![
            BulkEditDraft::new("1").with_field("name", "A"),
            BulkEditDraft::new("2").with_field("name", ""),
        ],
        vec!["name".to_string()],
    );
    let outcome = bulk
        .submit_bulk_edit(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();
    assert_eq!(outcome.submitted, 1);
    assert!(outcome.refreshed);
    assert_eq!(
        fixture.backend.mutations().await,
        vec![Call::BatchUpdate(vec![
            BulkEditDraft::new("1").with_field("name", "A")
        ])]
    );
    assert!(!bulk.is_open());
}

#[tokio::test]
async fn all_blank_batch_is_not_sent() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("1"));
    fixture.engine.toggle_row(&id("2"));
    let mut bulk = BulkCoordinator::default();
    bulk.open_bulk_edit(&fixture.engine, &fixture.schema);
    bulk.update_draft_field(&id("1"), "name", "").unwrap();
    bulk.update_draft_field(&id("2"), "name", "   ").unwrap();

    let error = bulk
        .submit_bulk_edit(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap_err();
    assert_eq!(error, BulkError::Validation);
    assert!(fixture.backend.mutations().await.is_empty());
    assert!(bulk.is_open());
    assert_eq!(
        bulk.error(),
        Some(BulkError::Validation.to_string().as_str())
    );
    assert_eq!(fixture.engine.selection().len(), 2);
}

#[tokio::test]
async fn drafts_are_seeded_from_selection() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("3"));
    fixture.engine.toggle_row(&id("1"));
    let mut bulk = BulkCoordinator::default();
    let drafts = bulk
        .open_bulk_edit(&fixture.engine, &fixture.schema)
        .to_vec();
    assert_eq!(
        drafts,
        vec![
            BulkEditDraft::new("1")
                .with_field("name", "Ali Khan")
                .with_field("email", "x@y.com")
                .with_field("grade", 3),
            BulkEditDraft::new("3")
                .with_field("name", "Bob")
                .with_field("email", "z@y.com")
                .with_field("grade", 3),
        ]
    );

    assert_eq!(
        bulk.update_draft_field(&id("2"), "grade", 1),
        Err(BulkError::UnknownDraft(id("2")))
    );
    bulk.update_draft_field(&id("3"), "grade", 4).unwrap();
    // drafts are local until submitted
    assert_eq!(fixture.engine.rows()[2].field("grade"), Some(&json!(3)));

    bulk.submit_bulk_edit(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();
    assert_eq!(fixture.engine.rows()[2].field("grade"), Some(&json!(4)));
    assert!(fixture.engine.selection().is_empty());
}

#[tokio::test]
async fn bulk_delete_sends_every_selected_id() {
    let mut fixture = fixture("employees").await;
    for row in ["1", "2", "3"] {
        fixture.engine.toggle_row(&id(row));
    }
    let mut bulk = BulkCoordinator::default();
    let outcome = bulk
        .submit_bulk_delete(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();
    assert_eq!(
        fixture.backend.mutations().await,
        vec![Call::BatchDelete(vec![id("1"), id("2"), id("3")])]
    );
    assert_eq!(outcome.message.as_deref(), Some("3 rows deleted"));
    assert!(fixture.engine.selection().is_empty());
    assert_eq!(ids(fixture.engine.rows()), vec!["4", "5"]);
}

#[tokio::test]
async fn rejected_delete_keeps_selection() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("4"));
    fixture
        .backend
        .reply_next(Reply::Reject(Some("Employee has an open loan".into())))
        .await;
    let mut bulk = BulkCoordinator::default();
    let error = bulk
        .submit_bulk_delete(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap_err();
    assert_eq!(
        error,
        BulkError::Rejected(Some("Employee has an open loan".into()))
    );
    assert_eq!(bulk.error(), Some("Employee has an open loan"));
    assert_eq!(fixture.engine.selected_ids(), vec![id("4")]);
    assert_eq!(fixture.engine.rows().len(), 5);

    // retry goes through
    bulk.submit_bulk_delete(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();
    assert!(fixture.engine.selection().is_empty());
    assert_eq!(bulk.error(), None);
}

#[tokio::test]
async fn rejected_edit_keeps_surface_open() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("5"));
    fixture.backend.reply_next(Reply::Reject(None)).await;
    let mut bulk = BulkCoordinator::default();
    bulk.open_bulk_edit(&fixture.engine, &fixture.schema);
    let error = bulk
        .submit_bulk_edit(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap_err();
    assert_eq!(error, BulkError::Rejected(None));
    assert_eq!(bulk.error(), Some("Operation failed"));
    assert!(bulk.is_open());
    assert_eq!(bulk.drafts().len(), 1);
    assert_eq!(fixture.engine.selected_ids(), vec![id("5")]);
}

#[tokio::test]
async fn backend_errors_become_generic_message() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("1"));
    fixture
        .backend
        .reply_next(Reply::Fail("connection reset by peer".into()))
        .await;
    let mut bulk = BulkCoordinator::default();
    bulk.open_bulk_edit(&fixture.engine, &fixture.schema);
    let error = bulk
        .submit_bulk_edit(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap_err();
    assert_eq!(error, BulkError::Unexpected);
    assert_eq!(bulk.error(), Some("Something went wrong, please try again"));
    assert!(bulk.is_open());
    assert!(!bulk.is_pending());
}

#[tokio::test]
async fn failed_reload_still_clears_selection() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("2"));
    fixture.backend.fail_loads(true).await;
    let mut bulk = BulkCoordinator::default();
    let outcome = bulk
        .submit_bulk_delete(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();
    assert!(!outcome.refreshed);
    assert!(fixture.engine.selection().is_empty());
    assert_eq!(fixture.engine.rows().len(), 5);
}

#[tokio::test]
async fn empty_selection_is_not_sent() {
    let mut fixture = fixture("employees").await;
    let mut bulk = BulkCoordinator::default();
    let error = bulk
        .submit_bulk_delete(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap_err();
    assert_eq!(error, BulkError::EmptySelection);
    assert!(fixture.backend.calls().await.is_empty());
}

#[tokio::test]
async fn single_row_mutations() {
    let mut fixture = fixture("employees").await;
    let mut bulk = BulkCoordinator::default();
    let required = fixture.schema.required_fields();

    let error = bulk
        .submit_single_edit(
            &mut fixture.engine,
            &fixture.backend,
            BulkEditDraft::new("2").with_field("name", ""),
            &required,
        )
        .await
        .unwrap_err();
    assert_eq!(error, BulkError::Validation);

    bulk.submit_single_edit(
        &mut fixture.engine,
        &fixture.backend,
        BulkEditDraft::new("2").with_field("name", "Robert"),
        &required,
    )
    .await
    .unwrap();
    assert_eq!(
        fixture.engine.rows()[1].field("name"),
        Some(&json!("Robert"))
    );

    bulk.submit_single_delete(&mut fixture.engine, &fixture.backend, &id("2"))
        .await
        .unwrap();
    assert_eq!(ids(fixture.engine.rows()), vec!["1", "3", "4", "5"]);
    assert_eq!(
        fixture.backend.mutations().await,
        vec![
            Call::BatchUpdate(vec![BulkEditDraft::new("2").with_field("name", "Robert")]),
            Call::BatchDelete(vec![id("2")]),
        ]
    );
}

#[tokio::test]
async fn pending_is_visible_while_in_flight() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("1"));
    let mut bulk = BulkCoordinator::default();
    let pending = bulk.pending();
    assert!(!pending.is_set());
    {
        let submit = bulk.submit_bulk_delete(&mut fixture.engine, &Stalled);
        tokio::pin!(submit);
        tokio::select! {
            biased;
            _ = &mut submit => panic!("submission finished without a reply"),
            _ = std::future::ready(()) => {}
        }
        assert!(pending.is_set());
    }
    // the abandoned submission no longer blocks the host
    assert!(!pending.is_set());
    assert!(!bulk.is_pending());
    assert_eq!(fixture.engine.selected_ids(), vec![id("1")]);

    bulk.submit_bulk_delete(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();
    assert!(!pending.is_set());
}

#[tokio::test]
async fn id_is_not_a_draft_field() {
    let mut fixture = fixture("employees").await;
    fixture.engine.toggle_row(&id("1"));
    let mut bulk = BulkCoordinator::default();
    bulk.open_bulk_edit(&fixture.engine, &fixture.schema);
    assert_eq!(
        bulk.update_draft_field(&id("1"), "id", "9"),
        Err(BulkError::ReadOnlyField("id".into()))
    );
    assert_eq!(
        serde_json::to_value(&bulk.drafts()[0]).unwrap(),
        json!({"id": "1", "name": "Ali Khan", "email": "x@y.com", "grade": 3})
    );
}

