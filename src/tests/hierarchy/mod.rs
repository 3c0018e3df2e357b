use crate::{
    bulk::{BulkCoordinator, BulkEditDraft},
    row::{Hierarchical, Row},
    tests::{fixture, id, ids},
    tree::{build_forest, flatten_visible, forest_size},
};

#[tokio::test]
async fn chart_of_accounts_forest() {
    let fixture = fixture("accounts").await;
    let rows = fixture.engine.rows().to_vec();
    let total = rows.len();
    let forest = build_forest(rows);

    assert_eq!(forest_size(&forest), total);
    // 30 has an unknown parent, 40 names itself
    assert_eq!(
        ids(forest.iter().map(|node| &node.row)),
        vec!["10", "20", "30", "40"]
    );
    assert_eq!(
        ids(forest[0].children.iter().map(|node| &node.row)),
        vec!["11", "12"]
    );
    assert_eq!(
        ids(forest[0].children[0].children.iter().map(|node| &node.row)),
        vec!["13"]
    );
    for node in forest.iter().flat_map(|root| root.iter()) {
        for child in &node.children {
            assert_eq!(child.row.parent_id(), Some(node.row.id()));
        }
    }
}

#[tokio::test]
async fn expansion_survives_until_refresh() {
    let mut fixture = fixture("accounts").await;
    let forest = build_forest(fixture.engine.rows().to_vec());
    assert_eq!(flatten_visible(&forest, fixture.engine.expanded()).len(), 4);

    fixture.engine.toggle_expanded(&id("10"));
    fixture.engine.set_expanded(&id("11"), true);
    fixture.engine.toggle_sort("code");
    fixture.engine.set_search("cash");
    let visible = flatten_visible(&forest, fixture.engine.expanded())
        .into_iter()
        .map(|node| (node.row.id().to_string(), node.depth))
        .collect::<Vec<_>>();
    assert_eq!(
        visible,
        vec![
            ("10".to_string(), 0),
            ("11".to_string(), 1),
            ("13".to_string(), 2),
            ("12".to_string(), 1),
            ("20".to_string(), 0),
            ("30".to_string(), 0),
            ("40".to_string(), 0),
        ]
    );

    let rows = fixture.engine.rows().to_vec();
    fixture.engine.replace_rows(rows);
    let forest = build_forest(fixture.engine.rows().to_vec());
    assert_eq!(flatten_visible(&forest, fixture.engine.expanded()).len(), 4);
}

#[tokio::test]
async fn reparented_row_moves_after_refresh() {
    let mut fixture = fixture("accounts").await;
    let mut bulk = BulkCoordinator::default();
    bulk.open_drafts(
        vec![BulkEditDraft::new("12").with_field("parent_id", "20")],
        Vec::new(),
    );
    bulk.submit_bulk_edit(&mut fixture.engine, &fixture.backend)
        .await
        .unwrap();

    let forest = build_forest(fixture.engine.rows().to_vec());
    assert_eq!(forest_size(&forest), fixture.engine.rows().len());
    assert_eq!(
        ids(forest[0].children.iter().map(|node| &node.row)),
        vec!["11"]
    );
    assert_eq!(
        ids(forest[1].children.iter().map(|node| &node.row)),
        vec!["12"]
    );
}

