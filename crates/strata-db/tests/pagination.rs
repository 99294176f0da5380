mod common;

use common::{edge_ranks, indexed_db, seed_ranked};
use strata_db::QueryParams;

fn by_rank() -> QueryParams {
    QueryParams {
        sort: Some("rank".to_string()),
        ..QueryParams::collection("posts")
    }
}

#[test]
fn first_page_and_has_next() {
    let db = indexed_db();
    seed_ranked(&db, 1..=10);

    let page = db
        .query(&QueryParams {
            first: Some(3),
            ..by_rank()
        })
        .unwrap();

    assert_eq!(edge_ranks(&page), vec![1, 2, 3]);
    assert!(page.page_info.has_next_page);
    assert!(!page.page_info.has_previous_page);
    assert_eq!(page.page_info.start_cursor, page.edges[0].cursor);
    assert_eq!(page.page_info.end_cursor, page.edges[2].cursor);
}

#[test]
fn after_cursor_returns_the_strict_successor_page() {
    let db = indexed_db();
    seed_ranked(&db, 1..=10);

    let first = db
        .query(&QueryParams {
            first: Some(3),
            ..by_rank()
        })
        .unwrap();
    let second = db
        .query(&QueryParams {
            first: Some(3),
            after: Some(first.page_info.end_cursor.clone()),
            ..by_rank()
        })
        .unwrap();

    // no overlap, no gap
    assert_eq!(edge_ranks(&second), vec![4, 5, 6]);
    assert!(second.page_info.has_next_page);
}

#[test]
fn paging_to_the_end_clears_has_next() {
    let db = indexed_db();
    seed_ranked(&db, 1..=5);

    let first = db
        .query(&QueryParams {
            first: Some(3),
            ..by_rank()
        })
        .unwrap();
    let rest = db
        .query(&QueryParams {
            first: Some(3),
            after: Some(first.page_info.end_cursor.clone()),
            ..by_rank()
        })
        .unwrap();

    assert_eq!(edge_ranks(&rest), vec![4, 5]);
    assert!(!rest.page_info.has_next_page);
}

#[test]
fn last_pages_backward_from_the_end() {
    let db = indexed_db();
    seed_ranked(&db, 1..=10);

    let page = db
        .query(&QueryParams {
            last: Some(2),
            ..by_rank()
        })
        .unwrap();

    assert_eq!(edge_ranks(&page), vec![10, 9]);
    assert!(page.page_info.has_previous_page);
    assert!(!page.page_info.has_next_page);
}

#[test]
fn before_cursor_continues_backward() {
    let db = indexed_db();
    seed_ranked(&db, 1..=10);

    let first = db
        .query(&QueryParams {
            last: Some(2),
            ..by_rank()
        })
        .unwrap();
    let second = db
        .query(&QueryParams {
            last: Some(2),
            before: Some(first.page_info.end_cursor.clone()),
            ..by_rank()
        })
        .unwrap();

    assert_eq!(edge_ranks(&second), vec![8, 7]);
}

#[test]
fn default_limit_is_fifty() {
    let db = indexed_db();
    seed_ranked(&db, 1..=60);

    let page = db.query(&by_rank()).unwrap();
    assert_eq!(page.edges.len(), 50);
    assert!(page.page_info.has_next_page);
}

#[test]
fn negative_one_means_unlimited() {
    let db = indexed_db();
    seed_ranked(&db, 1..=60);

    let page = db
        .query(&QueryParams {
            first: Some(-1),
            ..by_rank()
        })
        .unwrap();
    assert_eq!(page.edges.len(), 60);
    assert!(!page.page_info.has_next_page);
}

#[test]
fn empty_page_has_empty_cursors() {
    let db = indexed_db();
    let page = db.query(&by_rank()).unwrap();
    assert!(page.edges.is_empty());
    assert_eq!(page.page_info.start_cursor, "");
    assert_eq!(page.page_info.end_cursor, "");
    assert!(!page.page_info.has_next_page);
    assert!(!page.page_info.has_previous_page);
}

#[test]
fn cursor_pagination_composes_with_filters() {
    let db = indexed_db();
    seed_ranked(&db, 1..=10);

    let params = QueryParams {
        filters: vec![strata_db::Filter::new(
            "rank",
            strata_db::Condition::Gte(4.into()),
        )],
        first: Some(3),
        ..by_rank()
    };
    let first = db.query(&params).unwrap();
    assert_eq!(edge_ranks(&first), vec![4, 5, 6]);

    let second = db
        .query(&QueryParams {
            after: Some(first.page_info.end_cursor.clone()),
            ..params
        })
        .unwrap();
    assert_eq!(edge_ranks(&second), vec![7, 8, 9]);
}
