use baseapp_core::db::open_db_in_memory;
use baseapp_core::{
    CascadeEdge, Record, RecordQuery, RecordStatus, RecordStore, RecordView, RepoError,
    SqliteRecordStore,
};
use uuid::Uuid;

fn comment_edge() -> CascadeEdge {
    CascadeEdge {
        related_label: "blog.Comment".to_string(),
        foreign_key: "post".to_string(),
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let record = Record::new("blog.Post", "first post");
    let id = store.create_record(&record).unwrap();

    let loaded = store.get_record(id).unwrap().unwrap();
    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.label, "blog.Post");
    assert_eq!(loaded.display, "first post");
    assert_eq!(loaded.status, RecordStatus::Online);
    assert_eq!(loaded.deleted_at, None);
    assert!(loaded.created_at > 0);
    assert_eq!(loaded.created_at, loaded.updated_at);
}

#[test]
fn save_updates_status_and_display() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let mut record = Record::new("blog.Post", "draft title");
    store.create_record(&record).unwrap();

    record.display = "final title".to_string();
    record.set_status(RecordStatus::Offline).unwrap();
    store.save_record(&record).unwrap();

    let loaded = store.get_record(record.id).unwrap().unwrap();
    assert_eq!(loaded.display, "final title");
    assert_eq!(loaded.status, RecordStatus::Offline);
}

#[test]
fn save_missing_record_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let record = Record::new("blog.Post", "missing");
    let err = store.save_record(&record).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == record.id));
}

#[test]
fn validation_failure_blocks_writes() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let bad_label = Record::new("Post", "no app");
    assert!(matches!(
        store.create_record(&bad_label).unwrap_err(),
        RepoError::Validation(_)
    ));

    let mut record = Record::new("blog.Post", "ok");
    store.create_record(&record).unwrap();
    record.deleted_at = Some(1);
    assert!(matches!(
        store.save_record(&record).unwrap_err(),
        RepoError::Validation(_)
    ));
}

#[test]
fn corrupt_rows_are_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let record = Record::new("blog.Post", "ok");
    store.create_record(&record).unwrap();
    conn.execute(
        "UPDATE records SET label = 'not-a-label' WHERE id = ?1;",
        [record.id.to_string()],
    )
    .unwrap();

    let err = store.get_record(record.id).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn list_filters_by_label_and_view() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let post = Record::new("blog.Post", "post");
    let mut tombstoned = Record::new("blog.Post", "gone");
    tombstoned.mark_deleted(1_700_000_000_000);
    let tag = Record::new("blog.Tag", "tag");
    for record in [&post, &tombstoned, &tag] {
        store.create_record(record).unwrap();
    }

    let visible = store
        .list_records(&RecordQuery::of("blog.Post", RecordView::Visible))
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, post.id);

    let deleted = store
        .list_records(&RecordQuery::of("blog.Post", RecordView::Deleted))
        .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].deleted_at, Some(1_700_000_000_000));

    let everything = store.list_records(&RecordQuery {
        view: RecordView::Everything,
        ..RecordQuery::default()
    });
    assert_eq!(everything.unwrap().len(), 3);
}

#[test]
fn view_membership_matches_sql_filter() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let online = Record::new("blog.Post", "online");
    let mut offline = Record::new("blog.Post", "offline");
    offline.set_status(RecordStatus::Offline).unwrap();
    let mut draft = Record::new("blog.Post", "draft");
    draft.set_status(RecordStatus::Draft).unwrap();
    let mut gone = Record::new("blog.Post", "gone");
    gone.mark_deleted(1_700_000_000_000);
    for record in [&online, &offline, &draft, &gone] {
        store.create_record(record).unwrap();
    }

    let all = store
        .list_records(&RecordQuery::of("blog.Post", RecordView::Everything))
        .unwrap();
    for view in [
        RecordView::Visible,
        RecordView::Deleted,
        RecordView::Offlined,
        RecordView::Drafted,
        RecordView::Everything,
    ] {
        let listed: Vec<Uuid> = store
            .list_records(&RecordQuery::of("blog.Post", view))
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        let filtered: Vec<Uuid> = all
            .iter()
            .filter(|record| view.contains(record))
            .map(|record| record.id)
            .collect();
        assert_eq!(listed, filtered, "view {view:?}");
    }
}

#[test]
fn list_pagination_follows_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let ids: Vec<Uuid> = ["c", "a", "b"]
        .iter()
        .map(|display| {
            let record = Record::new("blog.Post", *display);
            store.create_record(&record).unwrap()
        })
        .collect();
    conn.execute("UPDATE records SET created_at = 1234567890000;", [])
        .unwrap();

    let page = store
        .list_records(&RecordQuery {
            limit: Some(2),
            offset: 1,
            ..RecordQuery::of("blog.Post", RecordView::Visible)
        })
        .unwrap();
    assert_eq!(
        page.iter().map(|record| record.id).collect::<Vec<_>>(),
        ids[1..].to_vec()
    );

    let tail = store
        .list_records(&RecordQuery {
            offset: 2,
            ..RecordQuery::of("blog.Post", RecordView::Visible)
        })
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].id, ids[2]);
}

#[test]
fn related_records_follow_links_for_one_edge() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let post = Record::new("blog.Post", "post");
    let other_post = Record::new("blog.Post", "other");
    let comment = Record::new("blog.Comment", "mine");
    let foreign = Record::new("blog.Comment", "theirs");
    let tag = Record::new("blog.Tag", "same fk, other label");
    for record in [&post, &other_post, &comment, &foreign, &tag] {
        store.create_record(record).unwrap();
    }
    store.link_record(comment.id, "post", post.id).unwrap();
    store.link_record(foreign.id, "post", other_post.id).unwrap();
    store.link_record(tag.id, "post", post.id).unwrap();

    let related = store
        .related_records(post.id, &comment_edge(), RecordView::Visible)
        .unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, comment.id);

    let deleted = store
        .related_records(post.id, &comment_edge(), RecordView::Deleted)
        .unwrap();
    assert!(deleted.is_empty());
}

#[test]
fn relinking_replaces_previous_owner() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let first = Record::new("blog.Post", "first");
    let second = Record::new("blog.Post", "second");
    let comment = Record::new("blog.Comment", "moving");
    for record in [&first, &second, &comment] {
        store.create_record(record).unwrap();
    }

    store.link_record(comment.id, "post", first.id).unwrap();
    store.link_record(comment.id, "post", second.id).unwrap();

    let edge = comment_edge();
    assert!(store
        .related_records(first.id, &edge, RecordView::Everything)
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .related_records(second.id, &edge, RecordView::Everything)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn linking_unknown_record_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::new(&conn);

    let comment = Record::new("blog.Comment", "orphan");
    store.create_record(&comment).unwrap();
    let missing = Uuid::new_v4();

    let err = store.link_record(comment.id, "post", missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}
