use tempfile::TempDir;

use rolodex::{
    contact::ContactDraft,
    core::store::ContactStore,
    op::StoredOp,
    persist::{OpSink, sqlite::SqliteOpSink},
};

fn draft(first: &str, email: &str) -> ContactDraft {
    ContactDraft {
        first_name: first.to_string(),
        last_name: "Example".to_string(),
        email: email.to_string(),
        phone_number: "555-0100".to_string(),
        company: None,
        job_title: None,
    }
}

#[test]
fn journal_replay_rebuilds_state_and_email_index() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("journal.db");

    let mut store = ContactStore::new();
    let mut sink = SqliteOpSink::open(&db_path).expect("open sqlite");
    let mut journal: Vec<StoredOp> = Vec::new();

    let (ada, op) = store.create(draft("Ada", "ada@example.com")).expect("create");
    journal.push(op);
    let (grace, op) = store
        .create(draft("Grace", "grace@example.com"))
        .expect("create");
    journal.push(op);

    // The replace changes the email so replay has to rebuild the index.
    let (_, op) = store
        .replace(ada.id, draft("Ada", "lovelace@example.com"))
        .expect("replace");
    journal.push(op);
    let (_, op) = store.remove(grace.id).expect("remove");
    journal.push(op);

    sink.append_ops(&journal).expect("append");
    drop(sink);

    let reopened = SqliteOpSink::open(&db_path).expect("reopen");
    let replayed = reopened.load_store().expect("replay");

    // Full snapshot equality covers order, records, and both counters.
    assert_eq!(replayed.export_snapshot(), store.export_snapshot());
    assert_eq!(
        replayed.find_by_email("lovelace@example.com").map(|c| c.id),
        Some(ada.id)
    );
    assert!(replayed.find_by_email("grace@example.com").is_none());
}

#[test]
fn snapshot_plus_tail_ops_reload_identically() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("compact.db");

    let mut store = ContactStore::new();
    let mut sink = SqliteOpSink::open(&db_path).expect("open sqlite");

    let mut journal = Vec::new();
    for i in 0..10u64 {
        let (_, op) = store
            .create(draft(&format!("User{i}"), &format!("user{i}@example.com")))
            .expect("create");
        journal.push(op);
    }
    sink.append_ops(&journal).expect("append");

    let snapshot = store.export_snapshot();
    let last_seq = store.latest_op_seq();
    sink.write_snapshot(&snapshot, last_seq).expect("snapshot");
    let removed = sink.compact_through(last_seq).expect("compact");
    assert_eq!(removed, 10);
    assert_eq!(sink.latest_seq().expect("latest"), 0);
    drop(sink);

    let mut sink = SqliteOpSink::open(&db_path).expect("reopen");
    let mut replayed = sink.load_store().expect("replay");
    assert_eq!(replayed.export_snapshot(), snapshot);

    // Writes after compaction land as tail ops beyond the snapshot.
    let (eleventh, op) = replayed
        .create(draft("User10", "user10@example.com"))
        .expect("create");
    sink.append_ops(&[op]).expect("append tail");
    assert_eq!(sink.latest_seq().expect("latest"), 11);
    drop(sink);

    let reopened = SqliteOpSink::open(&db_path).expect("reopen");
    let tailed = reopened.load_store().expect("replay");
    assert_eq!(tailed.ordered_ids().len(), 11);
    assert_eq!(tailed.get(eleventh.id).map(|c| c.email.as_str()), Some("user10@example.com"));
    assert_eq!(tailed.export_snapshot(), replayed.export_snapshot());
}

#[test]
fn contact_ids_stay_retired_across_restarts() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("retire.db");

    let mut store = ContactStore::new();
    let mut sink = SqliteOpSink::open(&db_path).expect("open sqlite");

    let mut journal = Vec::new();
    for i in 0..3u64 {
        let (_, op) = store
            .create(draft(&format!("User{i}"), &format!("user{i}@example.com")))
            .expect("create");
        journal.push(op);
    }
    let (_, op) = store.remove(3).expect("remove");
    journal.push(op);
    sink.append_ops(&journal).expect("append");
    drop(sink);

    let reopened = SqliteOpSink::open(&db_path).expect("reopen");
    let mut replayed = reopened.load_store().expect("replay");

    // Pure event replay still retires id 3; the next create takes 4.
    let (fresh, _) = replayed
        .create(draft("User3", "user3@example.com"))
        .expect("create");
    assert_eq!(fresh.id, 4);
    assert_eq!(replayed.ordered_ids(), [1, 2, 4]);
}
