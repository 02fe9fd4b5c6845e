mod common;

use common::{fields, record, recording_executor};
use sqlkv::{
    BatchPolicies, BatchPolicy, ClientConfig, SqlKvError, Status, StatementKind,
};

fn row(idx: usize) -> sqlkv::Record {
    record(&[("field0", format!("v{idx}").as_str()), ("field1", "x")])
}

#[test]
fn test_threshold_sends_one_batch_with_all_rows() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::batched(3)));
    for idx in 0..3 {
        exec.insert(&format!("user{idx}"), &row(idx)).unwrap();
    }
    let batches = exec.connection().batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[0][0], fields(&["user0", "v0", "x"]));
    assert_eq!(exec.cache().pending_statements(), 0);
    assert_eq!(exec.stats().batches_executed, 1);
    assert_eq!(exec.stats().batched_rows, 3);
}

#[test]
fn test_switching_field_set_flushes_pending_batch_first() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::batched(3)));
    for idx in 0..2 {
        exec.insert(&format!("user{idx}"), &row(idx)).unwrap();
    }
    assert!(exec.connection().batches().is_empty());

    exec.insert("user9", &record(&[("field2", "other")])).unwrap();
    let batches = exec.connection().batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);

    let new_id = exec
        .cache()
        .lookup(StatementKind::Insert, ["field2"])
        .unwrap();
    assert_eq!(exec.active_statement(), Some(new_id));
    assert_eq!(exec.cache().get(new_id).pending_count(), 1);
    assert_eq!(exec.cache().pending_statements(), 1);
    assert_eq!(exec.stats().forced_flushes, 1);
}

#[test]
fn test_full_batch_then_different_field_set_starts_new_batch() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::batched(3)));
    for idx in 0..3 {
        exec.insert(&format!("user{idx}"), &row(idx)).unwrap();
    }
    exec.insert("user3", &record(&[("field5", "y")])).unwrap();
    assert_eq!(exec.connection().batches().len(), 1);
    assert_eq!(exec.stats().forced_flushes, 0);

    exec.flush().unwrap();
    let batches = exec.connection().batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1], &vec![fields(&["user3", "y"])]);
}

#[test]
fn test_at_most_one_statement_pending() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::batched(4)));
    let shapes: [&[(&str, &str)]; 3] = [
        &[("field0", "a")],
        &[("field1", "b")],
        &[("field0", "a"), ("field1", "b")],
    ];
    for idx in 0..30 {
        let values = record(shapes[idx % 3]);
        if idx % 2 == 0 {
            exec.insert(&format!("user{idx:03}"), &values).unwrap();
        } else {
            exec.update(&format!("user{:03}", idx - 1), &values).unwrap();
        }
        assert!(exec.cache().pending_statements() <= 1);
    }
}

#[test]
fn test_disabled_policy_executes_each_row() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::new(0, true)));
    for idx in 0..4 {
        exec.insert(&format!("user{idx}"), &row(idx)).unwrap();
    }
    assert!(exec.connection().batches().is_empty());
    assert_eq!(exec.connection().single_updates(), 4);
    assert_eq!(exec.stats().single_executions, 4);
}

#[test]
fn test_updates_need_batch_toggle_inserts_do_not() {
    let mut config = ClientConfig::default();
    config.batch_size = 5;
    let policies = BatchPolicies::from_config(&config);
    assert!(policies.insert.is_batching());
    assert!(!policies.update.is_batching());

    config.batch_updates = true;
    assert!(BatchPolicies::from_config(&config).update.is_batching());

    config.batch_size = 0;
    let policies = BatchPolicies::from_config(&config);
    assert!(!policies.insert.is_batching());
    assert!(!policies.update.is_batching());
}

#[test]
fn test_batch_failure_reported_to_triggering_operation() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::batched(10)));
    exec.insert("user1", &row(1)).unwrap();
    exec.insert("user2", &row(2)).unwrap();
    exec.connection_mut().fail_batches = true;

    let err = exec.read("user1", None).unwrap_err();
    assert!(matches!(err, SqlKvError::Execution(_)));
    assert_eq!(Status::from(&err), Status::Error);
    assert_eq!(exec.cache().pending_statements(), 0);

    exec.connection_mut().fail_batches = false;
    assert!(matches!(
        exec.read("user1", None),
        Err(SqlKvError::NotFound(_))
    ));
}

#[test]
fn test_duplicate_key_in_batch_fails_whole_batch() {
    let mut exec = recording_executor(BatchPolicies::uniform(BatchPolicy::batched(3)));
    exec.insert("user1", &row(1)).unwrap();
    exec.insert("user1", &row(2)).unwrap();
    let err = exec.insert("user2", &row(3)).unwrap_err();
    assert!(matches!(err, SqlKvError::Execution(_)));
    assert!(matches!(exec.read("user2", None), Err(SqlKvError::NotFound(_))));
}
