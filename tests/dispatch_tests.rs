//! End-to-end tests for the dispatch protocol: submission pairing, the
//! check-in state machine, and the documented correlation gaps.

use std::sync::Arc;

use listenpost_tasks::store::memory::InMemoryDispatchStore;
use listenpost_tasks::{
    parse_result_batch, DispatchError, Dispatcher, ResultSubmission, TaskSpec,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(InMemoryDispatchStore::new()))
}

#[tokio::test]
async fn submitting_n_specs_grows_pending_and_history_by_n() {
    let dispatcher = dispatcher();
    let specs: Vec<_> = (0..7)
        .map(|n| TaskSpec::new("shell").with_option("cmd", format!("step-{n}")))
        .collect();
    let issued = dispatcher.submit(specs).await.unwrap();

    assert_eq!(issued.len(), 7);
    let pending = dispatcher.list_pending().await.unwrap();
    assert_eq!(pending.len(), 7);

    let history = dispatcher.list_history().await.unwrap();
    assert_eq!(history.len(), 7);
    for (task, entry) in issued.iter().zip(&history) {
        assert_eq!(task.task_id, entry.task_id);
    }

    // All ids distinct.
    let mut ids: Vec<_> = issued.iter().map(|t| t.task_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 7);
}

#[tokio::test]
async fn empty_options_submission_succeeds() {
    let dispatcher = dispatcher();
    let issued = dispatcher.submit(vec![TaskSpec::new("sleep")]).await.unwrap();
    assert!(issued[0].options.is_empty());

    let history = dispatcher.list_history().await.unwrap();
    assert!(history[0].task_options.is_empty());
}

#[tokio::test]
async fn shell_whoami_scenario() {
    let dispatcher = dispatcher();

    // Operator submits one shell task.
    let issued = dispatcher
        .submit(vec![TaskSpec::new("shell").with_option("cmd", "whoami")])
        .await
        .unwrap();
    let task_id = issued[0].task_id.clone();

    let pending = dispatcher.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_type, "shell");
    assert_eq!(pending[0].options["cmd"], "whoami");

    let history = dispatcher.list_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].task_id, task_id);
    assert_eq!(history[0].task_options, vec!["cmd: whoami"]);

    // Agent polls empty-handed and receives the task.
    let report = dispatcher.check_in(Vec::new()).await.unwrap();
    assert_eq!(report.tasks().len(), 1);
    assert_eq!(report.tasks()[0].task_id, task_id);
    assert!(dispatcher.list_pending().await.unwrap().is_empty());

    // Agent reports the result; nothing new is pending.
    let report = dispatcher
        .check_in(vec![ResultSubmission::new(&task_id)
            .with_field("contents", "root")
            .with_field("success", "true")])
        .await
        .unwrap();
    assert!(report.tasks().is_empty());

    let results = dispatcher.list_results().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].task_id, task_id);
    assert_eq!(results[0].fields["contents"], "root");
    assert_eq!(results[0].fields["success"], "true");
}

#[tokio::test]
async fn wire_batch_flows_through_check_in() {
    let dispatcher = dispatcher();
    let body = json!([
        {"task-a": {"contents": "uid=0(root)", "success": "true"}},
        {"task-b": {"contents": "", "success": false}}
    ]);
    let batch = parse_result_batch(&body).unwrap();
    let report = dispatcher.check_in(batch).await.unwrap();
    assert_eq!(report.ingested.len(), 2);

    let results = dispatcher.list_results().await.unwrap();
    assert_eq!(results[1].fields["success"], "false");
}

#[tokio::test]
async fn malformed_wire_batch_rejected_as_a_whole() {
    let body = json!([
        {"task-a": {"contents": "fine"}},
        {}
    ]);
    let err = parse_result_batch(&body).unwrap_err();
    assert!(matches!(err, DispatchError::MalformedBatch { index: 1, .. }));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn results_for_drained_tasks_are_accepted() {
    let dispatcher = dispatcher();
    let issued = dispatcher.submit(vec![TaskSpec::new("shell")]).await.unwrap();
    let task_id = issued[0].task_id.clone();

    // Drain delivers the task; its pending record is gone.
    dispatcher.check_in(Vec::new()).await.unwrap();

    // The late result still lands — correlation is by id only.
    dispatcher
        .check_in(vec![ResultSubmission::new(&task_id).with_field("contents", "late")])
        .await
        .unwrap();
    let results = dispatcher.list_results().await.unwrap();
    assert_eq!(results[0].task_id, task_id);
}

#[tokio::test]
async fn history_results_field_stays_empty() {
    // Known gap, kept deliberately: results are correlated through the
    // results collection, never written back into history entries.
    let dispatcher = dispatcher();
    let issued = dispatcher.submit(vec![TaskSpec::new("shell")]).await.unwrap();
    let task_id = issued[0].task_id.clone();

    dispatcher.check_in(Vec::new()).await.unwrap();
    dispatcher
        .check_in(vec![ResultSubmission::new(&task_id).with_field("contents", "root")])
        .await
        .unwrap();

    let history = dispatcher.list_history().await.unwrap();
    assert!(history[0].task_results.is_empty());
}

#[tokio::test]
async fn interleaved_submissions_and_check_ins() {
    let dispatcher = dispatcher();

    dispatcher.submit(vec![TaskSpec::new("first")]).await.unwrap();
    let one = dispatcher.check_in(Vec::new()).await.unwrap();
    assert_eq!(one.tasks()[0].task_type, "first");

    dispatcher.submit(vec![TaskSpec::new("second")]).await.unwrap();
    dispatcher.submit(vec![TaskSpec::new("third")]).await.unwrap();
    let two = dispatcher.check_in(Vec::new()).await.unwrap();
    let types: Vec<_> = two.tasks().iter().map(|t| t.task_type.as_str()).collect();
    assert_eq!(types, vec!["second", "third"]);

    assert!(two.batch.version > one.batch.version);
    assert_eq!(dispatcher.list_history().await.unwrap().len(), 3);
}

#[tokio::test]
async fn batch_limit_applies_to_submissions() {
    use listenpost_tasks::store::StoreConfig;
    let store = InMemoryDispatchStore::new().with_config(StoreConfig {
        max_batch_items: 2,
        ..StoreConfig::default()
    });
    let dispatcher = Dispatcher::new(Arc::new(store));
    let err = dispatcher
        .submit(vec![
            TaskSpec::new("a"),
            TaskSpec::new("b"),
            TaskSpec::new("c"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation { .. }));
    assert!(dispatcher.list_pending().await.unwrap().is_empty());
}
