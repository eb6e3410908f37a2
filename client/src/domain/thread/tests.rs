//! Behavioural tests for thread state, the optimistic store, and the loader.

use std::sync::Arc;

use rstest::{fixture, rstest};
use tokio::sync::broadcast::error::TryRecvError;

use super::state::ThreadState;
use super::*;
use crate::domain::ports::CommentApiError;
use crate::domain::{CommentDraft, ErrorCode};
use crate::test_support::comments::{CallQueue, CallRequest, ControlledCommentApi, PendingCall};

fn post(raw: i64) -> PostId {
    PostId::new(raw).expect("valid post id")
}

fn comment(id: i64, post_id: i64, content: &str) -> Comment {
    Comment::new(
        CommentId::new(id).expect("valid comment id"),
        post(post_id),
        "ada",
        content,
    )
}

fn draft(content: &str) -> CommentDraft {
    CommentDraft::try_new("ada", content).expect("valid draft")
}

fn keys(view: &ThreadView) -> Vec<i64> {
    view.entries().iter().map(ViewEntry::key).collect()
}

fn confirmed_ids(comments: &[Comment]) -> Vec<i64> {
    comments.iter().map(|c| c.id().get()).collect()
}

fn content_of(call: &PendingCall) -> String {
    match call.request() {
        CallRequest::Create(request) => request.content.clone(),
        other => panic!("expected a create call, got {other:?}"),
    }
}

mod state {
    //! Pure transitions of the tagged entry collection.
    use super::*;

    #[fixture]
    fn loaded() -> ThreadState {
        let mut state = ThreadState::default();
        let ticket = state.begin_thread(post(1));
        assert!(state.apply_load(ticket, vec![comment(1, 1, "one"), comment(2, 1, "two")]));
        state
    }

    #[rstest]
    fn view_follows_server_order(loaded: ThreadState) {
        assert_eq!(keys(&loaded.view()), vec![1, 2]);
        assert_eq!(loaded.view().post_id(), Some(post(1)));
    }

    #[rstest]
    fn duplicate_ids_in_a_listing_are_collapsed() {
        let mut state = ThreadState::default();
        let ticket = state.begin_thread(post(1));
        state.apply_load(ticket, vec![comment(1, 1, "a"), comment(1, 1, "b")]);
        assert_eq!(state.confirmed().len(), 1);
    }

    #[rstest]
    fn speculative_entries_sit_at_the_tail_with_disjoint_keys(mut loaded: ThreadState) {
        let first = loaded.begin_create(draft("x")).expect("create");
        let second = loaded.begin_create(draft("y")).expect("create");

        let view = loaded.view();
        assert_eq!(
            keys(&view),
            vec![
                1,
                2,
                first.temporary_id().as_sentinel(),
                second.temporary_id().as_sentinel()
            ]
        );
        assert_ne!(first.temporary_id(), second.temporary_id());
        for entry in view.entries().iter().filter(|e| !e.is_confirmed()) {
            assert!(entry.key() < 0);
        }
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![1, 2]);
    }

    #[rstest]
    fn creates_need_a_thread() {
        let mut state = ThreadState::default();
        let error = state.begin_create(draft("x")).expect_err("no thread");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn acknowledgements_land_in_server_order(mut loaded: ThreadState) {
        let a = loaded.begin_create(draft("A")).expect("create A");
        let b = loaded.begin_create(draft("B")).expect("create B");

        assert!(loaded.confirm_create(b.temporary_id(), comment(11, 1, "B")));
        assert_eq!(
            keys(&loaded.view()),
            vec![1, 2, 11, a.temporary_id().as_sentinel()]
        );

        assert!(loaded.confirm_create(a.temporary_id(), comment(10, 1, "A")));
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![1, 2, 11, 10]);
    }

    #[rstest]
    fn confirmed_comment_already_listed_is_not_duplicated(mut loaded: ThreadState) {
        let pending = loaded.begin_create(draft("three")).expect("create");
        let ticket = loaded.begin_thread(post(1));
        loaded.apply_load(
            ticket,
            vec![comment(1, 1, "one"), comment(2, 1, "two"), comment(3, 1, "three")],
        );

        assert!(loaded.confirm_create(pending.temporary_id(), comment(3, 1, "three")));
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![1, 2, 3]);
        assert_eq!(loaded.view().len(), 3);
    }

    #[rstest]
    fn rejected_create_removes_only_its_placeholder(mut loaded: ThreadState) {
        let a = loaded.begin_create(draft("A")).expect("create A");
        let b = loaded.begin_create(draft("B")).expect("create B");

        assert!(loaded.reject_create(a.temporary_id()));
        assert_eq!(keys(&loaded.view()), vec![1, 2, b.temporary_id().as_sentinel()]);
        assert!(!loaded.reject_create(a.temporary_id()));
    }

    #[rstest]
    fn reload_of_the_same_thread_keeps_pending_entries(mut loaded: ThreadState) {
        let pending = loaded.begin_create(draft("new")).expect("create");
        let ticket = loaded.begin_delete(CommentId::new(1).expect("id")).expect("delete");

        let reload = loaded.begin_thread(post(1));
        assert!(loaded.apply_load(
            reload,
            vec![comment(1, 1, "one"), comment(2, 1, "two"), comment(5, 1, "five")],
        ));

        let view = loaded.view();
        assert_eq!(keys(&view), vec![2, 5, pending.temporary_id().as_sentinel()]);
        assert_eq!(view.hidden(), [ticket.comment_id()]);
    }

    #[rstest]
    fn tombstones_for_vanished_comments_are_dropped_on_reload(mut loaded: ThreadState) {
        let ticket = loaded.begin_delete(CommentId::new(1).expect("id")).expect("delete");
        let reload = loaded.begin_thread(post(1));
        loaded.apply_load(reload, vec![comment(2, 1, "two")]);

        assert!(loaded.view().hidden().is_empty());
        assert!(!loaded.reject_delete(ticket));
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![2]);
    }

    #[rstest]
    fn stale_listings_are_ignored(mut loaded: ThreadState) {
        let stale = loaded.begin_thread(post(1));
        let fresh = loaded.begin_thread(post(1));

        assert!(!loaded.apply_load(stale, vec![comment(9, 1, "stale")]));
        assert!(loaded.apply_load(fresh, vec![comment(3, 1, "fresh")]));
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![3]);
    }

    #[rstest]
    fn switching_threads_discards_everything_of_the_old_one(mut loaded: ThreadState) {
        let pending = loaded.begin_create(draft("late")).expect("create");
        let old = loaded.begin_thread(post(1));
        let _new = loaded.begin_thread(post(2));

        assert!(loaded.view().is_empty());
        assert!(!loaded.apply_load(old, vec![comment(1, 1, "one")]));
        assert!(!loaded.confirm_create(pending.temporary_id(), comment(7, 1, "late")));
        assert!(loaded.view().is_empty());
    }

    #[rstest]
    fn delete_hides_then_restores_in_place(mut loaded: ThreadState) {
        let id = CommentId::new(1).expect("id");
        let ticket = loaded.begin_delete(id).expect("delete");

        let view = loaded.view();
        assert_eq!(keys(&view), vec![2]);
        assert_eq!(view.hidden(), [id]);
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![1, 2]);

        assert!(loaded.reject_delete(ticket));
        assert_eq!(loaded.view().entries().first(), Some(&ViewEntry::Confirmed(comment(1, 1, "one"))));
        assert_eq!(keys(&loaded.view()), vec![1, 2]);
    }

    #[rstest]
    fn confirmed_delete_removes_the_comment(mut loaded: ThreadState) {
        let ticket = loaded
            .begin_delete(CommentId::new(2).expect("id"))
            .expect("delete");
        assert!(loaded.confirm_delete(ticket));
        assert_eq!(confirmed_ids(&loaded.confirmed()), vec![1]);
        assert!(loaded.view().hidden().is_empty());
    }

    #[rstest]
    #[case(1, ErrorCode::InvalidRequest)]
    #[case(42, ErrorCode::InvalidRequest)]
    fn second_or_unknown_deletes_are_refused(
        mut loaded: ThreadState,
        #[case] raw: i64,
        #[case] code: ErrorCode,
    ) {
        loaded
            .begin_delete(CommentId::new(1).expect("id"))
            .expect("first delete");
        let error = loaded
            .begin_delete(CommentId::new(raw).expect("id"))
            .expect_err("refused");
        assert_eq!(error.code(), code);
    }

    #[rstest]
    fn old_delete_answers_do_not_touch_a_newer_tombstone(mut loaded: ThreadState) {
        let id = CommentId::new(1).expect("id");
        let old = loaded.begin_delete(id).expect("first delete");
        loaded.begin_thread(post(2));
        let back = loaded.begin_thread(post(1));
        loaded.apply_load(back, vec![comment(1, 1, "one")]);
        let fresh = loaded.begin_delete(id).expect("second delete");

        assert!(!loaded.reject_delete(old));
        assert_eq!(loaded.view().hidden(), [id]);
        assert!(loaded.confirm_delete(fresh));
    }
}

mod store {
    //! The store against a controlled comment API.
    use super::*;

    async fn loaded_store(comments: Vec<Comment>) -> (OptimisticCommentStore, CallQueue) {
        let (api, mut calls) = ControlledCommentApi::new();
        let store = OptimisticCommentStore::new(Arc::new(api));
        let load = tokio::spawn(store.load(post(1)));
        calls.next().await.reply_list(Ok(comments));
        let outcome = load.await.expect("load task").expect("load succeeds");
        assert!(matches!(outcome, LoadOutcome::Applied { .. }));
        (store, calls)
    }

    #[rstest]
    #[tokio::test]
    async fn placeholder_is_visible_before_the_request_is_sent() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;

        let pending = store.submit_create(draft("hello"));
        let view = store.view();
        assert_eq!(view.len(), 2);
        assert!(!view.entries().last().expect("entry").is_confirmed());
        assert!(!calls.has_pending());

        let task = tokio::spawn(pending);
        let call = calls.next().await;
        assert_eq!(content_of(&call), "hello");
        call.reply_create(Ok(comment(2, 1, "hello")));

        let created = task.await.expect("task").expect("created");
        assert_eq!(created.id().get(), 2);
        assert_eq!(keys(&store.view()), vec![1, 2]);
    }

    #[rstest]
    #[tokio::test]
    async fn confirmed_count_matches_acknowledgements() {
        let (store, mut calls) = loaded_store(Vec::new()).await;
        let mut tasks = Vec::new();
        for content in ["a", "b", "c"] {
            tasks.push(tokio::spawn(store.submit_create(draft(content))));
        }
        let mut next_id = 100;
        for _ in 0..3 {
            let call = calls.next().await;
            let content = content_of(&call);
            call.reply_create(Ok(comment(next_id, 1, &content)));
            next_id += 1;
        }
        for task in tasks {
            task.await.expect("task").expect("created");
        }

        let confirmed = store.confirmed().expect("confirmed");
        assert_eq!(confirmed.len(), 3);
        assert!(confirmed.iter().all(|c| c.id().get() >= 100));
        assert!(store.view().entries().iter().all(ViewEntry::is_confirmed));
    }

    #[rstest]
    #[tokio::test]
    async fn acknowledgement_order_beats_submission_order() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let a = tokio::spawn(store.submit_create(draft("A")));
        let b = tokio::spawn(store.submit_create(draft("B")));

        let first = calls.next().await;
        let second = calls.next().await;
        let (call_a, call_b) = if content_of(&first) == "A" {
            (first, second)
        } else {
            (second, first)
        };

        call_b.reply_create(Ok(comment(11, 1, "B")));
        b.await.expect("task").expect("B confirmed");
        let view = store.view();
        assert_eq!(keys(&view).first().copied(), Some(1));
        assert_eq!(keys(&view).get(1).copied(), Some(11));
        assert!(!view.entries().last().expect("entry").is_confirmed());

        call_a.reply_create(Ok(comment(10, 1, "A")));
        a.await.expect("task").expect("A confirmed");
        assert_eq!(
            confirmed_ids(&store.confirmed().expect("confirmed")),
            vec![1, 11, 10]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn rejected_create_is_rolled_back_and_reported_once() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let mut events = store.events();

        let task = tokio::spawn(store.submit_create(draft("nope")));
        calls
            .next()
            .await
            .reply_create(Err(CommentApiError::rejected(422_u16, "too short")));

        let error = task.await.expect("task").expect_err("rejected");
        assert_eq!(error.code(), ErrorCode::MutationRejected);
        assert_eq!(
            error.details().and_then(|d| d.get("status")).and_then(|s| s.as_u64()),
            Some(422)
        );
        assert_eq!(keys(&store.view()), vec![1]);

        let event = events.try_recv().expect("one event");
        assert!(matches!(
            event,
            ThreadEvent::MutationRejected {
                mutation: MutationKind::Create { .. },
                ..
            }
        ));
        assert_eq!(events.try_recv().err(), Some(TryRecvError::Empty));
    }

    #[rstest]
    #[tokio::test]
    async fn failed_delete_restores_the_comment_unchanged() {
        let original = comment(1, 1, "one");
        let (store, mut calls) = loaded_store(vec![original.clone()]).await;
        let id = original.id();

        let pending = store.submit_delete(id);
        assert!(store.view().is_empty());
        assert_eq!(store.view().hidden(), [id]);

        let task = tokio::spawn(pending);
        let call = calls.next().await;
        assert_eq!(call.request(), &CallRequest::Delete(id));
        call.reply_delete(Err(CommentApiError::transport("connection reset")));

        let error = task.await.expect("task").expect_err("delete failed");
        assert_eq!(error.code(), ErrorCode::MutationRejected);
        assert_eq!(store.view().entries(), [ViewEntry::Confirmed(original)]);
        assert!(store.view().hidden().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn confirmed_delete_emits_an_event() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let mut events = store.events();
        let id = CommentId::new(1).expect("id");

        let task = tokio::spawn(store.submit_delete(id));
        calls.next().await.reply_delete(Ok(()));
        task.await.expect("task").expect("deleted");

        assert!(store.view().is_empty());
        assert_eq!(
            events.try_recv().expect("event"),
            ThreadEvent::DeleteConfirmed { comment_id: id }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn second_delete_while_pending_is_refused_synchronously() {
        let (store, _calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let id = CommentId::new(1).expect("id");

        let _first = store.submit_delete(id);
        let error = store.submit_delete(id).await.expect_err("refused");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn newer_load_supersedes_an_older_one() {
        let (api, mut calls) = ControlledCommentApi::new();
        let store = OptimisticCommentStore::new(Arc::new(api));

        let first = tokio::spawn(store.load(post(1)));
        let stale_call = calls.next().await;
        let second = tokio::spawn(store.load(post(2)));

        assert_eq!(
            first.await.expect("task").expect("superseded"),
            LoadOutcome::Superseded
        );
        stale_call.reply_list(Ok(vec![comment(1, 1, "stale")]));

        let call = calls.next().await;
        assert_eq!(call.request(), &CallRequest::List(post(2)));
        call.reply_list(Ok(vec![comment(5, 2, "fresh")]));
        second.await.expect("task").expect("loaded");

        assert_eq!(store.post_id(), Some(post(2)));
        assert_eq!(keys(&store.view()), vec![5]);
    }

    #[rstest]
    #[tokio::test]
    async fn reload_keeps_in_flight_creates() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let create = tokio::spawn(store.submit_create(draft("mine")));
        let create_call = calls.next().await;

        let reload = tokio::spawn(store.load(post(1)));
        calls
            .next()
            .await
            .reply_list(Ok(vec![comment(1, 1, "one"), comment(2, 1, "theirs")]));
        reload.await.expect("task").expect("reloaded");
        assert_eq!(store.view().len(), 3);

        create_call.reply_create(Ok(comment(3, 1, "mine")));
        create.await.expect("task").expect("created");
        assert_eq!(keys(&store.view()), vec![1, 2, 3]);
    }

    #[rstest]
    #[tokio::test]
    async fn load_failure_keeps_state_and_emits_an_event() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let mut events = store.events();

        let reload = tokio::spawn(store.load(post(1)));
        calls
            .next()
            .await
            .reply_list(Err(CommentApiError::timeout("after 10s")));

        let error = reload.await.expect("task").expect_err("load failed");
        assert_eq!(error.code(), ErrorCode::LoadFailed);
        assert_eq!(keys(&store.view()), vec![1]);
        assert!(matches!(
            events.try_recv().expect("event"),
            ThreadEvent::LoadFailed { .. }
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn close_aborts_in_flight_calls_and_drops_late_results() {
        let (store, mut calls) = loaded_store(vec![comment(1, 1, "one")]).await;
        let create = tokio::spawn(store.submit_create(draft("late")));
        let call = calls.next().await;
        let before = store.view();

        store.close();
        let error = create.await.expect("task").expect_err("cancelled");
        assert_eq!(error.code(), ErrorCode::Cancelled);
        call.reply_create(Ok(comment(2, 1, "late")));

        assert_eq!(store.view(), before);
        assert!(store.is_closed());
        let refused = store.load(post(1)).await.expect_err("closed");
        assert_eq!(refused.code(), ErrorCode::Cancelled);
    }

    #[rstest]
    #[tokio::test]
    async fn subscribers_see_the_speculative_view() {
        let (store, _calls) = loaded_store(Vec::new()).await;
        let mut views = store.subscribe();
        views.borrow_and_update();

        let _pending = store.submit_create(draft("watch me"));
        assert!(views.has_changed().expect("sender alive"));
        assert_eq!(views.borrow_and_update().len(), 1);
    }
}

mod loader {
    //! Thread loader de-duplication.
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn showing_the_same_thread_twice_loads_once() {
        let (api, mut calls) = ControlledCommentApi::new();
        let loader = ThreadLoader::new(OptimisticCommentStore::new(Arc::new(api)));

        let first = tokio::spawn(loader.show(post(1)));
        calls.next().await.reply_list(Ok(vec![comment(1, 1, "one")]));
        assert!(matches!(
            first.await.expect("task").expect("shown"),
            ShowOutcome::Loaded(LoadOutcome::Applied { .. })
        ));

        let again = loader.show(post(1)).await.expect("no-op");
        assert_eq!(again, ShowOutcome::Unchanged);
        assert!(!calls.has_pending());
        assert_eq!(loader.current(), Some(post(1)));
    }

    #[rstest]
    #[tokio::test]
    async fn new_thread_supersedes_the_old_load() {
        let (api, mut calls) = ControlledCommentApi::new();
        let loader = ThreadLoader::new(OptimisticCommentStore::new(Arc::new(api)));

        let old = tokio::spawn(loader.show(post(1)));
        let _old_call = calls.next().await;
        let new = tokio::spawn(loader.show(post(2)));

        assert_eq!(
            old.await.expect("task").expect("superseded"),
            ShowOutcome::Loaded(LoadOutcome::Superseded)
        );
        calls.next().await.reply_list(Ok(vec![comment(4, 2, "four")]));
        new.await.expect("task").expect("shown");
        assert_eq!(keys(&loader.store().view()), vec![4]);
    }

    #[rstest]
    #[tokio::test]
    async fn refused_loads_do_not_count_as_shown() {
        let (api, _calls) = ControlledCommentApi::new();
        let loader = ThreadLoader::new(OptimisticCommentStore::new(Arc::new(api)));
        loader.store().close();

        let error = loader.show(post(1)).await.expect_err("store is closed");
        assert_eq!(error.code(), ErrorCode::Cancelled);
        assert_eq!(loader.current(), None);
        assert_eq!(loader.store().post_id(), None);

        let again = loader.show(post(1)).await.expect_err("still closed");
        assert_eq!(again.code(), ErrorCode::Cancelled);
    }

    #[rstest]
    #[tokio::test]
    async fn refresh_needs_a_thread() {
        let (api, _calls) = ControlledCommentApi::new();
        let loader = ThreadLoader::new(OptimisticCommentStore::new(Arc::new(api)));
        let error = loader.refresh().await.expect_err("nothing shown");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn refresh_reloads_the_current_thread() {
        let (api, mut calls) = ControlledCommentApi::new();
        let loader = ThreadLoader::new(OptimisticCommentStore::new(Arc::new(api)));
        let shown = tokio::spawn(loader.show(post(3)));
        calls.next().await.reply_list(Ok(Vec::new()));
        shown.await.expect("task").expect("shown");

        let refresh = tokio::spawn(loader.refresh());
        let call = calls.next().await;
        assert_eq!(call.request(), &CallRequest::List(post(3)));
        call.reply_list(Ok(vec![comment(9, 3, "nine")]));
        refresh.await.expect("task").expect("refreshed");
        assert_eq!(keys(&loader.store().view()), vec![9]);
    }
}
