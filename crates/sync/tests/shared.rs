use std::sync::Arc;

use cascade_engine::{CascadeError, CascadeOptions, ChangeNotifier, Filter, InitMode, SortRule, ViewEvent, ViewSpec};
use cascade_sync::{SharedStore, ThreadDispatcher};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

fn even(value: &i32) -> bool {
	value % 2 == 0
}

#[test]
fn concurrent_adds_keep_views_consistent() {
	let store = SharedStore::new();
	let evens = store.add_view("evens", ViewSpec::new().filter(even)).unwrap();
	let big = evens.add_child_view("big", ViewSpec::new().filter(|v: &i32| *v >= 200)).unwrap();

	let writers: Vec<_> = (0..4)
		.map(|worker| {
			let store = store.clone();
			std::thread::spawn(move || {
				for n in 0..100 {
					store.add(worker * 100 + n).unwrap();
				}
			})
		})
		.collect();
	for writer in writers {
		writer.join().unwrap();
	}

	assert_eq!(store.len(), 400);
	assert_eq!(evens.len().unwrap(), 200);
	assert_eq!(big.len().unwrap(), 100);

	evens.sort().unwrap();
	assert_eq!(evens.to_vec().unwrap(), (0..400).filter(even).collect::<Vec<_>>());
}

#[test]
fn readers_never_see_a_partial_cascade() {
	let store = SharedStore::new();
	let evens = store.add_view("evens", ViewSpec::new().filter(even)).unwrap();
	let small = evens.add_child_view("small", ViewSpec::new().filter(|v: &i32| *v < 50)).unwrap();

	let writer = {
		let store = store.clone();
		std::thread::spawn(move || {
			for n in 0..200 {
				store.add(n).unwrap();
			}
			for n in (0..200).step_by(3) {
				store.remove(&n);
			}
		})
	};

	for _ in 0..200 {
		let consistent = store.with_store(|inner| {
			let parent = inner.view(evens.id()).unwrap();
			let child = inner.view(small.id()).unwrap();
			child.iter().all(|v| parent.contains(v))
				&& parent.iter().filter(|v| **v < 50).count() == child.len()
		});
		assert!(consistent);
	}
	writer.join().unwrap();
}

#[test]
fn background_view_waits_for_its_initial_pass() {
	let store = SharedStore::new();
	for n in 0..2_000 {
		store.add(n).unwrap();
	}

	let evens = store
		.add_view_with("evens", ViewSpec::new().filter(even).sorted(), InitMode::Background)
		.unwrap();
	match evens.try_len() {
		Ok(len) => assert_eq!(len, 1_000),
		Err(err) => assert_eq!(err, CascadeError::NotInitialized(evens.id())),
	}

	// Lands either before or after the initial pass; both must admit it.
	store.add(5_000).unwrap();

	evens.wait_ready();
	assert!(evens.is_ready());
	assert_eq!(evens.try_len().unwrap(), 1_001);
	let values = evens.to_vec().unwrap();
	assert_eq!(values.first(), Some(&0));
	assert_eq!(values.last(), Some(&5_000));
}

#[test]
fn background_option_applies_to_child_views() {
	let store = SharedStore::with_options(CascadeOptions {
		init: InitMode::Background,
		..CascadeOptions::default()
	});
	for n in 0..100 {
		store.add(n).unwrap();
	}
	let evens = store.add_view("evens", ViewSpec::new().filter(even)).unwrap();
	let tens = evens.add_child_view("tens", ViewSpec::new().filter(|v: &i32| v % 10 == 0)).unwrap();

	assert_eq!(tens.to_vec().unwrap(), (0..100).step_by(10).collect::<Vec<_>>());
	assert_eq!(evens.len().unwrap(), 50);

	let found = store.root_view("evens").unwrap().child_view("tens").unwrap().unwrap();
	assert_eq!(found.id(), tens.id());
	assert!(found.is_ready());
}

#[test]
fn removed_view_reports_not_found() {
	let store = SharedStore::<i32>::new();
	let view = store.add_view("all", ViewSpec::new()).unwrap();
	assert!(store.remove_view("all"));
	assert_eq!(view.len(), Err(CascadeError::ViewNotFound(view.id())));
	assert!(store.root_view("all").is_none());
}

#[test]
fn view_mutations_go_through_the_lock() {
	let store = SharedStore::new();
	let all = store.add_view("all", ViewSpec::new()).unwrap();
	for n in [3, 1, 2] {
		store.add(n).unwrap();
	}

	all.sort().unwrap();
	assert_eq!(all.to_vec().unwrap(), vec![1, 2, 3]);
	all.move_item(0, 2).unwrap();
	assert_eq!(all.to_vec().unwrap(), vec![2, 3, 1]);
	assert!(all.redo_last_sort().unwrap());
	assert_eq!(all.to_vec().unwrap(), vec![1, 2, 3]);

	assert_eq!(all.set_at(0, 10).unwrap(), 1);
	assert_eq!(all.remove_at(2).unwrap(), 3);
	assert_eq!(store.values(), vec![10, 2]);
	assert_eq!(all.index_of(&2).unwrap(), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_wrappers_apply_in_the_background() {
	let store = SharedStore::new();
	let evens = store.add_view("evens", ViewSpec::new().filter(even)).unwrap();

	let mut ids = Vec::new();
	for n in [6, 3, 4, 2] {
		ids.push(store.add_async(n).await.unwrap().unwrap());
	}
	assert_eq!(evens.to_vec().unwrap(), vec![6, 4, 2]);

	assert!(evens.sort_by_async(SortRule::natural()).await.unwrap().unwrap());
	assert_eq!(evens.to_vec().unwrap(), vec![2, 4, 6]);

	assert_eq!(store.set_async(ids[1], 8).await.unwrap(), Ok(3));
	assert!(evens.contains(&8).unwrap());

	assert!(store.remove_async(6).await.unwrap());
	assert!(store.remove_by_id_async(ids[2]).await.unwrap());
	assert!(evens.change_filter_async(Filter::new(|v: &i32| *v > 4)).await.unwrap().unwrap());
	assert_eq!(evens.to_vec().unwrap(), vec![8]);
	evens.redo_last_sort_async().await.unwrap().unwrap();
	assert_eq!(evens.to_vec().unwrap(), vec![8]);
}

#[test]
fn thread_dispatcher_lets_subscribers_reenter_the_store() {
	let dispatcher = ThreadDispatcher::spawn("cascade-notify").unwrap();
	let store = SharedStore::new();
	let evens = store.add_view("evens", ViewSpec::new().filter(even)).unwrap();
	let notifier = Arc::new(ChangeNotifier::new(Arc::new(dispatcher.clone())));
	evens.attach_notifier(Arc::clone(&notifier)).unwrap();

	let seen = Arc::new(Mutex::new(Vec::new()));
	{
		let seen = Arc::clone(&seen);
		let store = store.clone();
		notifier.subscribe(move |event: &ViewEvent<i32>| {
			if let ViewEvent::Added { value, .. } = event {
				seen.lock().push((*value, store.len()));
			}
		});
	}

	for n in [2, 3, 4, 6] {
		store.add(n).unwrap();
	}
	dispatcher.flush();

	let seen = seen.lock();
	assert_eq!(seen.iter().map(|(value, _)| *value).collect::<Vec<_>>(), vec![2, 4, 6]);
	assert!(seen.iter().all(|(_, len)| *len <= 4));
	assert_eq!(seen.last().map(|(_, len)| *len), Some(4));
}

#[test]
fn events_raised_during_delivery_reach_every_subscriber_in_order() {
	let dispatcher = ThreadDispatcher::spawn("cascade-notify-order").unwrap();
	let store = SharedStore::new();
	let all = store.add_view("all", ViewSpec::new()).unwrap();
	let notifier = Arc::new(ChangeNotifier::new(Arc::new(dispatcher.clone())));
	all.attach_notifier(Arc::clone(&notifier)).unwrap();

	{
		let store = store.clone();
		notifier.subscribe(move |event: &ViewEvent<i32>| {
			if let ViewEvent::Added { value: 1, .. } = event {
				store.add(2).unwrap();
			}
		});
	}
	let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
	notifier.subscribe(move |event: &ViewEvent<i32>| {
		if let ViewEvent::Added { value, .. } = event {
			let _ = tx.send(*value);
		}
	});

	store.add(1).unwrap();
	let received = vec![rx.blocking_recv().unwrap(), rx.blocking_recv().unwrap()];
	assert_eq!(received, vec![1, 2]);
	assert_eq!(all.to_vec().unwrap(), vec![1, 2]);
}
