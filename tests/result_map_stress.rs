//! Concurrency tests for the shared result map
//!
//! Many producers insert while a consumer drains. Every drain must be a consistent
//! batch and no key written by a producer may be lost.

use simlink::models::OutputDevice;
use simlink::{ConfigItem, ResultMap};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const PRODUCERS: usize = 24;
const WRITES_PER_PRODUCER: usize = 500;

fn item(guid: String, value: usize) -> ConfigItem {
    let mut item = ConfigItem::output("stress", None, OutputDevice::None).with_guid(guid);
    item.value = value.to_string();
    item
}

#[test]
fn test_concurrent_producers_and_draining_consumer() {
    let results = Arc::new(ResultMap::new());
    let done = Arc::new(AtomicBool::new(false));

    let consumer = {
        let results = results.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut seen = HashSet::new();
            let mut drains = 0usize;
            loop {
                let finished = done.load(Ordering::SeqCst);
                for (guid, item) in results.drain() {
                    assert_eq!(guid, item.guid);
                    seen.insert(guid);
                }
                drains += 1;
                if finished {
                    break;
                }
                thread::yield_now();
            }
            (seen, drains)
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let results = results.clone();
            thread::spawn(move || {
                for i in 0..WRITES_PER_PRODUCER {
                    // Shared keys collide across producers, own keys never do
                    results.insert(item(format!("shared-{}", i % 50), i));
                    results.insert(item(format!("own-{}-{}", producer, i), i));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let (seen, drains) = consumer.join().unwrap();

    assert!(drains >= 1);
    assert!(results.is_empty());
    assert_eq!(seen.len(), 50 + PRODUCERS * WRITES_PER_PRODUCER);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_producers_with_extend() {
    let results = Arc::new(ResultMap::new());

    let mut handles = Vec::new();
    for producer in 0..20 {
        let results = results.clone();
        handles.push(tokio::spawn(async move {
            for batch in 0..20 {
                let items = (0..5)
                    .map(|i| {
                        let item = item(format!("{}-{}-{}", producer, batch, i), i);
                        (item.guid.clone(), item)
                    })
                    .collect();
                results.extend(items);
                tokio::task::yield_now().await;
            }
        }));
    }

    let mut total = 0;
    for handle in handles {
        handle.await.unwrap();
        total += results.drain().len();
    }
    total += results.drain().len();

    assert_eq!(total, 20 * 20 * 5);
}
