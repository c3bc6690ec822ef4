use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use eo_access::prelude::*;
use eo_access::test_utils::MockConnectionFactory;

#[test]
fn saturated_pool_times_out_without_extra_channels() {
    let factory = MockConnectionFactory::new();
    let mock = factory.state();
    let pool = Pool::new(
        factory,
        PoolConfig::default()
            .with_max_size(4)
            .with_max_wait(Duration::from_millis(50)),
    )
    .unwrap();

    let barrier = Arc::new(Barrier::new(5));
    let holders: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let channel = pool.acquire().unwrap();
                barrier.wait();
                barrier.wait();
                pool.release(channel, true);
            })
        })
        .collect();

    barrier.wait();
    assert_eq!(pool.status().checked_out, 4);
    let err = pool.acquire().unwrap_err();
    assert!(matches!(err, EoAccessError::PoolExhausted { max_size: 4, .. }));
    assert_eq!(mock.opened(), 4);
    barrier.wait();

    for holder in holders {
        holder.join().unwrap();
    }
    let status = pool.status();
    assert_eq!(status.checked_out, 0);
    assert_eq!(status.available, 4);
}

#[test]
fn churn_never_exceeds_max_size() {
    let factory = MockConnectionFactory::new();
    let mock = factory.state();
    let pool = Pool::new(
        factory,
        PoolConfig::default()
            .with_max_size(3)
            .with_max_wait(Duration::from_secs(10)),
    )
    .unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let channel = pool.acquire().unwrap();
                    assert!(pool.status().total() <= 3);
                    pool.release(channel, true);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(mock.opened() <= 3);
    assert_eq!(pool.metrics().checkouts, 400);
    assert!(pool.status().total() <= 3);
}

#[test]
fn aged_channels_are_never_handed_out() {
    let factory = MockConnectionFactory::new();
    let pool = Pool::new(
        factory,
        PoolConfig::default().with_max_channel_age(Duration::from_secs(60)),
    )
    .unwrap();

    let mut channel = pool.acquire().unwrap();
    let old_id = channel.id();
    channel.backdate(Duration::from_secs(30));
    pool.release(channel, true);

    pool.reconfigure(pool.config().with_max_channel_age(Duration::from_secs(10)))
        .unwrap();
    let fresh = pool.acquire().unwrap();
    assert_ne!(fresh.id(), old_id);
    pool.release(fresh, true);
    assert_eq!(pool.maintain(), 0);
    assert_eq!(pool.status().available, 1);
}

#[test]
fn pool_reads_dictionary_properties() {
    let dictionary = ConnectionDictionary::new("mock:")
        .with_property("MaxPoolSize", "2")
        .with_property("MaxChannelWaitTime", "10");
    let pool = Pool::from_dictionary(MockConnectionFactory::new(), &dictionary).unwrap();
    assert_eq!(pool.config().max_size, 2);
    assert_eq!(pool.config().max_wait, Duration::from_millis(10));

    let bad = ConnectionDictionary::new("mock:").with_property("MaxPoolSize", "0");
    assert!(Pool::from_dictionary(MockConnectionFactory::new(), &bad).is_err());
}
