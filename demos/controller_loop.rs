use std::thread;
use std::time::Duration as StdDuration;

use time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unique_delay_queue::UniqueDelayQueue;

const TICK: StdDuration = StdDuration::from_millis(250);
const RETRY_DELAY: Duration = Duration::seconds(1);

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let queue: UniqueDelayQueue<String> = UniqueDelayQueue::default();

    // Clone the queue and move it to the thread reacting to events
    let watcher_queue = queue.clone();
    let watcher_handle = thread::spawn(move || {
        for pod in ["default/web-0", "default/web-1", "kube-system/dns-0"] {
            // Failed cleanups are retried after RETRY_DELAY, the rest right away
            let delay = if pod.starts_with("default/") {
                RETRY_DELAY
            } else {
                Duration::ZERO
            };
            watcher_queue.enqueue_if_new(pod.to_string(), delay);
        }

        // A second failure for the same pod does not push its retry further out
        watcher_queue.enqueue_if_new("default/web-0".to_string(), Duration::minutes(10));
    });

    watcher_handle.join().unwrap();

    // The reconciliation loop polls the queue once per tick
    while !queue.is_empty() {
        for pod in queue.get_work() {
            info!(%pod, "reconciling");
        }
        thread::sleep(TICK);
    }
}
