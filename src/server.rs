//! The DHCP packet engine: receive loop, worker pool and reply addressing.
//!
//! One dispatcher task owns the socket's receive side. It pulls a buffer
//! from the pool, reads one datagram, performs minimal validation (length,
//! hardware-address length) and hands the packet to a fixed pool of workers
//! over a bounded queue. Workers parse options, validate the message type,
//! invoke the policy [`Handler`] and send any reply to the destination
//! computed by [`reply_destination`].
//!
//! The queue never blocks the dispatcher: when it is full the job is
//! dropped and the client retransmits. Stalling the receive path would
//! overflow the socket buffer and lose all in-flight traffic instead of
//! one packet.
//!
//! No ordering is guaranteed between packets processed by different
//! workers; DHCP tolerates reordering and duplication via transaction IDs
//! and retransmission.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use crate::config::Config;
use crate::error::Result;
use crate::handler::Handler;
use crate::packet::{MAX_HW_ADDR_LEN, MIN_PACKET_SIZE, Packet};
use crate::pool::{BufferPool, PacketBuffer};
use crate::socket::PacketSocket;

/// One received datagram on its way to a worker.
///
/// Owns its buffer from enqueue until the worker releases it.
struct Job {
    buffer: PacketBuffer,
    source: SocketAddr,
}

type JobQueue = Arc<AsyncMutex<mpsc::Receiver<Job>>>;

/// Engine counters, shared by the dispatcher and all workers.
///
/// Overload drops get both a log line and a counter so operators can
/// alert on sustained load-shedding without scraping logs.
#[derive(Debug, Default)]
pub struct ServerStats {
    received: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_no_type: AtomicU64,
    dropped_overload: AtomicU64,
    handler_panics: AtomicU64,
    replies_sent: AtomicU64,
}

impl ServerStats {
    /// Datagrams read from the socket.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Datagrams dropped for being too short, oversized hlen, bad cookie
    /// or truncated options.
    pub fn dropped_malformed(&self) -> u64 {
        self.dropped_malformed.load(Ordering::Relaxed)
    }

    /// Packets dropped for a missing or out-of-range message type.
    pub fn dropped_no_type(&self) -> u64 {
        self.dropped_no_type.load(Ordering::Relaxed)
    }

    /// Jobs dropped because the queue was full.
    pub fn dropped_overload(&self) -> u64 {
        self.dropped_overload.load(Ordering::Relaxed)
    }

    /// Handler invocations that panicked.
    pub fn handler_panics(&self) -> u64 {
        self.handler_panics.load(Ordering::Relaxed)
    }

    /// Replies successfully written to the socket.
    pub fn replies_sent(&self) -> u64 {
        self.replies_sent.load(Ordering::Relaxed)
    }
}

/// Computes where a reply to `request` must be sent.
///
/// Relay presence always overrides the broadcast flag: a relay owns
/// delivery on its own subnet, so the server never second-guesses it. The
/// broadcast flag is only consulted for direct client traffic.
pub fn reply_destination(request: &Packet<'_>, source: SocketAddr) -> SocketAddr {
    if !request.giaddr().is_unspecified() {
        return source;
    }

    let source_unusable = match source.ip() {
        IpAddr::V4(ip) => ip.is_unspecified(),
        IpAddr::V6(ip) => ip.is_unspecified(),
    };

    if source_unusable || request.is_broadcast() {
        return SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), source.port());
    }

    source
}

/// The packet engine.
///
/// Generic over the socket so tests can script the transport, and over the
/// handler so admission policies can be swapped without touching the core.
pub struct Server<S, H> {
    socket: Arc<S>,
    handler: Arc<H>,
    pool: Arc<BufferPool>,
    workers: usize,
    queue_capacity: usize,
    stats: Arc<ServerStats>,
}

impl<S, H> Server<S, H>
where
    S: PacketSocket + 'static,
    H: Handler,
{
    pub fn new(config: &Config, socket: S, handler: H) -> Self {
        let pool = Arc::new(BufferPool::new(config.buffer_prewarm));
        Self::with_pool(config, socket, handler, pool)
    }

    /// Builds a server around an injected buffer pool.
    ///
    /// A pool of size one forces every cycle through the same buffer,
    /// which is how the reuse contract is exercised under test.
    pub fn with_pool(config: &Config, socket: S, handler: H, pool: Arc<BufferPool>) -> Self {
        Self {
            socket: Arc::new(socket),
            handler: Arc::new(handler),
            pool,
            workers: config.workers,
            queue_capacity: config.effective_queue_capacity(),
            stats: Arc::new(ServerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the engine until the socket read fails.
    ///
    /// A read error is transport-fatal: the socket is presumed unusable,
    /// so the queue is closed, in-flight jobs drain, workers exit, and the
    /// error is returned to the caller. Everything non-fatal (malformed
    /// packets, overload, write failures, handler panics) is absorbed.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the engine until the socket read fails or `shutdown` completes.
    ///
    /// Shutdown is graceful: the receive side stops, the queue closes, and
    /// already-enqueued jobs are processed to completion (replies included)
    /// before this returns `Ok`.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (tx, workers) = self.spawn_workers();

        info!(
            "packet engine running with {} workers, queue capacity {}",
            self.workers, self.queue_capacity
        );

        let result = self.receive_loop(&tx, shutdown).await;

        // Closing the queue lets workers drain remaining jobs and exit.
        drop(tx);
        for worker in workers {
            let _ = worker.await;
        }

        result
    }

    fn spawn_workers(&self) -> (mpsc::Sender<Job>, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel::<Job>(self.queue_capacity);
        let rx: JobQueue = Arc::new(AsyncMutex::new(rx));

        let workers = (0..self.workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&rx),
                    Arc::clone(&self.socket),
                    Arc::clone(&self.handler),
                    Arc::clone(&self.pool),
                    Arc::clone(&self.stats),
                ))
            })
            .collect();

        (tx, workers)
    }

    async fn receive_loop<F>(&self, tx: &mpsc::Sender<Job>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let mut buffer = self.pool.acquire();

            let read = tokio::select! {
                read = self.socket.recv_from(buffer.recv_slice()) => Some(read),
                _ = &mut shutdown => None,
            };

            let Some(read) = read else {
                self.pool.release(buffer);
                info!("shutdown requested, draining in-flight jobs");
                return Ok(());
            };

            let (len, source) = match read {
                Ok(read) => read,
                Err(read_error) => {
                    self.pool.release(buffer);
                    error!("socket receive failed: {}", read_error);
                    return Err(read_error.into());
                }
            };
            buffer.set_len(len);
            self.stats.received.fetch_add(1, Ordering::Relaxed);

            // Anything shorter than the fixed header, or declaring a
            // hardware address longer than the chaddr field, is noise.
            if len < MIN_PACKET_SIZE || buffer.bytes()[2] as usize > MAX_HW_ADDR_LEN {
                self.stats.dropped_malformed.fetch_add(1, Ordering::Relaxed);
                self.pool.release(buffer);
                continue;
            }

            match tx.try_send(Job { buffer, source }) {
                Ok(()) => {}
                Err(TrySendError::Full(job)) => {
                    warn!("job queue full, dropping packet from {}", source);
                    self.stats.dropped_overload.fetch_add(1, Ordering::Relaxed);
                    self.pool.release(job.buffer);
                }
                Err(TrySendError::Closed(job)) => {
                    self.pool.release(job.buffer);
                    return Err(crate::Error::WorkerPool("job queue closed".to_string()));
                }
            }
        }
    }
}

async fn worker_loop<S, H>(
    id: usize,
    jobs: JobQueue,
    socket: Arc<S>,
    handler: Arc<H>,
    pool: Arc<BufferPool>,
    stats: Arc<ServerStats>,
) where
    S: PacketSocket + 'static,
    H: Handler,
{
    loop {
        let job = { jobs.lock().await.recv().await };
        let Some(job) = job else { break };

        process_job(&*socket, &*handler, &stats, &job).await;

        // Single release point per job, regardless of how processing went.
        pool.release(job.buffer);
    }
    trace!("worker {} exiting", id);
}

async fn process_job<S, H>(socket: &S, handler: &H, stats: &ServerStats, job: &Job)
where
    S: PacketSocket,
    H: Handler,
{
    // Length was validated by the dispatcher before enqueue.
    let Some(packet) = Packet::new(job.buffer.bytes()) else {
        return;
    };

    let options = match packet.options() {
        Ok(options) => options,
        Err(_) => {
            stats.dropped_malformed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let Some(message_type) = options.message_type() else {
        stats.dropped_no_type.fetch_add(1, Ordering::Relaxed);
        return;
    };

    let reply = match catch_unwind(AssertUnwindSafe(|| {
        handler.serve(&packet, message_type, &options)
    })) {
        Ok(reply) => reply,
        Err(_) => {
            stats.handler_panics.fetch_add(1, Ordering::Relaxed);
            warn!(
                "handler panicked on {} from {}",
                message_type,
                packet.format_mac()
            );
            return;
        }
    };

    let Some(reply) = reply else { return };
    if reply.is_empty() {
        return;
    }

    let destination = reply_destination(&packet, job.source);
    match socket.send_to(&reply, destination).await {
        Ok(_) => {
            stats.replies_sent.fetch_add(1, Ordering::Relaxed);
            trace!("{} reply sent to {}", message_type, destination);
        }
        // DHCP clients retransmit, so a lost reply costs one round trip.
        Err(write_error) => {
            warn!("failed to send reply to {}: {}", destination, write_error);
        }
    }
}
