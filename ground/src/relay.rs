//! The bidirectional relay engine: four independent TCP endpoints and the
//! two bounded queues that hand frames and CLTUs between them.
//!
//! ```text
//! spacecraft --TM frames--> [downlink]  --> telemetry queue --> [RAF] --TM frames--> MOC
//! MOC --CLTUs--> [FSP] --> command queue --> [uplink] --CLTUs--> spacecraft
//! ```
//!
//! Each endpoint owns one TCP listener and runs on its own thread for the
//! lifetime of the process; only one client is served at a time per
//! endpoint. All four threads watch a shared `running` flag and unwind
//! promptly once it is cleared.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use space_relay_shared::cltu::CltuReceiver;
use space_relay_shared::queue::BoundedQueue;
use space_relay_shared::RelayError;

use crate::config::RelayConfig;

/// How long an endpoint sleeps after a client disconnects before
/// re-accepting.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
/// How long a `MOC-RAF`/`spacecraft-uplink` endpoint waits on the queue
/// before rechecking `running`.
const QUEUE_POLL_TIMEOUT: Duration = Duration::from_secs(1);
/// Poll interval for a non-blocking `accept` while hunting for the next
/// client, and the read timeout applied to every accepted stream so blocked
/// reads also recheck `running` promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Owns the shared queues and shutdown flag, and supervises the four
/// endpoint threads.
pub struct RelayEngine {
    config: RelayConfig,
    telemetry_queue: Arc<BoundedQueue<Vec<u8>>>,
    command_queue: Arc<BoundedQueue<Vec<u8>>>,
    running: Arc<AtomicBool>,
}

impl RelayEngine {
    /// Build a relay engine from `config`. The returned engine shares its
    /// `running` flag with the caller so an external signal handler can
    /// request shutdown.
    pub fn new(config: RelayConfig, running: Arc<AtomicBool>) -> Self {
        let telemetry_queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        let command_queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        Self {
            config,
            telemetry_queue,
            command_queue,
            running,
        }
    }

    /// Start all four endpoint threads and block until every one of them
    /// has exited (normally, once `running` is cleared).
    ///
    /// # Errors
    /// Returns an error if any of the four listeners fails to bind.
    pub fn run(&self) -> anyhow::Result<()> {
        let bind = |port: u16| -> anyhow::Result<TcpListener> {
            let listener = TcpListener::bind((self.config.bind_address.as_str(), port))?;
            // Non-blocking so the accept loop can recheck `running` on a
            // short poll interval instead of blocking forever in `accept`.
            listener.set_nonblocking(true)?;
            Ok(listener)
        };

        let downlink_listener = bind(self.config.spacecraft_downlink_port)?;
        let raf_listener = bind(self.config.moc_raf_port)?;
        let fsp_listener = bind(self.config.moc_fsp_port)?;
        let uplink_listener = bind(self.config.spacecraft_uplink_port)?;

        info!(
            "relay listening: downlink={} raf={} fsp={} uplink={}",
            self.config.spacecraft_downlink_port,
            self.config.moc_raf_port,
            self.config.moc_fsp_port,
            self.config.spacecraft_uplink_port
        );

        let handles: Vec<JoinHandle<()>> = vec![
            self.spawn_downlink(downlink_listener),
            self.spawn_raf(raf_listener),
            self.spawn_fsp(fsp_listener),
            self.spawn_uplink(uplink_listener),
        ];

        for handle in handles {
            if handle.join().is_err() {
                warn!("an endpoint thread panicked");
            }
        }

        Ok(())
    }

    /// Clear the shared `running` flag, causing every endpoint thread to
    /// unwind from its next accept/read/write/poll boundary.
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn spawn_downlink(&self, listener: TcpListener) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.telemetry_queue);
        let frame_size = self.config.frame_size;
        thread::spawn(move || downlink_loop(&listener, &running, &queue, frame_size))
    }

    fn spawn_raf(&self, listener: TcpListener) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.telemetry_queue);
        thread::spawn(move || writer_loop(&listener, &running, &queue, "moc-raf"))
    }

    fn spawn_fsp(&self, listener: TcpListener) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.command_queue);
        thread::spawn(move || fsp_loop(&listener, &running, &queue))
    }

    fn spawn_uplink(&self, listener: TcpListener) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.command_queue);
        thread::spawn(move || writer_loop(&listener, &running, &queue, "spacecraft-uplink"))
    }
}

/// Accept loop shared by the downlink and FSP endpoints: serve one client
/// at a time, handing each connection to `serve_client`, and back off
/// between clients.
fn accept_serve_loop(
    listener: &TcpListener,
    running: &AtomicBool,
    label: &'static str,
    mut serve_client: impl FnMut(TcpStream),
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("{label}: client connected from {addr}");
                if let Err(err) = stream.set_read_timeout(Some(POLL_INTERVAL)) {
                    warn!("{label}: failed to set read timeout: {err}");
                }
                serve_client(stream);
                info!("{label}: client disconnected");
                if running.load(Ordering::SeqCst) {
                    thread::sleep(RECONNECT_BACKOFF);
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let diagnostic = RelayError::IoError {
                    endpoint: label,
                    reason: err.to_string(),
                };
                warn!("{diagnostic}");
                thread::sleep(RECONNECT_BACKOFF);
            }
        }
    }
    debug!("{label}: endpoint thread exiting");
}

fn downlink_loop(
    listener: &TcpListener,
    running: &AtomicBool,
    queue: &BoundedQueue<Vec<u8>>,
    frame_size: usize,
) {
    accept_serve_loop(listener, running, "spacecraft-downlink", |mut stream| {
        let mut buf = vec![0u8; frame_size];
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            match read_exact_or_eof(&mut stream, &mut buf, running) {
                Ok(true) => {
                    if !queue.offer(buf.clone()) {
                        let diagnostic = RelayError::QueueFull { what: "a TM frame" };
                        warn!("spacecraft-downlink: {diagnostic}");
                    }
                }
                Ok(false) => return,
                Err(err) => {
                    let diagnostic = RelayError::IoError {
                        endpoint: "spacecraft-downlink",
                        reason: err.to_string(),
                    };
                    warn!("{diagnostic}");
                    return;
                }
            }
        }
    });
}

fn writer_loop(
    listener: &TcpListener,
    running: &AtomicBool,
    queue: &BoundedQueue<Vec<u8>>,
    label: &'static str,
) {
    accept_serve_loop(listener, running, label, |mut stream| loop {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        match queue.take(QUEUE_POLL_TIMEOUT) {
            Some(item) => {
                if let Err(err) = stream.write_all(&item).and_then(|()| stream.flush()) {
                    let diagnostic = RelayError::IoError {
                        endpoint: label,
                        reason: err.to_string(),
                    };
                    warn!("{diagnostic}");
                    return;
                }
            }
            None => continue,
        }
    });
}

fn fsp_loop(listener: &TcpListener, running: &AtomicBool, queue: &BoundedQueue<Vec<u8>>) {
    accept_serve_loop(listener, running, "moc-fsp", |mut stream| {
        let mut receiver = CltuReceiver::new();
        let mut byte = [0u8; 1];
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            match stream.read(&mut byte) {
                Ok(0) => return,
                Ok(_) => match receiver.push(byte[0]) {
                    Ok(Some(cltu)) => {
                        if !queue.offer(cltu) {
                            let diagnostic = RelayError::QueueFull { what: "a CLTU" };
                            warn!("moc-fsp: {diagnostic}");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!("moc-fsp: malformed CLTU discarded: {err}"),
                },
                Err(err) if is_timeout(&err) => continue,
                Err(err) => {
                    let diagnostic = RelayError::IoError {
                        endpoint: "moc-fsp",
                        reason: err.to_string(),
                    };
                    warn!("{diagnostic}");
                    return;
                }
            }
        }
    });
}

/// `true` for the `WouldBlock`/`TimedOut` errors produced when a read
/// timeout set via [`TcpStream::set_read_timeout`] elapses with no data
/// available.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Fill `buf` completely from `stream`, treating a zero-byte first read as
/// a clean EOF (`Ok(false)`) and any other short read as an I/O error.
/// Read timeouts are not errors: they simply give the caller a chance to
/// recheck `running` before resuming the fill.
fn read_exact_or_eof(
    stream: &mut TcpStream,
    buf: &mut [u8],
    running: &AtomicBool,
) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        if !running.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(ErrorKind::Other, "shutting down"));
        }
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    Ok(false)
                } else {
                    Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed mid-frame",
                    ))
                };
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn downlink_to_raf_round_trips_frames_in_order() {
        let downlink_port = free_port();
        let raf_port = free_port();
        let fsp_port = free_port();
        let uplink_port = free_port();

        let config = RelayConfig {
            frame_size: 16,
            queue_capacity: 100,
            spacecraft_downlink_port: downlink_port,
            moc_raf_port: raf_port,
            spacecraft_uplink_port: uplink_port,
            moc_fsp_port: fsp_port,
            bind_address: "127.0.0.1".to_string(),
        };

        let running = Arc::new(AtomicBool::new(true));
        let engine = RelayEngine::new(config, Arc::clone(&running));
        let engine = Arc::new(engine);
        let engine_for_run = Arc::clone(&engine);
        let run_handle = thread::spawn(move || engine_for_run.run());

        // Give the listeners a moment to bind.
        thread::sleep(Duration::from_millis(200));

        let mut downlink_client = TcpStream::connect(("127.0.0.1", downlink_port)).unwrap();
        let mut raf_client = TcpStream::connect(("127.0.0.1", raf_port)).unwrap();

        let frames: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; 16]).collect();
        for frame in &frames {
            downlink_client.write_all(frame).unwrap();
        }
        downlink_client.flush().unwrap();

        let mut received = vec![0u8; 16 * frames.len()];
        raf_client.read_exact(&mut received).unwrap();

        let expected: Vec<u8> = frames.concat();
        assert_eq!(received, expected);

        engine.request_shutdown();
        drop(downlink_client);
        drop(raf_client);
        let _ = run_handle.join();
    }
}
