//! End-to-end tests driving the relay engine over real loopback TCP
//! connections, covering the socket-level scenarios from the relay's
//! testable-properties list (E5: in-order downlink delivery; E6: uplink
//! backpressure by drop).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use space_relay_ground::config::RelayConfig;
use space_relay_ground::relay::RelayEngine;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn spawn_relay(frame_size: usize, queue_capacity: usize) -> (RelayConfig, Arc<AtomicBool>) {
    let config = RelayConfig {
        frame_size,
        queue_capacity,
        spacecraft_downlink_port: free_port(),
        moc_raf_port: free_port(),
        spacecraft_uplink_port: free_port(),
        moc_fsp_port: free_port(),
        bind_address: "127.0.0.1".to_string(),
    };

    let running = Arc::new(AtomicBool::new(true));
    let engine = Arc::new(RelayEngine::new(config.clone(), Arc::clone(&running)));
    let run_engine = Arc::clone(&engine);
    thread::spawn(move || {
        let _ = run_engine.run();
    });
    thread::sleep(Duration::from_millis(200));

    (config, running)
}

/// E5: send 1000 distinct fixed-size frames into the spacecraft-downlink
/// port and confirm the MOC-RAF reader receives all 1000, in order,
/// byte-identical.
#[test]
fn e5_downlink_delivers_all_frames_in_order() {
    const FRAME_SIZE: usize = 32;
    const FRAME_COUNT: usize = 1000;

    let (config, running) = spawn_relay(FRAME_SIZE, FRAME_COUNT + 10);

    let mut downlink = TcpStream::connect(("127.0.0.1", config.spacecraft_downlink_port)).unwrap();
    let mut raf = TcpStream::connect(("127.0.0.1", config.moc_raf_port)).unwrap();

    let frames: Vec<Vec<u8>> = (0..FRAME_COUNT)
        .map(|i| {
            let mut frame = vec![0u8; FRAME_SIZE];
            frame[0..4].copy_from_slice(&(i as u32).to_be_bytes());
            frame
        })
        .collect();

    let writer = thread::spawn(move || {
        for frame in &frames {
            downlink.write_all(frame).unwrap();
        }
        downlink.flush().unwrap();
        frames
    });

    let mut received = vec![0u8; FRAME_SIZE * FRAME_COUNT];
    raf.read_exact(&mut received).unwrap();

    let frames = writer.join().unwrap();
    let expected: Vec<u8> = frames.concat();
    assert_eq!(received, expected);

    for (i, chunk) in received.chunks(FRAME_SIZE).enumerate() {
        let seq = u32::from_be_bytes(chunk[0..4].try_into().unwrap());
        assert_eq!(seq as usize, i, "frame {i} arrived out of order");
    }

    running.store(false, std::sync::atomic::Ordering::SeqCst);
}

/// E6: with a command-queue capacity of 4, ten CLTUs sent to MOC-FSP with no
/// reader on the spacecraft-uplink port should enqueue only the first four;
/// once a reader attaches, it receives exactly those four, in order.
#[test]
fn e6_uplink_drops_beyond_capacity_then_resumes_in_order() {
    let (config, running) = spawn_relay(256, 4);

    let cltus: Vec<Vec<u8>> = (0u8..10)
        .map(|i| space_relay_shared::cltu::encode(&[i]))
        .collect();

    {
        let mut fsp = TcpStream::connect(("127.0.0.1", config.moc_fsp_port)).unwrap();
        for cltu in &cltus {
            fsp.write_all(cltu).unwrap();
        }
        fsp.flush().unwrap();
        // Give the FSP endpoint thread time to drain the socket and offer
        // each CLTU to the (capacity-4) command queue before a reader
        // attaches; the first four enqueue, the remaining six are dropped.
        thread::sleep(Duration::from_millis(300));
    }

    let mut uplink = TcpStream::connect(("127.0.0.1", config.spacecraft_uplink_port)).unwrap();
    let expected: Vec<u8> = cltus[0..4].concat();
    let mut received = vec![0u8; expected.len()];
    uplink.read_exact(&mut received).unwrap();
    assert_eq!(received, expected);

    running.store(false, std::sync::atomic::Ordering::SeqCst);
}
