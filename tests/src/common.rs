use log::LevelFilter;
use pipework_pipe::PipeReader;
use simple_logger::SimpleLogger;
use std::sync::{Mutex, MutexGuard, Once};

#[cfg(target_family = "unix")]
use pipework_pipe::AsyncPipeReader;

static LOGGER: Once = Once::new();
static LARGE_TRANSFERS: Mutex<()> = Mutex::new(());

// 10,000,000 repetitions of this 17 byte pattern overflow any pipe buffer
pub const PATTERN: &[u8; 17] = b"0123456789abcdef\n";
pub const LARGE_REPETITIONS: usize = 10_000_000;
pub const LARGE_PAYLOAD_LEN: usize = PATTERN.len() * LARGE_REPETITIONS;

// Common functions used by all tests for setup / check / teardown
pub fn common_test_setup() {
    LOGGER.call_once(|| {
        SimpleLogger::new()
            .with_level(LevelFilter::Debug)
            .init()
            .expect("unable to install logger");
    });
}

pub fn large_payload() -> Vec<u8> {
    PATTERN.repeat(LARGE_REPETITIONS)
}

pub fn is_large_payload(buffer: &[u8]) -> bool {
    buffer.len() == LARGE_PAYLOAD_LEN && buffer.chunks(PATTERN.len()).all(|c| c == PATTERN)
}

// Large transfers hold a few hundred MiB each, don't run them side by side
pub fn serialize_large_transfers() -> MutexGuard<'static, ()> {
    LARGE_TRANSFERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Reads until `buffer` is full or end-of-stream, returns the number of bytes read
pub fn read_full(reader: &mut PipeReader, buffer: &mut [u8]) -> usize {
    let mut total = 0;
    while total < buffer.len() {
        match reader.read(&mut buffer[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) => panic!("read failed after {} bytes: {}", total, e),
        }
    }
    total
}

#[cfg(target_family = "unix")]
pub async fn read_full_async(reader: &mut AsyncPipeReader, buffer: &mut [u8]) -> usize {
    let mut total = 0;
    while total < buffer.len() {
        match reader.read(&mut buffer[total..]).await {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) => panic!("async read failed after {} bytes: {}", total, e),
        }
    }
    total
}
