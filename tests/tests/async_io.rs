#![cfg(target_family = "unix")]

use common::{common_test_setup, read_full, read_full_async};
use pipework_handle::CrossPlatformHandle;
use pipework_pipe::{create_pipe, AsyncPipeReader, AsyncPipeWriter, PipeReader, PipeWriter};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn read_after_writer_closed_returns_zero() {
    common_test_setup();
    let (read_end, mut write_end) = create_pipe(false, true).unwrap();
    write_end.close().unwrap();
    let mut reader = AsyncPipeReader::new(read_end).unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(reader.read(&mut buf).await, Ok(0));
    assert_eq!(reader.read(&mut buf).await, Ok(0));
}

#[tokio::test]
async fn empty_buffer_read_returns_at_once_and_consumes_nothing() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let mut reader = AsyncPipeReader::new(read_end).unwrap();
    let res = tokio::time::timeout(Duration::from_millis(200), reader.read(&mut [])).await;
    assert_eq!(res.ok(), Some(Ok(0)));
    let res = tokio::time::timeout(
        Duration::from_millis(200),
        AsyncReadExt::read(&mut reader, &mut []),
    )
    .await;
    assert_eq!(res.ok().map(|r| r.ok()), Some(Some(0)));

    let mut writer = PipeWriter::from_handle(write_end).unwrap();
    assert_eq!(writer.write(b"xyz"), Ok(3));
    let mut buf = [0u8; 3];
    assert_eq!(reader.read(&mut buf).await, Ok(3));
    assert_eq!(&buf, b"xyz");
}

#[tokio::test]
async fn write_after_reader_closed_fails_with_zero_transferred() {
    common_test_setup();
    let (mut read_end, write_end) = create_pipe(false, true).unwrap();
    read_end.close().unwrap();
    let mut writer = AsyncPipeWriter::new(write_end).unwrap();
    let err = writer.write(b"test data").await.unwrap_err();
    assert!(err.is_broken_pipe(), "unexpected error {:?}", err);
    assert_eq!(err.transferred(), 0);
    let err = writer.write_some(b"test data").await.unwrap_err();
    assert!(err.is_broken_pipe());
    assert_eq!(err.transferred(), 0);
}

#[tokio::test]
async fn broken_pipe_after_partial_write_reports_progress() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let mut reader = PipeReader::from_handle(read_end).unwrap();
    let reader_thread = std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        read_full(&mut reader, &mut buf)
    });
    let payload = vec![0x42u8; 4 * 1024 * 1024];
    let mut writer = AsyncPipeWriter::new(write_end).unwrap();
    let err = writer.write(&payload).await.unwrap_err();
    assert_eq!(reader_thread.join().unwrap(), 4096);
    assert!(err.is_broken_pipe(), "unexpected error {:?}", err);
    assert!(err.transferred() >= 4096 && err.transferred() < payload.len());
    assert_eq!(writer.cancelled_write_progress(), 0);
}

#[tokio::test]
async fn cancelled_read_consumes_nothing() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let mut reader = AsyncPipeReader::new(read_end).unwrap();
    let mut buf = [0u8; 16];
    let res = tokio::time::timeout(Duration::from_millis(50), reader.read(&mut buf)).await;
    assert!(res.is_err(), "read completed on an empty pipe");

    let mut writer = PipeWriter::from_handle(write_end).unwrap();
    assert_eq!(writer.write(b"late"), Ok(4));
    drop(writer);
    let n = read_full_async(&mut reader, &mut buf).await;
    assert_eq!(&buf[..n], b"late");
}

#[tokio::test]
async fn cancelled_write_reports_progress_and_stays_usable() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let payload: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 253) as u8).collect();
    let mut writer = AsyncPipeWriter::new(write_end).unwrap();
    // Nobody reads yet: the write fills the pipe and suspends
    let res = tokio::time::timeout(Duration::from_millis(100), writer.write(&payload)).await;
    assert!(res.is_err(), "write completed without a reader");
    let progress = writer.cancelled_write_progress();
    assert!(progress > 0 && progress < payload.len());

    let mut reader = PipeReader::from_handle(read_end).unwrap();
    let reader_thread = std::thread::spawn(move || {
        let mut received = vec![0u8; 4 * 1024 * 1024];
        let n = read_full(&mut reader, &mut received);
        received.truncate(n);
        received
    });
    let remaining = &payload[progress..];
    assert_eq!(writer.write(remaining).await, Ok(remaining.len()));
    assert_eq!(writer.cancelled_write_progress(), 0);
    drop(writer);
    let received = reader_thread.join().unwrap();
    assert!(received == payload, "bytes were lost or duplicated");
}

#[tokio::test]
async fn sync_writer_thread_async_reader() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let mut writer = PipeWriter::from_handle(write_end).unwrap();
    let writer_thread = std::thread::spawn(move || writer.write(b"from a thread"));
    let mut reader = AsyncPipeReader::new(read_end).unwrap();
    let mut buf = [0u8; 32];
    let n = read_full_async(&mut reader, &mut buf).await;
    assert_eq!(&buf[..n], b"from a thread");
    assert_eq!(writer_thread.join().unwrap(), Ok(13));
}

#[tokio::test]
async fn async_writer_sync_reader_thread() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let mut reader = PipeReader::from_handle(read_end).unwrap();
    let reader_thread = std::thread::spawn(move || {
        let mut buf = [0u8; 32];
        let n = read_full(&mut reader, &mut buf);
        buf[..n].to_vec()
    });
    let mut writer = AsyncPipeWriter::new(write_end).unwrap();
    assert_eq!(writer.write(b"from a task").await, Ok(11));
    drop(writer);
    assert_eq!(reader_thread.join().unwrap(), b"from a task");
}

#[tokio::test]
async fn tasks_on_the_same_runtime() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, false).unwrap();
    let mut reader = AsyncPipeReader::new(read_end).unwrap();
    let mut writer = AsyncPipeWriter::new(write_end).unwrap();
    let expected: Vec<u8> = (0..500_000u32).map(|i| (i % 241) as u8).collect();
    let to_send = expected.clone();
    let writer_task = tokio::spawn(async move {
        let mut sent = 0;
        for chunk in to_send.chunks(7001) {
            sent += writer.write(chunk).await?;
        }
        Ok::<usize, pipework_pipe::TransferError>(sent)
    });
    let mut received = vec![0u8; expected.len() + 1];
    let n = read_full_async(&mut reader, &mut received).await;
    assert_eq!(writer_task.await.unwrap(), Ok(expected.len()));
    assert_eq!(n, expected.len());
    assert!(received[..n] == expected[..], "bytes were reordered or lost");
}

#[tokio::test]
async fn tokio_io_traits() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, false).unwrap();
    let mut reader = AsyncPipeReader::new(read_end).unwrap();
    let mut writer = AsyncPipeWriter::new(write_end).unwrap();
    writer.write_all(b"through tokio").await.unwrap();
    writer.shutdown().await.unwrap();
    drop(writer);
    let mut received = Vec::new();
    reader.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"through tokio");
}

#[tokio::test]
async fn unregistering_keeps_the_handle_open() {
    common_test_setup();
    let (read_end, write_end) = create_pipe(false, true).unwrap();
    let reader = AsyncPipeReader::new(read_end).unwrap();
    let read_end = reader.into_handle();
    assert!(read_end.is_valid());
    let mut reader = PipeReader::from_handle(read_end).unwrap();
    let mut writer = PipeWriter::from_handle(write_end).unwrap();
    assert_eq!(writer.write(b"x"), Ok(1));
    let mut buf = [0u8; 1];
    assert_eq!(reader.read(&mut buf), Ok(1));
}
