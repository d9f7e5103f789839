//! The decode session loop.
//!
//! One session reads every packet of a mapped media in container order on
//! the calling thread, hands packets of selected streams to the handler and
//! skips the rest. Errors from independent steps (the read loop and the
//! session teardown) are aggregated into one [`MediaError::Multiple`].

use crate::{
    config::DecodeOptions,
    error::{ErrorList, MediaError},
    map::StreamMap,
    media::{InputMedia, Media},
    packet::{Packet, PacketBuffer},
    progress::{CancellationToken, OperationType},
    source::ReadStatus,
};

/// Run a decode session over `map`.
///
/// Validation failures are returned as-is, before anything is read. Once
/// the session has started, every failure (cancellation, read error,
/// handler error, teardown error) is collected and returned together.
pub(crate) fn run<F>(
    token: &CancellationToken,
    mut map: StreamMap,
    options: &DecodeOptions,
    mut handler: F,
) -> Result<(), MediaError>
where
    F: FnMut(&CancellationToken, &Packet<'_>) -> Result<(), MediaError>,
{
    let input = map
        .input()
        .filter(|input| input.is_open())
        .ok_or(MediaError::InvalidParameter("input"))?;
    let mut buffer = map
        .packet
        .take()
        .ok_or(MediaError::InvalidParameter("packet"))?;
    input.begin_read()?;

    log::debug!(
        "Decoding {} ({} selected streams)",
        input.url(),
        map.streams().len()
    );

    let mut errors = ErrorList::new();
    let (dispatched, skipped) = read_loop(
        token,
        &input,
        &map,
        &mut buffer,
        options,
        &mut handler,
        &mut errors,
    );
    drop(buffer);

    errors.record(map.close(&input));

    log::debug!(
        "Decode of {} finished: {} packets dispatched, {} skipped, {} errors",
        input.url(),
        dispatched,
        skipped,
        errors.len()
    );
    errors.into_result()
}

fn read_loop<F>(
    token: &CancellationToken,
    input: &InputMedia,
    map: &StreamMap,
    buffer: &mut PacketBuffer,
    options: &DecodeOptions,
    handler: &mut F,
    errors: &mut ErrorList,
) -> (u64, u64)
where
    F: FnMut(&CancellationToken, &Packet<'_>) -> Result<(), MediaError>,
{
    let mut tracker = options.tracker(OperationType::Decoding);
    let mut skipped = 0u64;

    loop {
        if let Some(reason) = token.reason() {
            log::debug!("Decode of {} stopped: {}", input.url(), reason);
            errors.push(MediaError::Cancelled(reason));
            break;
        }

        match input.read_packet(buffer) {
            Ok(ReadStatus::Packet) => {}
            Ok(ReadStatus::EndOfStream) => break,
            Err(error) => {
                errors.push(error);
                break;
            }
        }

        let stream = if map.is_selected(buffer.stream_index) {
            input.stream(buffer.stream_index)
        } else {
            None
        };

        match stream {
            Some(stream) => {
                let packet = Packet::new(buffer, stream);
                if let Err(error) = handler(token, &packet) {
                    errors.push(error);
                    break;
                }
                tracker.advance(buffer.timestamp);
            }
            None => skipped += 1,
        }

        buffer.release();
    }

    tracker.finish();
    (tracker.current(), skipped)
}
