use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use plclink_fault::{codes, FaultRegister};
use plclink_link::{Inbound, Link, LinkConfig};
use plclink_transport::{BoundedQueue, QueueLink, Sender};

use crate::cmd::{parse_hex, Context, DecodeArgs};
use crate::exit::{
    io_error, link_error, transport_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS,
};
use crate::output::{print_faults, print_inbound};

/// Replay captured chunks through a link and report what it dispatched.
///
/// Exits with `DATA_INVALID` if any chunk produced an error message.
pub fn run(args: DecodeArgs, ctx: &Context) -> CliResult<i32> {
    let chunks = load_chunks(&args)?;
    let total: usize = chunks.iter().map(Vec::len).sum();

    let (mut capture, port) = QueueLink::pair(chunks.len().max(1));
    for chunk in &chunks {
        capture
            .enqueue(chunk)
            .map_err(|err| transport_error("replay failed", err))?;
    }
    drop(capture);

    let faults = Arc::new(FaultRegister::default());
    let config = LinkConfig {
        frame: ctx.frame_config(),
        dispatch_timeouts: true,
    };
    let mut link = Link::with_config("capture", port, Arc::clone(&faults), config);

    // Every byte yields at most one message.
    let mailbox = BoundedQueue::new(total.max(1));
    let running = AtomicBool::new(true);
    link.run(&mailbox, &running)
        .map_err(|err| link_error("decode failed", err))?;

    let mut rejected = 0usize;
    while let Some(message) = mailbox.try_pop() {
        if message == Inbound::Error {
            rejected += 1;
        }
        print_inbound(&message, link.name(), ctx.format);
    }

    let mut bits = faults
        .poll(0)
        .map_err(|err| CliError::new(INTERNAL, format!("fault poll failed: {err}")))?;
    // The replay queue closing is the end of the capture, not a fault.
    bits.clear_bit(codes::LINK_CLOSED);
    print_faults(0, bits, ctx.format);

    Ok(if rejected == 0 { SUCCESS } else { DATA_INVALID })
}

fn load_chunks(args: &DecodeArgs) -> CliResult<Vec<Vec<u8>>> {
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok(vec![bytes]);
    }
    args.hex.iter().map(|chunk| parse_hex(chunk)).collect()
}
