use std::sync::Arc;

use plclink_fault::{codes, FaultRegister};
use plclink_frame::{format_outgoing, SendOutcome};
use plclink_link::{Inbound, Link, LinkConfig};
use plclink_transport::{BoundedQueue, StreamPort};

use crate::cmd::{Context, SendArgs};
use crate::exit::{
    link_error, protocol_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT,
};
use crate::output::{print_inbound, print_wire};

pub fn run(args: SendArgs, ctx: &Context) -> CliResult<i32> {
    let frame = args.frame.to_frame()?;
    // Refuse oversized payloads before touching the socket.
    let wire = format_outgoing(&frame, &ctx.frame_config())
        .map_err(|err| protocol_error("send failed", err))?;

    let port =
        StreamPort::connect_unix(&args.path).map_err(|err| transport_error("connect failed", err))?;
    let faults = Arc::new(FaultRegister::default());
    let config = LinkConfig {
        frame: ctx.frame_config(),
        dispatch_timeouts: true,
    };
    let mut link = Link::with_config(
        args.path.display().to_string(),
        port,
        Arc::clone(&faults),
        config,
    );

    match link.send(&frame).map_err(|err| link_error("send failed", err))? {
        SendOutcome::Queued => {}
        SendOutcome::Skipped => {
            return Err(CliError::new(FAILURE, "send skipped: transmit queue full"));
        }
    }

    if !args.wait {
        print_wire(&frame, &wire, ctx.format);
        return Ok(SUCCESS);
    }

    let mailbox = BoundedQueue::new(1);
    link.receive_into(&mailbox)
        .map_err(|err| link_error("receive failed", err))?;

    let timed_out = || {
        faults
            .peek(0)
            .is_ok_and(|bits| bits.contains(codes::RECEIVE_TIMEOUT))
    };
    match mailbox.try_pop() {
        Some(Inbound::Error) if timed_out() => Err(CliError::new(
            TIMEOUT,
            format!("no reply within {:?}", ctx.timeout),
        )),
        Some(reply) => {
            print_inbound(&reply, link.name(), ctx.format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(FAILURE, "reply dropped")),
    }
}
