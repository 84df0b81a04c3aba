use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use plclink_fault::FaultRegister;
use plclink_link::{Inbound, Link, LinkConfig, LinkError};
use plclink_transport::{BoundedQueue, StreamPort, TransportError};
use tracing::info;

use crate::cmd::{Context, ListenArgs};
use crate::exit::{link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_faults, print_inbound};

const MAILBOX_SLOTS: usize = 16;

pub fn run(args: ListenArgs, ctx: &Context) -> CliResult<i32> {
    let port =
        StreamPort::connect_unix(&args.path).map_err(|err| transport_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let faults = Arc::new(FaultRegister::default());
    let config = LinkConfig {
        frame: ctx.frame_config(),
        dispatch_timeouts: args.report_timeouts,
    };
    let mut link = Link::with_config(
        args.path.display().to_string(),
        port,
        Arc::clone(&faults),
        config,
    );
    let mailbox = BoundedQueue::new(MAILBOX_SLOTS);
    let mut printed = 0usize;

    'outer: while running.load(Ordering::SeqCst) {
        match link.receive_into(&mailbox) {
            Ok(_) => {}
            Err(LinkError::Transport(TransportError::Closed)) => {
                info!(link = link.name(), "serial bridge closed");
                break;
            }
            Err(err) => return Err(link_error("receive failed", err)),
        }

        while let Some(message) = mailbox.try_pop() {
            print_inbound(&message, link.name(), ctx.format);
            printed = printed.saturating_add(1);

            if args.ack && matches!(message, Inbound::Data(_)) {
                link.send_ack()
                    .map_err(|err| link_error("ack failed", err))?;
            }

            if args.count.is_some_and(|count| printed >= count) {
                break 'outer;
            }
        }
    }

    if args.faults {
        let bits = faults
            .poll(0)
            .map_err(|err| CliError::new(INTERNAL, format!("fault poll failed: {err}")))?;
        print_faults(0, bits, ctx.format);
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
