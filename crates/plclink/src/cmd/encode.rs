use plclink_frame::format_outgoing;

use crate::cmd::{Context, EncodeArgs};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::print_wire;

pub fn run(args: EncodeArgs, ctx: &Context) -> CliResult<i32> {
    let frame = args.frame.to_frame()?;
    let wire = format_outgoing(&frame, &ctx.frame_config())
        .map_err(|err| protocol_error("encode failed", err))?;

    print_wire(&frame, &wire, ctx.format);
    Ok(SUCCESS)
}
