use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("plclink {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("PLCLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("rustc: {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "defaults: payload_len={}, receive_timeout={:?}, fault_codes={}",
        plclink_frame::DEFAULT_PAYLOAD_LEN,
        plclink_frame::DEFAULT_RECEIVE_TIMEOUT,
        plclink_fault::MAX_FAULT_CODE
    );

    Ok(SUCCESS)
}
