use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("iinic {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: iinic");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("IINIC_BUILD_TARGET").unwrap_or("unknown"));
    println!("profile: {}", option_env!("IINIC_BUILD_PROFILE").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("transports: tcp=true, serial={}", cfg!(unix));
    println!(
        "defaults: port={}, tx_buffer={} bytes",
        iinic_transport::DEFAULT_PORT,
        iinic_nic::TX_BUFFER_SIZE
    );

    Ok(SUCCESS)
}
