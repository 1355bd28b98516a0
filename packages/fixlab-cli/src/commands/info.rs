use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use fixlab_rs::runner::{BRIDGE_SCRIPT_ENV, PYTHON_ENV};
use fixlab_rs::I2mcRunner;
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    python_path: Option<String>,
    python_found: bool,
    bridge_script: Option<String>,
    bridge_found: bool,
    i2mc_version: Option<String>,
    platform: String,
    arch: String,
}

pub fn execute(args: InfoArgs) -> i32 {
    let python = params::resolve_python(args.python.as_deref());
    let bridge = params::resolve_bridge(args.bridge.as_deref())
        .ok()
        .filter(|p| p.exists());

    let i2mc_version = match (&python, &bridge) {
        (Some(python), Some(bridge)) => I2mcRunner::new(python, bridge)
            .ok()
            .and_then(|runner| runner.i2mc_version()),
        _ => None,
    };

    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        python_found: python.is_some(),
        python_path: python,
        bridge_found: bridge.is_some(),
        bridge_script: bridge.map(|p| p.display().to_string()),
        i2mc_version,
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    if args.json {
        if let Err(e) = output::emit_json(&info, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("fixlab CLI v{}", info.cli_version);
        println!("Platform: {} ({})", info.platform, info.arch);
        println!();
        match info.python_path {
            Some(ref path) => println!("Python: {}", path),
            None => println!("Python: not found (set ${} or use --python)", PYTHON_ENV),
        }
        match info.bridge_script {
            Some(ref path) => println!("Bridge script: {}", path),
            None => println!(
                "Bridge script: not found (set ${} or use --bridge)",
                BRIDGE_SCRIPT_ENV
            ),
        }
        match info.i2mc_version {
            Some(ref version) => println!("I2MC: {}", version),
            None => println!("I2MC: not available"),
        }
    }

    exit_codes::SUCCESS
}
