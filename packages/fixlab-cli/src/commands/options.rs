use crate::cli::OptionsArgs;
use crate::exit_codes;
use crate::output;
use crate::params;

/// Print the options exactly as the detector bridge receives them
pub fn execute(args: OptionsArgs) -> i32 {
    let options = match params::load_options(args.options.as_deref()) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let value = match options.to_bridge_value() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if let Err(e) = output::emit_json(&value, args.compact, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    exit_codes::SUCCESS
}
